//! Credentials and access tokens

pub mod password;
pub mod tokens;

use thiserror::Error;

pub use password::PasswordService;
pub use tokens::{Claims, IssuedToken, JwtService};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Reported to clients with the same wording as bad credentials
    #[error("Invalid email or password")]
    AccountInactive,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("{0}")]
    WeakPassword(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token encoding failed: {0}")]
    TokenEncoding(String),
}
