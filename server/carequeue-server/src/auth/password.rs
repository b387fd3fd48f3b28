use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;

use super::AuthError;
use crate::config::AuthSettings;

pub const MIN_PASSWORD_LEN: usize = 8;
const TEMPORARY_PASSWORD_LEN: usize = 12;

/// Argon2id hashing with configurable cost
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    pub fn new(settings: &AuthSettings) -> Result<Self, AuthError> {
        let params = Params::new(
            settings.password_memory_kib,
            settings.password_iterations,
            1,
            None,
        )
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Uses the parameters stored in `hash`, not the configured ones
    pub fn verify(&self, password: &str, hash: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

/// At least eight characters with a letter and a digit
pub fn validate_strength(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "Password must contain at least one letter and one digit".to_string(),
        ));
    }
    Ok(())
}

/// Random password for a new account, always strong enough to pass [`validate_strength`]
pub fn generate_temporary_password() -> String {
    let mut rng = rand::thread_rng();
    // No 0/O or 1/l/I look-alikes
    let charset: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";
    loop {
        let password: String = (0..TEMPORARY_PASSWORD_LEN)
            .map(|_| charset[rng.gen_range(0..charset.len())] as char)
            .collect();
        if validate_strength(&password).is_ok() {
            return password;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordService {
        PasswordService::new(&AuthSettings {
            password_memory_kib: 1024,
            password_iterations: 1,
            ..AuthSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let service = cheap();
        let hash = service.hash("s3cretpass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify("s3cretpass", &hash).is_ok());
        assert_eq!(service.verify("wrongpass1", &hash), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn test_strength_rules() {
        assert!(validate_strength("abc123").is_err());
        assert!(validate_strength("abcdefgh").is_err());
        assert!(validate_strength("12345678").is_err());
        assert!(validate_strength("abcd1234").is_ok());
    }

    #[test]
    fn test_temporary_passwords_are_valid_and_distinct() {
        let first = generate_temporary_password();
        let second = generate_temporary_password();
        assert_eq!(first.len(), TEMPORARY_PASSWORD_LEN);
        assert!(validate_strength(&first).is_ok());
        assert_ne!(first, second);
    }
}
