//! Authenticated caller extracted from the `Authorization: Bearer` header
//!
//! The token is verified with the server's [`JwtService`](crate::auth::JwtService),
//! then the user is re-read so deactivated accounts lose access before their
//! token expires.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Role;
use crate::server::CareQueueServer;
use crate::store::UserRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub hospital_id: Uuid,
    pub role: Role,
    pub email: String,
}

impl AuthContext {
    pub fn new(user_id: Uuid, hospital_id: Uuid, role: Role, email: impl Into<String>) -> Self {
        Self {
            user_id,
            hospital_id,
            role,
            email: email.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::HospitalAdmin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_any(&[Role::HospitalAdmin])
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::authorization(format!(
                "Role {} is not allowed to perform this action",
                self.role
            )))
        }
    }
}

fn extract_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>"))
}

#[async_trait]
impl FromRequestParts<CareQueueServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &CareQueueServer) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let claims = state.jwt.verify(token)?;

        let user = state
            .store
            .get_user(claims.sub)
            .await?
            .filter(|user| user.is_active && user.hospital_id == claims.hospital_id)
            .ok_or_else(|| ApiError::authentication("Account is inactive or no longer exists"))?;

        Ok(AuthContext {
            user_id: user.id,
            hospital_id: user.hospital_id,
            role: user.role,
            email: user.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/auth/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token(&parts(Some("Bearer abc.def.ghi"))).unwrap(), "abc.def.ghi");
        assert!(extract_token(&parts(Some("Basic dXNlcjpwYXNz"))).is_err());
        assert!(extract_token(&parts(Some("Bearer "))).is_err());
        assert!(extract_token(&parts(None)).is_err());
    }

    #[test]
    fn test_role_checks() {
        let admin = AuthContext::new(Uuid::new_v4(), Uuid::new_v4(), Role::HospitalAdmin, "admin@x.test");
        let staff = AuthContext::new(Uuid::new_v4(), Uuid::new_v4(), Role::Staff, "desk@x.test");

        assert!(admin.is_admin());
        assert!(admin.require_admin().is_ok());
        assert!(staff.require_admin().is_err());
        assert!(staff.require_any(&[Role::HospitalAdmin, Role::Staff]).is_ok());
        assert!(staff.require_any(&[Role::Doctor]).is_err());
    }
}
