use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::password::validate_strength;
use crate::auth::{AuthError, IssuedToken};
use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::logging::mask_email;
use crate::middleware::AuthContext;
use crate::models::User;
use crate::server::CareQueueServer;
use crate::store::UserRepository;
use crate::validation::RequestValidation;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "meera@citycare.test")]
    pub email: String,
    pub password: String,
}

impl RequestValidation for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        crate::validate_required!(self.email, "Email is required");
        crate::validate_required!(self.password, "Password is required");
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: IssuedToken,
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "auth"
)]
pub async fn login(
    State(server): State<CareQueueServer>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    req.validate()?;

    let (user, password_hash) = match server.store.find_credentials(&req.email).await? {
        Some(found) => found,
        None => {
            tracing::info!(email = %mask_email(&req.email), "login for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    server.passwords.verify(&req.password, &password_hash)?;
    if !user.is_active {
        tracing::info!(user_id = %user.id, "login for inactive account");
        return Err(AuthError::AccountInactive.into());
    }

    let token = server.jwt.issue(&user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok(Json(api_success(LoginResponse { token, user })))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn me(State(server): State<CareQueueServer>, auth: AuthContext) -> ApiResult<Json<ApiResponse<User>>> {
    let user = server
        .store
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(Json(api_success(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Wrong current password or weak new password"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let current_hash = server
        .store
        .password_hash(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    server
        .passwords
        .verify(&req.current_password, &current_hash)
        .map_err(|e| match e {
            AuthError::InvalidCredentials => ApiError::validation("Current password is incorrect"),
            other => other.into(),
        })?;

    validate_strength(&req.new_password)?;
    if req.new_password == req.current_password {
        return Err(ApiError::validation("New password must differ from the current one"));
    }

    let new_hash = server.passwords.hash(&req.new_password)?;
    server.store.set_password(auth.user_id, new_hash, false).await?;
    tracing::info!(user_id = %auth.user_id, "password changed");

    Ok(Json(api_success(MessageResponse {
        message: "Password changed".to_string(),
    })))
}
