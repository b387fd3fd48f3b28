use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::models::{Role, User};
use crate::server::CareQueueServer;
use crate::services::{CreateStaffRequest, OnboardedUser, OnboardingService};
use crate::store::UserRepository;
use crate::types::PaginationParams;

#[utoipa::path(
    post,
    path = "/api/v1/staff",
    request_body = CreateStaffRequest,
    responses(
        (status = 201, description = "Staff member onboarded", body = OnboardedUser),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Email already in use")
    ),
    tag = "staff",
    security(("bearer_auth" = []))
)]
pub async fn create_staff(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Json(req): Json<CreateStaffRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<OnboardedUser>>)> {
    auth.require_admin()?;
    let onboarded = OnboardingService::from_state(&server)
        .create_staff(auth.hospital_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(api_success(onboarded))))
}

#[utoipa::path(
    get,
    path = "/api/v1/staff",
    params(PaginationParams),
    responses(
        (status = 200, description = "Staff accounts", body = Vec<User>),
        (status = 403, description = "Admins only")
    ),
    tag = "staff",
    security(("bearer_auth" = []))
)]
pub async fn list_staff(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    auth.require_admin()?;
    let page = server
        .store
        .list_users(auth.hospital_id, Some(Role::Staff), pagination.page_request())
        .await?;
    Ok(Json(pagination.wrap_response(page.items, page.total)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/staff/{id}",
    params(("id" = Uuid, Path, description = "Staff user id")),
    responses(
        (status = 200, description = "Staff account deactivated", body = User),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Staff member not found")
    ),
    tag = "staff",
    security(("bearer_auth" = []))
)]
pub async fn deactivate_staff(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<User>>> {
    auth.require_admin()?;
    server
        .store
        .get_user(id)
        .await?
        .filter(|user| user.hospital_id == auth.hospital_id && user.role == Role::Staff)
        .ok_or_else(|| ApiError::not_found("Staff member"))?;

    let user = server.store.set_user_active(auth.hospital_id, id, false).await?;
    tracing::info!(user_id = %user.id, "staff member deactivated");
    Ok(Json(api_success(user)))
}
