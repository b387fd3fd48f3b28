use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::auth::MessageResponse;
use super::doctors::{require_admin_or_doctor, require_doctor};
use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::CareQueueServer;
use crate::store::LeaveRepository;

#[utoipa::path(
    delete,
    path = "/api/v1/leaves/{id}",
    params(("id" = Uuid, Path, description = "Leave id")),
    responses(
        (status = 200, description = "Leave removed", body = MessageResponse),
        (status = 403, description = "Not an admin or the owning doctor"),
        (status = 404, description = "Leave not found")
    ),
    tag = "leaves",
    security(("bearer_auth" = []))
)]
pub async fn delete_leave(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let leave = server
        .store
        .get_leave(auth.hospital_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave"))?;
    let doctor = require_doctor(&server, auth.hospital_id, leave.doctor_id).await?;
    require_admin_or_doctor(&auth, &doctor)?;

    server.store.delete_leave(auth.hospital_id, leave.id).await?;
    tracing::info!(leave_id = %leave.id, doctor_id = %doctor.id, "leave removed");
    Ok(Json(api_success(MessageResponse {
        message: "Leave removed".to_string(),
    })))
}
