use axum::{extract::State, http::StatusCode, Json};

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::models::{Hospital, HospitalUpdate};
use crate::server::CareQueueServer;
use crate::services::{HospitalRegistration, OnboardingService, RegisterHospitalRequest};
use crate::store::HospitalRepository;
use crate::validation::RequestValidation;

impl RequestValidation for HospitalUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            crate::validate_required!(name, "Hospital name cannot be empty");
        }
        crate::validate_optional_email!(self.email, "Invalid hospital email format");
        Ok(())
    }
}

/// Register a hospital and its first admin (public)
#[utoipa::path(
    post,
    path = "/api/v1/hospitals/register",
    request_body = RegisterHospitalRequest,
    responses(
        (status = 201, description = "Hospital registered", body = HospitalRegistration),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Admin email already in use")
    ),
    tag = "hospitals"
)]
pub async fn register_hospital(
    State(server): State<CareQueueServer>,
    Json(req): Json<RegisterHospitalRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<HospitalRegistration>>)> {
    let registration = OnboardingService::from_state(&server).register_hospital(req).await?;
    Ok((StatusCode::CREATED, Json(api_success(registration))))
}

#[utoipa::path(
    get,
    path = "/api/v1/hospital",
    responses(
        (status = 200, description = "Caller's hospital", body = Hospital),
        (status = 401, description = "Unauthorized")
    ),
    tag = "hospitals",
    security(("bearer_auth" = []))
)]
pub async fn get_hospital(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Hospital>>> {
    let hospital = server
        .store
        .get_hospital(auth.hospital_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Hospital"))?;
    Ok(Json(api_success(hospital)))
}

#[utoipa::path(
    put,
    path = "/api/v1/hospital",
    request_body = HospitalUpdate,
    responses(
        (status = 200, description = "Hospital updated", body = Hospital),
        (status = 403, description = "Admins only")
    ),
    tag = "hospitals",
    security(("bearer_auth" = []))
)]
pub async fn update_hospital(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Json(req): Json<HospitalUpdate>,
) -> ApiResult<Json<ApiResponse<Hospital>>> {
    auth.require_admin()?;
    req.validate()?;
    let hospital = server.store.update_hospital(auth.hospital_id, req).await?;
    tracing::info!(hospital_id = %hospital.id, "hospital updated");
    Ok(Json(api_success(hospital)))
}
