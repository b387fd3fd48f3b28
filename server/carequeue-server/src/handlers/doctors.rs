use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use booking_engine::DayAvailability;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::models::{Doctor, DoctorLeave, DoctorUpdate};
use crate::server::CareQueueServer;
use crate::services::{BookingService, CreateDoctorRequest, CreateLeaveRequest, LeaveCreated, OnboardedUser, OnboardingService};
use crate::store::{DoctorRepository, LeaveRepository};
use crate::types::{DateQuery, DateRange, PaginationParams};
use crate::validation::RequestValidation;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DoctorListParams {
    /// Only active (`true`) or inactive (`false`) doctors
    pub active: Option<bool>,
}

impl RequestValidation for DoctorUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            crate::validate_required!(name, "Doctor name cannot be empty");
        }
        if let Some(capacity) = self.slot_capacity {
            crate::validate_range!(capacity, 1, 100, "Slot capacity must be between 1 and 100");
        }
        if let Some(fee) = self.consultation_fee {
            crate::validate_field!(fee, fee >= 0, "Consultation fee cannot be negative");
        }
        Ok(())
    }
}

pub(crate) async fn require_doctor(server: &CareQueueServer, hospital_id: Uuid, id: Uuid) -> ApiResult<Doctor> {
    server
        .store
        .find_doctor(hospital_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Doctor"))
}

/// Admins manage every doctor's calendar; doctors manage their own
pub(crate) fn require_admin_or_doctor(auth: &AuthContext, doctor: &Doctor) -> ApiResult<()> {
    if auth.is_admin() || auth.user_id == doctor.user_id {
        Ok(())
    } else {
        Err(ApiError::authorization("Only an admin or the doctor can manage this calendar"))
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/doctors",
    request_body = CreateDoctorRequest,
    responses(
        (status = 201, description = "Doctor onboarded", body = OnboardedUser),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Email already in use")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn create_doctor(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Json(req): Json<CreateDoctorRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<OnboardedUser>>)> {
    auth.require_admin()?;
    let onboarded = OnboardingService::from_state(&server)
        .create_doctor(auth.hospital_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(api_success(onboarded))))
}

#[utoipa::path(
    get,
    path = "/api/v1/doctors",
    params(DoctorListParams, PaginationParams),
    responses(
        (status = 200, description = "Doctors of the caller's hospital", body = Vec<Doctor>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn list_doctors(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Query(params): Query<DoctorListParams>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Doctor>>>> {
    let page = server
        .store
        .list_doctors(auth.hospital_id, params.active, pagination.page_request())
        .await?;
    Ok(Json(pagination.wrap_response(page.items, page.total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/doctors/{id}",
    params(("id" = Uuid, Path, description = "Doctor id or the doctor's user id")),
    responses(
        (status = 200, description = "Doctor", body = Doctor),
        (status = 404, description = "Doctor not found")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn get_doctor(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Doctor>>> {
    let doctor = require_doctor(&server, auth.hospital_id, id).await?;
    Ok(Json(api_success(doctor)))
}

#[utoipa::path(
    put,
    path = "/api/v1/doctors/{id}",
    params(("id" = Uuid, Path, description = "Doctor id or the doctor's user id")),
    request_body = DoctorUpdate,
    responses(
        (status = 200, description = "Doctor updated", body = Doctor),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Doctor not found")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn update_doctor(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<DoctorUpdate>,
) -> ApiResult<Json<ApiResponse<Doctor>>> {
    auth.require_admin()?;
    req.validate()?;
    let doctor = require_doctor(&server, auth.hospital_id, id).await?;
    let doctor = server.store.update_doctor(auth.hospital_id, doctor.id, req).await?;
    tracing::info!(doctor_id = %doctor.id, "doctor updated");
    Ok(Json(api_success(doctor)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/doctors/{id}",
    params(("id" = Uuid, Path, description = "Doctor id or the doctor's user id")),
    responses(
        (status = 200, description = "Doctor and login deactivated", body = Doctor),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Doctor not found")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn deactivate_doctor(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Doctor>>> {
    auth.require_admin()?;
    let doctor = require_doctor(&server, auth.hospital_id, id).await?;
    let doctor = server.store.deactivate_doctor(auth.hospital_id, doctor.id).await?;
    tracing::info!(doctor_id = %doctor.id, "doctor deactivated");
    Ok(Json(api_success(doctor)))
}

/// Per-slot capacity, bookings and blocks for one day
#[utoipa::path(
    get,
    path = "/api/v1/doctors/{id}/availability",
    params(("id" = Uuid, Path, description = "Doctor id or the doctor's user id"), DateQuery),
    responses(
        (status = 200, description = "Availability for the day"),
        (status = 404, description = "Doctor not found")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn doctor_availability(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<ApiResponse<DayAvailability>>> {
    let date = query.date.unwrap_or_else(|| server.today());
    let availability = BookingService::from_state(&server)
        .availability(auth.hospital_id, id, date)
        .await?;
    Ok(Json(api_success(availability)))
}

#[utoipa::path(
    post,
    path = "/api/v1/doctors/{id}/leaves",
    params(("id" = Uuid, Path, description = "Doctor id or the doctor's user id")),
    request_body = CreateLeaveRequest,
    responses(
        (status = 201, description = "Leave recorded", body = LeaveCreated),
        (status = 400, description = "Past date or invalid slot"),
        (status = 403, description = "Not an admin or this doctor")
    ),
    tag = "leaves",
    security(("bearer_auth" = []))
)]
pub async fn create_leave(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateLeaveRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<LeaveCreated>>)> {
    let doctor = require_doctor(&server, auth.hospital_id, id).await?;
    require_admin_or_doctor(&auth, &doctor)?;

    let created = BookingService::from_state(&server)
        .add_leave(&doctor, req, auth.user_id, server.today())
        .await?;
    tracing::info!(
        leave_id = %created.leave.id,
        doctor_id = %doctor.id,
        full_day = created.leave.is_full_day(),
        "leave recorded"
    );
    Ok((StatusCode::CREATED, Json(api_success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/doctors/{id}/leaves",
    params(("id" = Uuid, Path, description = "Doctor id or the doctor's user id"), DateRange),
    responses(
        (status = 200, description = "Leaves in the window", body = Vec<DoctorLeave>),
        (status = 404, description = "Doctor not found")
    ),
    tag = "leaves",
    security(("bearer_auth" = []))
)]
pub async fn list_leaves(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<ApiResponse<Vec<DoctorLeave>>>> {
    range.check()?;
    let doctor = require_doctor(&server, auth.hospital_id, id).await?;
    let leaves = server
        .store
        .list_leaves(auth.hospital_id, doctor.id, range.from, range.to)
        .await?;
    Ok(Json(api_success(leaves)))
}
