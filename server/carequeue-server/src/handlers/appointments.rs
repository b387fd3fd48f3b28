use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use booking_engine::AppointmentStatus;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::models::{Appointment, AppointmentFilter};
use crate::server::CareQueueServer;
use crate::services::{BookingService, CreateAppointmentRequest};
use crate::store::{AppointmentRepository, DoctorRepository};
use crate::types::PaginationParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentListParams {
    pub date: Option<NaiveDate>,
    /// Doctor id or the doctor's user id
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    /// One of booked, checked_in, in_consultation, completed, cancelled, no_show
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    #[schema(example = "checked_in")]
    pub status: String,
    /// Stored when moving to `cancelled`
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

/// Book an appointment and issue its token
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 400, description = "Invalid request, slot or past date"),
        (status = 404, description = "Doctor or patient not found"),
        (status = 409, description = "Doctor on leave, inactive, or slot full")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn create_appointment(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Json(req): Json<CreateAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Appointment>>)> {
    let appointment = BookingService::from_state(&server)
        .book(auth.hospital_id, Some(auth.user_id), req, server.today())
        .await?;
    Ok((StatusCode::CREATED, Json(api_success(appointment))))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    params(AppointmentListParams, PaginationParams),
    responses(
        (status = 200, description = "Appointments, ordered by date, doctor and serial", body = Vec<Appointment>),
        (status = 400, description = "Unknown status filter")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn list_appointments(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Query(params): Query<AppointmentListParams>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Appointment>>>> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<AppointmentStatus>)
        .transpose()?;

    // Accept the doctor's user id as well; unknown ids simply match nothing
    let doctor_id = match params.doctor_id {
        Some(id) => Some(
            server
                .store
                .find_doctor(auth.hospital_id, id)
                .await?
                .map_or(id, |doctor| doctor.id),
        ),
        None => None,
    };

    let filter = AppointmentFilter {
        date: params.date,
        doctor_id,
        patient_id: params.patient_id,
        status,
    };
    let page = server
        .store
        .list_appointments(auth.hospital_id, &filter, pagination.page_request())
        .await?;
    Ok(Json(pagination.wrap_response(page.items, page.total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment", body = Appointment),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn get_appointment(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Appointment>>> {
    let appointment = server
        .store
        .get_appointment(auth.hospital_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment"))?;
    Ok(Json(api_success(appointment)))
}

#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}/status",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Appointment),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Transition not allowed")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn update_status(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<ApiResponse<Appointment>>> {
    let next: AppointmentStatus = req.status.parse()?;
    let reason = (next == AppointmentStatus::Cancelled)
        .then_some(req.cancellation_reason)
        .flatten();
    let appointment = BookingService::from_state(&server)
        .set_status(auth.hospital_id, id, next, reason)
        .await?;
    Ok(Json(api_success(appointment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = CancelAppointmentRequest,
    responses(
        (status = 200, description = "Appointment cancelled; its serial is not reused", body = Appointment),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Appointment already finished")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn cancel_appointment(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelAppointmentRequest>>,
) -> ApiResult<Json<ApiResponse<Appointment>>> {
    let reason = body.and_then(|Json(req)| req.reason);
    let appointment = BookingService::from_state(&server)
        .set_status(auth.hospital_id, id, AppointmentStatus::Cancelled, reason)
        .await?;
    Ok(Json(api_success(appointment)))
}
