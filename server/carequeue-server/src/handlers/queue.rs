use axum::{
    extract::{Path, Query, State},
    Json,
};
use booking_engine::DoctorQueue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::CareQueueServer;
use crate::services::BookingService;
use crate::store::HospitalRepository;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueueParams {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    /// Doctor id or the doctor's user id
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub date: NaiveDate,
    pub doctors: Vec<DoctorQueue>,
}

#[utoipa::path(
    get,
    path = "/api/v1/queue",
    params(QueueParams),
    responses(
        (status = 200, description = "Queue per doctor, ordered by token serial"),
        (status = 404, description = "Doctor not found")
    ),
    tag = "queue",
    security(("bearer_auth" = []))
)]
pub async fn hospital_queue(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Query(params): Query<QueueParams>,
) -> ApiResult<Json<ApiResponse<QueueResponse>>> {
    let date = params.date.unwrap_or_else(|| server.today());
    let doctors = BookingService::from_state(&server)
        .day_queues(auth.hospital_id, date, params.doctor_id)
        .await?;
    Ok(Json(api_success(QueueResponse { date, doctors })))
}

/// Lobby display; patient names are reduced to first name and initial
#[utoipa::path(
    get,
    path = "/api/v1/public/hospitals/{hospital_id}/queue",
    params(("hospital_id" = Uuid, Path, description = "Hospital id"), QueueParams),
    responses(
        (status = 200, description = "Queue per doctor with masked patient names"),
        (status = 404, description = "Hospital or doctor not found")
    ),
    tag = "queue"
)]
pub async fn public_queue(
    State(server): State<CareQueueServer>,
    Path(hospital_id): Path<Uuid>,
    Query(params): Query<QueueParams>,
) -> ApiResult<Json<ApiResponse<QueueResponse>>> {
    server
        .store
        .get_hospital(hospital_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Hospital"))?;

    let date = params.date.unwrap_or_else(|| server.today());
    let doctors = BookingService::from_state(&server)
        .day_queues(hospital_id, date, params.doctor_id)
        .await?
        .into_iter()
        .map(DoctorQueue::mask_patient_names)
        .collect();
    Ok(Json(api_success(QueueResponse { date, doctors })))
}
