use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{api_success, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::models::Attendance;
use crate::server::CareQueueServer;
use crate::store::AttendanceRepository;
use crate::types::DateRange;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceListParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    responses(
        (status = 201, description = "Checked in for today", body = Attendance),
        (status = 409, description = "Already checked in today")
    ),
    tag = "attendance",
    security(("bearer_auth" = []))
)]
pub async fn check_in(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
) -> ApiResult<(StatusCode, Json<ApiResponse<Attendance>>)> {
    let record = server
        .store
        .check_in(auth.hospital_id, auth.user_id, server.today(), Utc::now())
        .await?;
    tracing::info!(user_id = %auth.user_id, date = %record.date, "checked in");
    Ok((StatusCode::CREATED, Json(api_success(record))))
}

#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out; under four hours counts as half day", body = Attendance),
        (status = 404, description = "No check-in today"),
        (status = 409, description = "Already checked out")
    ),
    tag = "attendance",
    security(("bearer_auth" = []))
)]
pub async fn check_out(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Attendance>>> {
    let record = server
        .store
        .check_out(auth.user_id, server.today(), Utc::now())
        .await?;
    tracing::info!(user_id = %auth.user_id, status = %record.status, "checked out");
    Ok(Json(api_success(record)))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance/me",
    params(DateRange),
    responses((status = 200, description = "Caller's attendance", body = Vec<Attendance>)),
    tag = "attendance",
    security(("bearer_auth" = []))
)]
pub async fn my_attendance(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<ApiResponse<Vec<Attendance>>>> {
    range.check()?;
    let records = server
        .store
        .list_attendance(auth.hospital_id, Some(auth.user_id), range.from, range.to)
        .await?;
    Ok(Json(api_success(records)))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceListParams),
    responses(
        (status = 200, description = "Attendance across the hospital", body = Vec<Attendance>),
        (status = 403, description = "Admins only")
    ),
    tag = "attendance",
    security(("bearer_auth" = []))
)]
pub async fn list_attendance(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Query(params): Query<AttendanceListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Attendance>>>> {
    auth.require_admin()?;
    let range = DateRange {
        from: params.from,
        to: params.to,
    };
    range.check()?;
    let records = server
        .store
        .list_attendance(auth.hospital_id, params.user_id, range.from, range.to)
        .await?;
    Ok(Json(api_success(records)))
}
