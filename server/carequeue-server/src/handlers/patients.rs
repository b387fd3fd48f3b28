use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::logging::mask_phone;
use crate::middleware::AuthContext;
use crate::models::{NewPatient, Patient, PatientUpdate};
use crate::server::CareQueueServer;
use crate::store::PatientRepository;
use crate::types::PaginationParams;
use crate::validation::{looks_like_phone, RequestValidation};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientSearchParams {
    /// Case-insensitive name match or phone substring
    pub search: Option<String>,
}

impl RequestValidation for PatientUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            crate::validate_required!(name, "Patient name cannot be empty");
        }
        if let Some(phone) = &self.phone {
            crate::validate_field!(phone, looks_like_phone(phone), "Invalid phone number");
        }
        crate::validate_optional_email!(self.email, "Invalid email format");
        if let Some(age) = self.age {
            crate::validate_range!(age, 0, 150, "Age must be between 0 and 150");
        }
        Ok(())
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/patients",
    request_body = NewPatient,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Phone already registered in this hospital")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn create_patient(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Json(req): Json<NewPatient>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Patient>>)> {
    req.validate()?;
    let patient = server.store.create_patient(auth.hospital_id, req).await?;
    tracing::info!(patient_id = %patient.id, phone = %mask_phone(&patient.phone), "patient created");
    Ok((StatusCode::CREATED, Json(api_success(patient))))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients",
    params(PatientSearchParams, PaginationParams),
    responses((status = 200, description = "Matching patients", body = Vec<Patient>)),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn list_patients(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Query(params): Query<PatientSearchParams>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Patient>>>> {
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let page = server
        .store
        .search_patients(auth.hospital_id, search, pagination.page_request())
        .await?;
    Ok(Json(pagination.wrap_response(page.items, page.total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn get_patient(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Patient>>> {
    let patient = server
        .store
        .get_patient(auth.hospital_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Patient"))?;
    Ok(Json(api_success(patient)))
}

#[utoipa::path(
    put,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    request_body = PatientUpdate,
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 404, description = "Patient not found"),
        (status = 409, description = "Phone already registered in this hospital")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn update_patient(
    State(server): State<CareQueueServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<PatientUpdate>,
) -> ApiResult<Json<ApiResponse<Patient>>> {
    req.validate()?;
    let patient = server.store.update_patient(auth.hospital_id, id, req).await?;
    Ok(Json(api_success(patient)))
}
