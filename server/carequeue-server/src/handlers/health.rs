use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{api_success, ApiResponse};
use crate::server::CareQueueServer;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// `postgres` or `memory`
    #[schema(example = "postgres")]
    pub store: String,
    #[schema(example = "2026-03-09T10:30:00Z")]
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    #[schema(example = "carequeue-server")]
    pub name: String,
    #[schema(example = "0.1.0")]
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and store are healthy", body = HealthResponse),
        (status = 503, description = "Store is unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(server): State<CareQueueServer>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let (status_code, status) = match server.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::error!(error = %e, "store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: server.store.backend().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    (status_code, Json(api_success(response)))
}

#[utoipa::path(
    get,
    path = "/version",
    tag = "health",
    responses((status = 200, description = "Build information", body = VersionResponse))
)]
pub async fn version_info() -> Json<ApiResponse<VersionResponse>> {
    Json(api_success(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
