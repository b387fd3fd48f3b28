//! CareQueue server
//!
//! Multi-tenant clinic backend: hospital registration, doctor and staff
//! onboarding, patient booking with daily tokens, queue display, attendance
//! and doctor leave.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;
pub mod validation;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use server::CareQueueServer;

use axum::{middleware::from_fn, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Router with every route and the shared middleware stack
pub fn create_app(server: CareQueueServer) -> Router {
    let timeout = Duration::from_secs(server.config.server.request_timeout_secs);
    let cors = middleware::create_cors_layer(&server.config.server);

    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(from_fn(middleware::request_timing_middleware))
                .layer(TimeoutLayer::new(timeout)),
        )
        .with_state(server)
}
