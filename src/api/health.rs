//! Health check endpoint
//!
//! GET /api/v1/health pings the database. A failed ping answers 503 so load
//! balancers take the instance out of rotation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_handler))
}

async fn health_handler(State(state): State<AppState>) -> Response {
    match state.pool.ping().await {
        Ok(()) => {
            let response = HealthResponse {
                status: "healthy",
                database: "connected",
                version: env!("CARGO_PKG_VERSION"),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("Health check failed: {:?}", e);
            let response = HealthResponse {
                status: "unhealthy",
                database: "disconnected",
                version: env!("CARGO_PKG_VERSION"),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
        }
    }
}
