use axum::extract::State;
use axum::{routing::get, Json, Router};
use jwtauth_db::Storage;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the storage backend is reachable.
    pub db_healthy: bool,
}

/// GET /health -- returns service and storage health.
async fn health_check<S: Storage>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    let db_healthy = state.engine.storage().health_check().await.is_ok();

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router<S: Storage>() -> Router<AppState<S>> {
    Router::new().route("/health", get(health_check::<S>))
}
