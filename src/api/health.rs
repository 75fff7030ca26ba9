//! Health check endpoint

use axum::{Json, Router, extract::State, routing::get};

use super::dto::HealthResponse;
use crate::AppState;

/// GET /v1/health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "OK".to_string(),
        env: state.config.server.env.clone(),
    })
}

pub fn health_router() -> Router<AppState> {
    Router::new().route("/v1/health", get(health_check))
}
