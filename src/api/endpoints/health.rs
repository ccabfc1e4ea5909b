//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub oracle_available: bool,
    pub active_sessions: usize,
    pub version: &'static str,
}

/// `GET /api/health`
///
/// Reports `degraded` when the oracle backend cannot answer; turns would
/// then only get reprompts.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let oracle_available = ctx.service.oracle_available().await;
    Json(HealthResponse {
        status: if oracle_available { "ok" } else { "degraded" },
        oracle_available,
        active_sessions: ctx.service.registry().len(),
        version: crate::config::APP_VERSION,
    })
}
