//! Liveness handlers.

use axum::Json;
use serde::Serialize;

/// Response of `GET /ping`.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    /// Always `ok`.
    pub status: &'static str,
}

/// GET /ping - Liveness probe with a JSON body.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { status: "ok" })
}

/// GET /health - Plain text health check.
pub async fn health_check() -> &'static str {
    "OK"
}
