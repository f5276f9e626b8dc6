//! Liveness endpoint, mounted at the root (not under `/api/v1`).

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

/// Routes mounted at `/`.
///
/// ```text
/// GET /healthz -> liveness probe
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// GET /healthz
async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
