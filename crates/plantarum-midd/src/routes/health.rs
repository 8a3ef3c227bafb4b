use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn health_body(service: &str) -> Value {
    json!({ "ok": true, "service": service, "ts": now_ms() })
}

pub async fn service(State(state): State<AppState>) -> Json<Value> {
    Json(health_body(&state.service_name))
}

pub async fn tokenization() -> Json<Value> {
    Json(health_body("tokenization"))
}
