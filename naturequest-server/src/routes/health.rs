// naturequest-server/src/routes/health.rs

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/health/", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
