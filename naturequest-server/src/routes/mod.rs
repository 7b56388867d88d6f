// naturequest-server/src/routes/mod.rs

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod challenge;
pub mod health;
pub mod progress;
pub mod quiz;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(progress::router())
        .merge(quiz::router())
        .merge(challenge::router())
}
