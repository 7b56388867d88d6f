// naturequest-server/src/routes/auth.rs

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use naturequest_common::models::User;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/token/", post(issue_token))
        .route("/api/auth/register/", post(register))
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .auth
        .issue_token(&credentials.username, &credentials.password)
        .await?;
    Ok(Json(TokenResponse {
        token: token.token,
        user_id: token.user_id,
        expires_at: token.expires_at,
    }))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .auth
        .register(&credentials.username, &credentials.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}
