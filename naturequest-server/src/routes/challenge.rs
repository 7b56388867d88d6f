// naturequest-server/src/routes/challenge.rs

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use naturequest_common::models::{
    AttemptSubmission, Challenge, ChallengeAttempt, ChallengeDifficulty, ChallengeProgressReport,
    LocationType, VerificationMetrics,
};
use naturequest_common::Error;

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/challenge-verification/challenges/",
            get(list_challenges),
        )
        .route(
            "/api/challenge-verification/challenges/my_progress/",
            get(my_progress),
        )
        .route(
            "/api/challenge-verification/challenges/{challenge_id}/",
            get(challenge_detail),
        )
        .route(
            "/api/challenge-verification/attempts/",
            get(my_attempts).post(submit_attempt),
        )
        .route(
            "/api/challenge-verification/verification/metrics/",
            get(metrics_all),
        )
        .route(
            "/api/challenge-verification/verification/metrics/{challenge_id}/",
            get(metrics_for),
        )
}

#[derive(Deserialize)]
struct ChallengeFilter {
    difficulty: Option<String>,
    location_type: Option<String>,
}

async fn list_challenges(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(filter): Query<ChallengeFilter>,
) -> Result<Json<Vec<Challenge>>, ApiError> {
    let difficulty = filter
        .difficulty
        .map(|s| s.parse::<ChallengeDifficulty>().map_err(Error::Parse))
        .transpose()?;
    let location_type = filter
        .location_type
        .map(|s| s.parse::<LocationType>().map_err(Error::Parse))
        .transpose()?;
    Ok(Json(
        state
            .verification
            .list_challenges(difficulty, location_type)
            .await?,
    ))
}

async fn challenge_detail(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(challenge_id): Path<Uuid>,
) -> Result<Json<Challenge>, ApiError> {
    Ok(Json(state.verification.get_challenge(challenge_id).await?))
}

async fn my_progress(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ChallengeProgressReport>, ApiError> {
    Ok(Json(state.verification.my_progress(user.user_id).await?))
}

async fn my_attempts(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ChallengeAttempt>>, ApiError> {
    Ok(Json(state.verification.my_attempts(user.user_id).await?))
}

async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(submission): Json<AttemptSubmission>,
) -> Result<(StatusCode, Json<ChallengeAttempt>), ApiError> {
    let attempt = state
        .verification
        .submit_attempt(user.user_id, submission)
        .await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

#[derive(Serialize)]
struct MetricsView {
    #[serde(flatten)]
    metrics: VerificationMetrics,
    success_rate: f64,
}

impl From<VerificationMetrics> for MetricsView {
    fn from(metrics: VerificationMetrics) -> Self {
        let success_rate = metrics.success_rate();
        Self {
            metrics,
            success_rate,
        }
    }
}

async fn metrics_all(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<MetricsView>>, ApiError> {
    let metrics = state.verification.metrics_all().await?;
    Ok(Json(metrics.into_iter().map(MetricsView::from).collect()))
}

async fn metrics_for(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(challenge_id): Path<Uuid>,
) -> Result<Json<MetricsView>, ApiError> {
    let metrics = state.verification.metrics(challenge_id).await?;
    Ok(Json(MetricsView::from(metrics)))
}
