// naturequest-server/src/routes/progress.rs

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;

use naturequest_common::models::{
    Badge, LeaderboardEntry, Level, PointsTransaction, ProgressOutcome, ProgressUpdate,
    UserBadge, UserProfile, UserStats,
};

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/progress/profiles/my_profile/", get(my_profile))
        .route(
            "/api/progress/profiles/update_interests/",
            patch(update_interests),
        )
        .route("/api/progress/update-progress/", post(update_progress))
        .route("/api/progress/leaderboard/", get(leaderboard))
        .route("/api/progress/stats/", get(stats))
        .route("/api/progress/history/", get(history))
        .route("/api/progress/badges/", get(badge_catalog))
        .route("/api/progress/badges/my_badges/", get(my_badges))
        .route("/api/progress/levels/", get(level_catalog))
}

async fn my_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.progress.my_profile(user.user_id).await?))
}

#[derive(Deserialize)]
struct InterestsPatch {
    is_techie: Option<bool>,
    tech_stacks: Option<String>,
}

async fn update_interests(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(patch): Json<InterestsPatch>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .progress
        .update_interests(user.user_id, patch.is_techie, patch.tech_stacks)
        .await?;
    Ok(Json(profile))
}

// Open endpoint used by internal services feeding the ledger.
async fn update_progress(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<ProgressOutcome>, ApiError> {
    Ok(Json(state.progress.update_progress(update).await?))
}

#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<i64>,
}

async fn leaderboard(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    Ok(Json(state.progress.leaderboard(query.limit).await?))
}

async fn stats(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.progress.user_stats(user.user_id).await?))
}

#[derive(Deserialize)]
struct HistoryQuery {
    page: Option<i64>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PointsTransaction>>, ApiError> {
    let page = query.page.unwrap_or(1);
    Ok(Json(state.progress.points_history(user.user_id, page).await?))
}

async fn badge_catalog(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<Badge>>, ApiError> {
    Ok(Json(state.progress.badge_catalog().await?))
}

async fn my_badges(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<(UserBadge, Badge)>>, ApiError> {
    Ok(Json(state.progress.my_badges(user.user_id).await?))
}

async fn level_catalog(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<Level>>, ApiError> {
    Ok(Json(state.progress.level_catalog().await?))
}
