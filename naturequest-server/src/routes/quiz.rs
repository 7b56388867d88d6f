// naturequest-server/src/routes/quiz.rs

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use naturequest_common::models::{
    Question, QuestionType, Quiz, QuizDifficulty, QuizSubmitOutcome, QuizUserStats, ResponseInput,
};

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/quiz/quizzes/", get(list_quizzes).post(create_quiz))
        .route("/api/quiz/quizzes/{quiz_id}/", get(quiz_detail))
        .route("/api/quiz/attempts/", post(submit_attempt))
        .route("/api/quiz/stats/", get(quiz_stats))
}

/// A question as exposed to clients. Correct answers and explanations
/// only appear once the quiz has been submitted.
#[derive(Serialize)]
struct QuestionView {
    question_id: Uuid,
    position: i32,
    question_type: QuestionType,
    question_text: String,
    options: Vec<String>,
    points: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    correct_answers: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

#[derive(Serialize)]
struct QuizDetail {
    #[serde(flatten)]
    quiz: Quiz,
    questions: Vec<QuestionView>,
}

fn quiz_detail_view(quiz: Quiz, questions: Vec<Question>) -> QuizDetail {
    let reveal = quiz.is_completed();
    let questions = questions
        .into_iter()
        .map(|q| QuestionView {
            question_id: q.question_id,
            position: q.position,
            question_type: q.question_type,
            question_text: q.question_text,
            options: q.options,
            points: q.points,
            correct_answers: reveal.then_some(q.correct_answers),
            explanation: reveal.then_some(q.explanation),
        })
        .collect();
    QuizDetail { quiz, questions }
}

async fn list_quizzes(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Quiz>>, ApiError> {
    Ok(Json(state.quizzes.list_for_user(user.user_id).await?))
}

#[derive(Deserialize)]
struct CreateQuizRequest {
    challenge_id: Uuid,
    tech_stack: String,
    difficulty: Option<QuizDifficulty>,
}

async fn create_quiz(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateQuizRequest>,
) -> Result<(StatusCode, Json<QuizDetail>), ApiError> {
    let (quiz, questions) = state
        .quizzes
        .create_quiz(
            user.user_id,
            request.challenge_id,
            &request.tech_stack,
            request.difficulty,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(quiz_detail_view(quiz, questions))))
}

async fn quiz_detail(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(quiz_id): Path<Uuid>,
) -> Result<Json<QuizDetail>, ApiError> {
    let (quiz, questions) = state.quizzes.quiz_detail(user.user_id, quiz_id).await?;
    Ok(Json(quiz_detail_view(quiz, questions)))
}

#[derive(Deserialize)]
struct SubmitRequest {
    quiz_id: Uuid,
    responses: Vec<ResponseInput>,
}

async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<QuizSubmitOutcome>, ApiError> {
    let outcome = state
        .quizzes
        .submit(user.user_id, request.quiz_id, &request.responses)
        .await?;
    Ok(Json(outcome))
}

async fn quiz_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<QuizUserStats>, ApiError> {
    Ok(Json(state.quizzes.user_quiz_stats(user.user_id).await?))
}
