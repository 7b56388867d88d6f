// src/services/quiz_service.rs
//
// Quiz lifecycle: idempotent creation per (user, challenge), scoring on
// submission, per-stack metrics, and the progress hook when a quiz is
// passed.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use naturequest_common::models::{
    ProgressUpdate, Question, QuestionResponse, QuestionType, Quiz, QuizDifficulty,
    QuizSubmitOutcome, QuizUserStats, ResponseInput, TransactionType,
};
use crate::repositories::postgres::{ProfileRepo, QuizMetricsRepo, QuizRepo};
use crate::services::progress_service::ProgressService;
use crate::services::question_provider::QuestionProvider;
use crate::Error;

const QUESTIONS_PER_QUIZ: usize = 5;
const MULTIPLE_CHOICE_PER_QUIZ: usize = 3;
const PASS_THRESHOLD: f64 = 70.0;
const RECENT_QUIZZES: i64 = 5;

pub struct QuizService {
    quizzes: Arc<dyn QuizRepo>,
    provider: Arc<dyn QuestionProvider>,
    metrics: Arc<dyn QuizMetricsRepo>,
    profiles: Arc<dyn ProfileRepo>,
    progress: Arc<ProgressService>,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizRepo>,
        provider: Arc<dyn QuestionProvider>,
        metrics: Arc<dyn QuizMetricsRepo>,
        profiles: Arc<dyn ProfileRepo>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            quizzes,
            provider,
            metrics,
            profiles,
            progress,
        }
    }

    /// Idempotent per (user, challenge): a second call hands back the
    /// existing quiz instead of generating a new one.
    pub async fn create_quiz(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        tech_stack: &str,
        difficulty: Option<QuizDifficulty>,
    ) -> Result<(Quiz, Vec<Question>), Error> {
        let tech_stack = tech_stack.trim();
        if tech_stack.is_empty() {
            return Err(Error::Validation("tech_stack must not be empty".into()));
        }

        if let Some(existing) = self
            .quizzes
            .find_for_user_challenge(user_id, challenge_id)
            .await?
        {
            let questions = self.quizzes.questions_for(existing.quiz_id).await?;
            return Ok((existing, questions));
        }

        let difficulty = match difficulty {
            Some(d) => d,
            None => self.profiles.get_or_create(user_id).await?.quiz_difficulty(),
        };

        let mut drawn = self
            .provider
            .draw(
                tech_stack,
                difficulty,
                QuestionType::MultipleChoice,
                MULTIPLE_CHOICE_PER_QUIZ,
            )
            .await?;
        drawn.extend(
            self.provider
                .draw(
                    tech_stack,
                    difficulty,
                    QuestionType::Checkbox,
                    QUESTIONS_PER_QUIZ - MULTIPLE_CHOICE_PER_QUIZ,
                )
                .await?,
        );

        let quiz = Quiz {
            quiz_id: Uuid::new_v4(),
            user_id,
            challenge_id,
            tech_stack: tech_stack.to_string(),
            difficulty,
            total_questions: drawn.len() as i32,
            pass_threshold: PASS_THRESHOLD,
            score: None,
            passed: false,
            created_at: Utc::now(),
            completed_at: None,
        };
        let questions: Vec<Question> = drawn
            .into_iter()
            .enumerate()
            .map(|(i, q)| Question {
                question_id: Uuid::new_v4(),
                quiz_id: quiz.quiz_id,
                position: i as i32 + 1,
                question_type: q.question_type,
                question_text: q.question_text,
                options: q.options,
                correct_answers: q.correct_answers,
                explanation: q.explanation,
                points: q.points,
            })
            .collect();

        self.quizzes.create_with_questions(&quiz, &questions).await?;
        info!(
            "Created {} '{}' quiz {} for user {}",
            quiz.difficulty, quiz.tech_stack, quiz.quiz_id, user_id
        );
        Ok((quiz, questions))
    }

    pub async fn quiz_detail(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<(Quiz, Vec<Question>), Error> {
        let quiz = self.owned_quiz(user_id, quiz_id).await?;
        let questions = self.quizzes.questions_for(quiz_id).await?;
        Ok((quiz, questions))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Quiz>, Error> {
        self.quizzes.list_for_user(user_id).await
    }

    /// Score and persist a submission. Each question is right only when
    /// the selected index set equals the correct set; unanswered
    /// questions count as wrong.
    pub async fn submit(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
        responses: &[ResponseInput],
    ) -> Result<QuizSubmitOutcome, Error> {
        let mut quiz = self.owned_quiz(user_id, quiz_id).await?;
        if quiz.is_completed() {
            return Err(Error::Conflict("quiz has already been submitted".into()));
        }
        let mut attempt = self
            .quizzes
            .attempt_for(quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No attempt for quiz {}", quiz_id)))?;
        if attempt.is_submitted() {
            return Err(Error::Conflict("quiz has already been submitted".into()));
        }

        let questions = self.quizzes.questions_for(quiz_id).await?;
        let by_question: HashMap<Uuid, &ResponseInput> =
            responses.iter().map(|r| (r.question_id, r)).collect();

        let mut earned = 0;
        let mut total = 0;
        let mut recorded = Vec::with_capacity(questions.len());
        for question in &questions {
            total += question.points;
            let selected = by_question
                .get(&question.question_id)
                .map(|r| r.selected_answers.clone())
                .unwrap_or_default();
            let correct = answer_sets_match(&selected, &question.correct_answers);
            let points_earned = if correct { question.points } else { 0 };
            earned += points_earned;
            recorded.push(QuestionResponse {
                response_id: Uuid::new_v4(),
                attempt_id: attempt.attempt_id,
                question_id: question.question_id,
                selected_answers: selected,
                is_correct: correct,
                points_earned,
            });
        }

        let score = if total > 0 {
            f64::from(earned) / f64::from(total) * 100.0
        } else {
            0.0
        };
        let passed = score >= quiz.pass_threshold;
        let now = Utc::now();

        quiz.score = Some(score);
        quiz.passed = passed;
        quiz.completed_at = Some(now);
        attempt.total_score = Some(score);
        attempt.submitted_at = Some(now);

        self.quizzes
            .record_submission(&quiz, &attempt, &recorded)
            .await?;
        self.metrics
            .record_result(&quiz.tech_stack, quiz.difficulty, score, passed)
            .await?;

        if passed {
            self.progress
                .update_progress(ProgressUpdate {
                    user_id,
                    points: earned,
                    transaction_type: TransactionType::QuizCompletion,
                    description: format!("Passed the {} quiz", quiz.tech_stack),
                    challenge_id: Some(quiz.challenge_id),
                    quiz_id: Some(quiz.quiz_id),
                    increment_challenges: false,
                    increment_quizzes: true,
                })
                .await?;
        }

        info!(
            "Quiz {} submitted by {}: score {:.1}, passed={}",
            quiz_id, user_id, score, passed
        );
        Ok(QuizSubmitOutcome {
            score,
            passed,
            earned_points: earned,
            total_points: total,
        })
    }

    pub async fn user_quiz_stats(&self, user_id: Uuid) -> Result<QuizUserStats, Error> {
        let completed = self.quizzes.completed_for_user(user_id).await?;
        let total = completed.len() as i64;
        let passed = completed.iter().filter(|q| q.passed).count() as i64;
        let average_score = if completed.is_empty() {
            0.0
        } else {
            completed.iter().filter_map(|q| q.score).sum::<f64>() / completed.len() as f64
        };

        let mut by_stack: HashMap<&str, usize> = HashMap::new();
        for quiz in &completed {
            *by_stack.entry(quiz.tech_stack.as_str()).or_default() += 1;
        }
        let favorite_tech_stack = by_stack
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(stack, _)| stack.to_string());

        let recent_quizzes = self.quizzes.recent_for_user(user_id, RECENT_QUIZZES).await?;
        Ok(QuizUserStats {
            total_quizzes_taken: total,
            quizzes_passed: passed,
            overall_pass_rate: if total > 0 {
                passed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            average_score,
            favorite_tech_stack,
            recent_quizzes,
        })
    }

    async fn owned_quiz(&self, user_id: Uuid, quiz_id: Uuid) -> Result<Quiz, Error> {
        let quiz = self
            .quizzes
            .get(quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))?;
        if quiz.user_id != user_id {
            return Err(Error::NotFound(format!("Quiz {} not found", quiz_id)));
        }
        Ok(quiz)
    }
}

fn answer_sets_match(selected: &[usize], correct: &[usize]) -> bool {
    let selected: BTreeSet<usize> = selected.iter().copied().collect();
    let correct: BTreeSet<usize> = correct.iter().copied().collect();
    !correct.is_empty() && selected == correct
}
