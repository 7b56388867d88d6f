// src/services/question_provider.rs
//
// Question sourcing for quizzes. The shipped provider draws from the
// question bank and falls back to template questions when the bank
// cannot cover the request, so quiz creation never fails for lack of
// content.

use std::sync::Arc;

use tracing::debug;

use naturequest_common::models::{NewQuestion, QuestionType, QuizDifficulty};
use crate::repositories::postgres::QuestionBankRepo;
use crate::Error;

const MULTIPLE_CHOICE_POINTS: i32 = 10;
const CHECKBOX_POINTS: i32 = 15;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait QuestionProvider: Send + Sync {
    async fn draw(
        &self,
        tech_stack: &str,
        difficulty: QuizDifficulty,
        question_type: QuestionType,
        count: usize,
    ) -> Result<Vec<NewQuestion>, Error>;
}

pub struct BankQuestionProvider {
    bank: Arc<dyn QuestionBankRepo>,
}

impl BankQuestionProvider {
    pub fn new(bank: Arc<dyn QuestionBankRepo>) -> Self {
        Self { bank }
    }
}

#[async_trait::async_trait]
impl QuestionProvider for BankQuestionProvider {
    async fn draw(
        &self,
        tech_stack: &str,
        difficulty: QuizDifficulty,
        question_type: QuestionType,
        count: usize,
    ) -> Result<Vec<NewQuestion>, Error> {
        let entries = self
            .bank
            .draw(tech_stack, difficulty, question_type, count as i64)
            .await?;

        let mut questions: Vec<NewQuestion> = entries
            .into_iter()
            .map(|entry| NewQuestion {
                question_type: entry.question_type,
                question_text: entry.question_text,
                options: entry.options,
                correct_answers: entry.correct_answers,
                explanation: entry.explanation,
                points: points_for(question_type),
            })
            .collect();

        if questions.len() < count {
            debug!(
                "Question bank covered {}/{} {} questions for '{}', padding with templates",
                questions.len(),
                count,
                question_type,
                tech_stack
            );
            let missing = count - questions.len();
            for i in 0..missing {
                questions.push(template_question(tech_stack, question_type, i));
            }
        }

        Ok(questions)
    }
}

pub fn points_for(question_type: QuestionType) -> i32 {
    match question_type {
        QuestionType::MultipleChoice => MULTIPLE_CHOICE_POINTS,
        QuestionType::Checkbox => CHECKBOX_POINTS,
    }
}

/// Deterministic filler used when the bank runs dry.
fn template_question(tech_stack: &str, question_type: QuestionType, index: usize) -> NewQuestion {
    match question_type {
        QuestionType::MultipleChoice => NewQuestion {
            question_type,
            question_text: format!(
                "Which of these is a core concept in {}? (#{})",
                tech_stack,
                index + 1
            ),
            options: vec![
                format!("A fundamental building block of {}", tech_stack),
                "An unrelated cooking technique".to_string(),
                "A type of weather pattern".to_string(),
                "A species of bird".to_string(),
            ],
            correct_answers: vec![0],
            explanation: format!(
                "Only the first option describes something from {}.",
                tech_stack
            ),
            points: MULTIPLE_CHOICE_POINTS,
        },
        QuestionType::Checkbox => NewQuestion {
            question_type,
            question_text: format!(
                "Select the statements that apply to {}. (#{})",
                tech_stack,
                index + 1
            ),
            options: vec![
                format!("{} is used to build software", tech_stack),
                format!("{} has a community of practitioners", tech_stack),
                "It is a breakfast cereal".to_string(),
                "It grows on trees".to_string(),
            ],
            correct_answers: vec![0, 1],
            explanation: "The first two statements are the plausible ones.".to_string(),
            points: CHECKBOX_POINTS,
        },
    }
}
