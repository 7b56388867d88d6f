// src/services/mod.rs

pub mod fraud;
pub mod progress_service;
pub mod question_provider;
pub mod quiz_service;
pub mod verification_service;

pub use progress_service::ProgressService;
pub use question_provider::{BankQuestionProvider, QuestionProvider};
pub use quiz_service::QuizService;
pub use verification_service::VerificationService;
