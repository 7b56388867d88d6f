// naturequest-server/src/state.rs

use std::sync::Arc;

use naturequest_core::auth::AuthService;
use naturequest_core::places::FoursquarePlacesClient;
use naturequest_core::repositories::postgres::{
    PostgresAuthTokenRepository, PostgresBadgeRepository, PostgresChallengeAttemptRepository,
    PostgresChallengeRepository, PostgresLevelRepository, PostgresPointsRepository,
    PostgresProfileRepository, PostgresQuestionBankRepository, PostgresQuizMetricsRepository,
    PostgresQuizRepository, PostgresVerificationRepository, UserRepository,
};
use naturequest_core::services::{
    BankQuestionProvider, ProgressService, QuizService, VerificationService,
};
use naturequest_core::{Database, DefaultHttpClient};

pub struct AppState {
    pub auth: Arc<AuthService>,
    pub progress: Arc<ProgressService>,
    pub quizzes: Arc<QuizService>,
    pub verification: Arc<VerificationService>,
}

impl AppState {
    pub fn new(db: &Database, foursquare_api_key: String) -> Arc<Self> {
        let pool = db.pool().clone();

        let users = Arc::new(UserRepository::new(pool.clone()));
        let tokens = Arc::new(PostgresAuthTokenRepository::new(pool.clone()));
        let profiles = Arc::new(PostgresProfileRepository::new(pool.clone()));
        let points = Arc::new(PostgresPointsRepository::new(pool.clone()));
        let badges = Arc::new(PostgresBadgeRepository::new(pool.clone()));
        let levels = Arc::new(PostgresLevelRepository::new(pool.clone()));
        let quizzes = Arc::new(PostgresQuizRepository::new(pool.clone()));
        let question_bank = Arc::new(PostgresQuestionBankRepository::new(pool.clone()));
        let quiz_metrics = Arc::new(PostgresQuizMetricsRepository::new(pool.clone()));
        let challenges = Arc::new(PostgresChallengeRepository::new(pool.clone()));
        let attempts = Arc::new(PostgresChallengeAttemptRepository::new(pool.clone()));
        let verifications = Arc::new(PostgresVerificationRepository::new(pool));

        let progress = Arc::new(ProgressService::new(
            profiles.clone(),
            points,
            badges,
            levels,
        ));
        let auth = Arc::new(AuthService::new(users, tokens, profiles.clone()));
        let provider = Arc::new(BankQuestionProvider::new(question_bank));
        let quizzes = Arc::new(QuizService::new(
            quizzes,
            provider,
            quiz_metrics,
            profiles,
            progress.clone(),
        ));
        let places = Arc::new(FoursquarePlacesClient::new(
            Arc::new(DefaultHttpClient::default()),
            foursquare_api_key,
        ));
        let verification = Arc::new(VerificationService::new(
            challenges,
            attempts,
            verifications,
            places,
            progress.clone(),
        ));

        Arc::new(Self {
            auth,
            progress,
            quizzes,
            verification,
        })
    }
}
