// tests/repository_tests.rs
//
// Exercises the Postgres repositories against a real database. Run with
// `cargo test -- --ignored` once a local Postgres is available; see
// test_utils::helpers for the connection defaults.

use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use naturequest_common::models::*;
use naturequest_core::repositories::postgres::*;
use naturequest_core::test_utils::helpers::setup_test_database;
use naturequest_core::{Database, Error};

async fn seed_user(db: &Database, username: &str) -> Result<User, Error> {
    let now = Utc::now();
    let user = User {
        user_id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: "salt$digest".to_string(),
        is_active: true,
        created_at: now,
        last_seen: now,
    };
    UserRepository::new(db.pool().clone()).create(&user).await?;
    Ok(user)
}

#[tokio::test]
#[ignore] // requires Postgres
async fn user_roundtrip_and_last_seen() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = UserRepository::new(db.pool().clone());

    let user = seed_user(&db, "trailblazer").await?;
    let fetched = repo.get(user.user_id).await?.expect("user should exist");
    assert_eq!(fetched.username, "trailblazer");

    let by_name = repo.get_by_username("trailblazer").await?;
    assert!(by_name.is_some());

    let later = Utc::now() + Duration::minutes(5);
    repo.touch_last_seen(user.user_id, later).await?;
    let bumped = repo.get(user.user_id).await?.unwrap();
    assert!(bumped.last_seen > user.last_seen);
    Ok(())
}

#[tokio::test]
#[ignore] // requires Postgres
async fn profile_get_or_create_is_idempotent() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = seed_user(&db, "profile_user").await?;
    let repo = PostgresProfileRepository::new(db.pool().clone());

    let first = repo.get_or_create(user.user_id).await?;
    assert_eq!(first.total_points, 0);

    let mut updated = first.clone();
    updated.total_points = 300;
    updated.is_techie = true;
    updated.tech_stacks = "rust, postgres".to_string();
    repo.update(&updated).await?;

    let second = repo.get_or_create(user.user_id).await?;
    assert_eq!(second.total_points, 300);
    assert!(second.is_techie);
    assert_eq!(second.tech_stack_list(), vec!["rust", "postgres"]);
    Ok(())
}

#[tokio::test]
#[ignore] // requires Postgres
async fn points_history_pages_newest_first() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = seed_user(&db, "ledger_user").await?;
    let repo = PostgresPointsRepository::new(db.pool().clone());

    for i in 0..3 {
        let mut tx = PointsTransaction::new(
            user.user_id,
            TransactionType::ChallengeCompletion,
            10 * (i + 1),
            &format!("entry {}", i),
        );
        tx.created_at = Utc::now() + Duration::seconds(i64::from(i));
        repo.insert(&tx).await?;
    }

    let page = repo.history(user.user_id, 2, 0).await?;
    assert_eq!(page.len(), 2);
    assert!(page[0].created_at >= page[1].created_at);

    let rest = repo.history(user.user_id, 2, 2).await?;
    assert_eq!(rest.len(), 1);
    Ok(())
}

#[tokio::test]
#[ignore] // requires Postgres
async fn badge_catalog_and_grants() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = seed_user(&db, "badge_user").await?;
    let repo = PostgresBadgeRepository::new(db.pool().clone());

    let all = repo.list_all().await?;
    assert_eq!(all.len(), 13);
    assert_eq!(all.iter().filter(|b| b.is_special).count(), 1);

    let reachable = repo.unearned_at_or_below(user.user_id, 600).await?;
    assert_eq!(reachable.len(), 2); // Rat (250) and Ox (500)

    let rat = reachable[0].clone();
    repo.grant(&UserBadge {
        user_badge_id: Uuid::new_v4(),
        user_id: user.user_id,
        badge_id: rat.badge_id,
        earned_at: Utc::now(),
        points_when_earned: 600,
    })
    .await?;

    assert_eq!(repo.regular_badge_count(user.user_id).await?, 1);
    let next = repo.next_unearned_above(user.user_id, 600).await?.unwrap();
    assert_eq!(next.points_required, 750);
    assert!(!next.is_special);

    let earned = repo.earned_for_user(user.user_id).await?;
    assert_eq!(earned.len(), 1);
    assert_eq!(earned[0].1.name, rat.name);
    Ok(())
}

#[tokio::test]
#[ignore] // requires Postgres
async fn level_thresholds_resolve() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresLevelRepository::new(db.pool().clone());

    assert_eq!(repo.list_all().await?.len(), 12);

    let level = repo.highest_for_points(1_200).await?.unwrap();
    assert_eq!(level.level_number, 4);

    let next = repo.next_above(4).await?.unwrap();
    assert_eq!(next.level_number, 5);
    assert!(repo.next_above(12).await?.is_none());
    Ok(())
}

#[tokio::test]
#[ignore] // requires Postgres
async fn quiz_lifecycle_persists() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = seed_user(&db, "quiz_user").await?;
    let repo = PostgresQuizRepository::new(db.pool().clone());

    let challenge_id = PostgresChallengeRepository::new(db.pool().clone())
        .list_active(None, None)
        .await?[0]
        .challenge_id;

    let mut quiz = Quiz {
        quiz_id: Uuid::new_v4(),
        user_id: user.user_id,
        challenge_id,
        tech_stack: "rust".to_string(),
        difficulty: QuizDifficulty::Easy,
        total_questions: 1,
        pass_threshold: 70.0,
        score: None,
        passed: false,
        created_at: Utc::now(),
        completed_at: None,
    };
    let question = Question {
        question_id: Uuid::new_v4(),
        quiz_id: quiz.quiz_id,
        position: 1,
        question_type: QuestionType::MultipleChoice,
        question_text: "What is ownership?".to_string(),
        options: vec!["a".into(), "b".into()],
        correct_answers: vec![0],
        explanation: "It is a.".to_string(),
        points: 10,
    };

    let mut attempt = repo.create_with_questions(&quiz, &[question.clone()]).await?;
    assert!(!attempt.is_submitted());

    let found = repo
        .find_for_user_challenge(user.user_id, challenge_id)
        .await?
        .unwrap();
    assert_eq!(found.quiz_id, quiz.quiz_id);

    let questions = repo.questions_for(quiz.quiz_id).await?;
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].correct_answers, vec![0]);

    quiz.score = Some(100.0);
    quiz.passed = true;
    quiz.completed_at = Some(Utc::now());
    attempt.total_score = Some(100.0);
    attempt.submitted_at = Some(Utc::now());
    let response = QuestionResponse {
        response_id: Uuid::new_v4(),
        attempt_id: attempt.attempt_id,
        question_id: question.question_id,
        selected_answers: vec![0],
        is_correct: true,
        points_earned: 10,
    };
    repo.record_submission(&quiz, &attempt, &[response]).await?;

    let completed = repo.completed_for_user(user.user_id).await?;
    assert_eq!(completed.len(), 1);
    assert!(completed[0].passed);
    Ok(())
}

#[tokio::test]
#[ignore] // requires Postgres
async fn question_bank_draw_bumps_usage() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresQuestionBankRepository::new(db.pool().clone());

    let first = repo
        .draw("rust", QuizDifficulty::Easy, QuestionType::MultipleChoice, 2)
        .await?;
    if first.is_empty() {
        // Seed content may not cover this combination.
        return Ok(());
    }

    let again = repo
        .draw("rust", QuizDifficulty::Easy, QuestionType::MultipleChoice, 2)
        .await?;
    // Least-used ordering: the second draw never returns entries with a
    // lower usage count than the first draw started at.
    assert!(again.iter().all(|e| e.times_used >= first[0].times_used));
    Ok(())
}

#[tokio::test]
#[ignore] // requires Postgres
async fn challenge_attempts_and_fraud_lookups() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = seed_user(&db, "attempt_user").await?;
    let challenges = PostgresChallengeRepository::new(db.pool().clone());
    let repo = PostgresChallengeAttemptRepository::new(db.pool().clone());

    let challenge = challenges.list_active(None, None).await?[0].clone();
    let mut attempt = ChallengeAttempt {
        attempt_id: Uuid::new_v4(),
        user_id: user.user_id,
        challenge_id: challenge.challenge_id,
        status: AttemptStatus::Pending,
        photo_url: "https://cdn.example.com/x.jpg".to_string(),
        photo_digest: "digest-1".to_string(),
        submitted_latitude: challenge.target_latitude,
        submitted_longitude: challenge.target_longitude,
        submission_notes: String::new(),
        location_verified: false,
        verification_details: Value::Null,
        points_earned: 0,
        bonus_points: 0,
        created_at: Utc::now(),
        verified_at: None,
    };
    repo.insert(&attempt).await?;

    assert!(!repo.digest_seen("digest-1", attempt.attempt_id).await?);
    assert_eq!(
        repo.count_since(user.user_id, Utc::now() - Duration::hours(1))
            .await?,
        1
    );

    attempt.status = AttemptStatus::Verified;
    attempt.location_verified = true;
    attempt.points_earned = challenge.points_reward;
    attempt.verified_at = Some(Utc::now());
    attempt.verification_details = serde_json::json!({"reasons": []});
    repo.finalize(&attempt).await?;

    let stored = repo.get(attempt.attempt_id).await?.unwrap();
    assert!(stored.is_verified());
    assert_eq!(stored.points_earned, challenge.points_reward);
    Ok(())
}

#[tokio::test]
#[ignore] // requires Postgres
async fn verification_metrics_keep_running_average() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let challenges = PostgresChallengeRepository::new(db.pool().clone());
    let repo = PostgresVerificationRepository::new(db.pool().clone());

    let challenge_id = challenges.list_active(None, None).await?[0].challenge_id;

    repo.record_attempt(challenge_id, true, None, 2.0).await?;
    repo.record_attempt(challenge_id, false, Some(FailureClass::Location), 4.0)
        .await?;

    let metrics = repo.metrics_for(challenge_id).await?.unwrap();
    assert_eq!(metrics.total_attempts, 2);
    assert_eq!(metrics.successful_verifications, 1);
    assert_eq!(metrics.location_failures, 1);
    assert!((metrics.average_verification_time - 3.0).abs() < 1e-9);
    assert!((metrics.success_rate() - 50.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
#[ignore] // requires Postgres
async fn quiz_metrics_upsert_folds_results() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresQuizMetricsRepository::new(db.pool().clone());

    repo.record_result("rust", QuizDifficulty::Easy, 80.0, true)
        .await?;
    repo.record_result("rust", QuizDifficulty::Easy, 40.0, false)
        .await?;

    let metrics = repo.get("rust", QuizDifficulty::Easy).await?.unwrap();
    assert_eq!(metrics.total_quizzes, 2);
    assert_eq!(metrics.total_passes, 1);
    assert!((metrics.average_score - 60.0).abs() < 1e-9);
    Ok(())
}
