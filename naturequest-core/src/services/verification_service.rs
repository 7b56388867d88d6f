// src/services/verification_service.rs
//
// Challenge attempt verification: coordinate checks, distance to target,
// a places lookup for the location type, fraud scoring, and the payout
// through the progress service.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use naturequest_common::models::{
    AttemptStatus, AttemptSubmission, Challenge, ChallengeAttempt, ChallengeDifficulty,
    ChallengeProgress, ChallengeProgressReport, FraudCheck, LocationType, LocationVerification,
    ProgressUpdate, TransactionType, VerificationMetrics,
};
use crate::geo;
use crate::places::{matches_location_type, NearbyPlace, PlacesClient};
use crate::repositories::postgres::{
    ChallengeAttemptRepo, ChallengeRepo, FailureClass, VerificationRepo,
};
use crate::services::fraud::{self, FraudSignals};
use crate::services::progress_service::ProgressService;
use crate::Error;

const MIN_CONFIDENCE: f64 = 0.6;
const TYPE_MATCH_BONUS: f64 = 0.2;
const TYPE_MISMATCH_PENALTY: f64 = 0.7;

pub struct VerificationService {
    challenges: Arc<dyn ChallengeRepo>,
    attempts: Arc<dyn ChallengeAttemptRepo>,
    verifications: Arc<dyn VerificationRepo>,
    places: Arc<dyn PlacesClient>,
    progress: Arc<ProgressService>,
}

/// Outcome of the location stage, before fraud scoring.
struct LocationOutcome {
    is_valid_coordinate: bool,
    distance_m: Option<f64>,
    type_match: bool,
    confidence: f64,
    passed: bool,
    nearby: Vec<NearbyPlace>,
    reasons: Vec<String>,
}

impl VerificationService {
    pub fn new(
        challenges: Arc<dyn ChallengeRepo>,
        attempts: Arc<dyn ChallengeAttemptRepo>,
        verifications: Arc<dyn VerificationRepo>,
        places: Arc<dyn PlacesClient>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            challenges,
            attempts,
            verifications,
            places,
            progress,
        }
    }

    pub async fn list_challenges(
        &self,
        difficulty: Option<ChallengeDifficulty>,
        location_type: Option<LocationType>,
    ) -> Result<Vec<Challenge>, Error> {
        self.challenges.list_active(difficulty, location_type).await
    }

    pub async fn get_challenge(&self, challenge_id: Uuid) -> Result<Challenge, Error> {
        self.challenges
            .get(challenge_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Challenge {} not found", challenge_id)))
    }

    /// Run the full verification pipeline for one submission.
    pub async fn submit_attempt(
        &self,
        user_id: Uuid,
        submission: AttemptSubmission,
    ) -> Result<ChallengeAttempt, Error> {
        let started = Instant::now();

        let challenge = self.get_challenge(submission.challenge_id).await?;
        if !challenge.is_active {
            return Err(Error::Validation(format!(
                "Challenge '{}' is not active",
                challenge.title
            )));
        }
        if self
            .attempts
            .find_for_user_challenge(user_id, challenge.challenge_id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "challenge has already been attempted".into(),
            ));
        }
        if submission.photo_url.trim().is_empty() || submission.photo_digest.trim().is_empty() {
            return Err(Error::Validation(
                "photo_url and photo_digest are required".into(),
            ));
        }

        let mut attempt = ChallengeAttempt {
            attempt_id: Uuid::new_v4(),
            user_id,
            challenge_id: challenge.challenge_id,
            status: AttemptStatus::Pending,
            photo_url: submission.photo_url.clone(),
            photo_digest: submission.photo_digest.clone(),
            submitted_latitude: submission.latitude,
            submitted_longitude: submission.longitude,
            submission_notes: submission.notes.clone(),
            location_verified: false,
            verification_details: Value::Null,
            points_earned: 0,
            bonus_points: 0,
            created_at: Utc::now(),
            verified_at: None,
        };
        self.attempts.insert(&attempt).await?;

        let location = self.verify_location(&challenge, &submission).await;
        self.verifications
            .insert_location(&LocationVerification {
                verification_id: Uuid::new_v4(),
                attempt_id: attempt.attempt_id,
                is_valid_coordinate: location.is_valid_coordinate,
                distance_to_target_m: location.distance_m,
                location_type_match: location.type_match,
                nearby_places: serde_json::to_value(&location.nearby)?,
                verification_confidence: location.confidence,
                verification_passed: location.passed,
                created_at: Utc::now(),
            })
            .await?;

        let assessment = fraud::assess(&self.gather_fraud_signals(&attempt).await?);
        self.verifications
            .insert_fraud(&FraudCheck {
                check_id: Uuid::new_v4(),
                attempt_id: attempt.attempt_id,
                risk_level: assessment.risk_level,
                risk_score: assessment.risk_score,
                risk_factors: assessment.risk_factors.clone(),
                duplicate_photo_detected: assessment.duplicate_photo_detected,
                rapid_submissions: assessment.rapid_submissions,
                suspicious_location: assessment.suspicious_location,
                requires_manual_review: assessment.requires_manual_review,
                created_at: Utc::now(),
                reviewed_at: None,
                reviewer: None,
            })
            .await?;

        let mut reasons = location.reasons.clone();
        let mut failure = None;
        if assessment.requires_manual_review {
            attempt.status = AttemptStatus::Rejected;
            reasons.push(format!("flagged for review: {} risk", assessment.risk_level));
            failure = Some(if assessment.duplicate_photo_detected {
                FailureClass::Photo
            } else {
                FailureClass::Location
            });
        } else if location.passed {
            attempt.status = AttemptStatus::Verified;
            attempt.location_verified = true;
            attempt.points_earned = challenge.points_reward;
            attempt.verified_at = Some(Utc::now());
        } else {
            attempt.status = AttemptStatus::Failed;
            failure = Some(FailureClass::Location);
        }

        attempt.verification_details = json!({
            "location": {
                "is_valid_coordinate": location.is_valid_coordinate,
                "distance_to_target_m": location.distance_m,
                "location_type_match": location.type_match,
                "confidence": location.confidence,
                "passed": location.passed,
            },
            "fraud": {
                "risk_level": assessment.risk_level,
                "risk_score": assessment.risk_score,
                "factors": assessment.risk_factors,
            },
            "reasons": reasons,
        });

        if attempt.is_verified() {
            let outcome = self
                .progress
                .update_progress(ProgressUpdate {
                    user_id,
                    points: attempt.points_earned,
                    transaction_type: TransactionType::ChallengeCompletion,
                    description: format!("Completed challenge '{}'", challenge.title),
                    challenge_id: Some(challenge.challenge_id),
                    quiz_id: None,
                    increment_challenges: true,
                    increment_quizzes: false,
                })
                .await?;
            attempt.bonus_points = outcome.achievements.bonus_points;
        }

        self.attempts.finalize(&attempt).await?;
        self.verifications
            .record_attempt(
                challenge.challenge_id,
                attempt.is_verified(),
                failure,
                started.elapsed().as_secs_f64(),
            )
            .await?;

        info!(
            "Attempt {} on '{}' by {}: {}",
            attempt.attempt_id, challenge.title, user_id, attempt.status
        );
        Ok(attempt)
    }

    async fn verify_location(
        &self,
        challenge: &Challenge,
        submission: &AttemptSubmission,
    ) -> LocationOutcome {
        if !geo::validate_coordinates(submission.latitude, submission.longitude) {
            return LocationOutcome {
                is_valid_coordinate: false,
                distance_m: None,
                type_match: false,
                confidence: 0.0,
                passed: false,
                nearby: Vec::new(),
                reasons: vec!["coordinates out of range".to_string()],
            };
        }

        let distance = geo::haversine_distance_m(
            submission.latitude,
            submission.longitude,
            challenge.target_latitude,
            challenge.target_longitude,
        );
        let radius = f64::from(challenge.verification_radius_m);
        let within_radius = distance <= radius;
        let base_confidence = (1.0 - distance / radius).max(0.0);

        let mut reasons = Vec::new();
        if !within_radius {
            reasons.push(format!(
                "{}m from target, radius is {}m",
                distance.round(),
                challenge.verification_radius_m
            ));
        }

        let (nearby, type_match, confidence) = match self
            .places
            .nearby(
                submission.latitude,
                submission.longitude,
                challenge.verification_radius_m,
                challenge.location_type,
            )
            .await
        {
            Ok(places) => {
                let matched = places
                    .iter()
                    .any(|p| matches_location_type(challenge.location_type, &p.categories));
                let confidence = if matched {
                    base_confidence + TYPE_MATCH_BONUS
                } else {
                    reasons.push(format!(
                        "no nearby place matches '{}'",
                        challenge.location_type
                    ));
                    base_confidence * TYPE_MISMATCH_PENALTY
                };
                (places, matched, confidence)
            }
            Err(e) => {
                // Degrade to distance-only confidence rather than failing.
                warn!("Places lookup failed, using distance only: {}", e);
                (Vec::new(), false, base_confidence)
            }
        };

        let confidence = confidence.clamp(0.0, 1.0);
        let passed = within_radius && confidence >= MIN_CONFIDENCE;
        if within_radius && confidence < MIN_CONFIDENCE {
            reasons.push(format!("confidence {:.2} below threshold", confidence));
        }

        LocationOutcome {
            is_valid_coordinate: true,
            distance_m: Some(distance),
            type_match,
            confidence,
            passed,
            nearby,
            reasons,
        }
    }

    async fn gather_fraud_signals(
        &self,
        attempt: &ChallengeAttempt,
    ) -> Result<FraudSignals, Error> {
        let duplicate_photo = self
            .attempts
            .digest_seen(&attempt.photo_digest, attempt.attempt_id)
            .await?;
        let submissions_last_hour = self
            .attempts
            .count_since(attempt.user_id, attempt.created_at - Duration::hours(1))
            .await?;
        let same_location_attempts = self
            .attempts
            .count_same_location(
                attempt.user_id,
                attempt.submitted_latitude,
                attempt.submitted_longitude,
                attempt.attempt_id,
            )
            .await?;

        let travel_speed_kmh = match self
            .attempts
            .previous_before(attempt.user_id, attempt.created_at)
            .await?
        {
            Some(previous) => {
                let distance = geo::haversine_distance_m(
                    previous.submitted_latitude,
                    previous.submitted_longitude,
                    attempt.submitted_latitude,
                    attempt.submitted_longitude,
                );
                let elapsed = (attempt.created_at - previous.created_at).num_seconds() as f64;
                geo::travel_speed_kmh(distance, elapsed)
            }
            None => None,
        };

        Ok(FraudSignals {
            duplicate_photo,
            submissions_last_hour,
            same_location_attempts,
            travel_speed_kmh,
        })
    }

    pub async fn my_attempts(&self, user_id: Uuid) -> Result<Vec<ChallengeAttempt>, Error> {
        self.attempts.list_for_user(user_id).await
    }

    /// Per-challenge roll-up of the user's attempts.
    pub async fn my_progress(&self, user_id: Uuid) -> Result<ChallengeProgressReport, Error> {
        let attempts = self.attempts.list_for_user(user_id).await?;

        let mut progress: Vec<ChallengeProgress> = Vec::new();
        for attempt in attempts {
            if let Some(entry) = progress
                .iter_mut()
                .find(|p| p.challenge.challenge_id == attempt.challenge_id)
            {
                entry.attempts.push(attempt);
                continue;
            }
            let challenge = self.get_challenge(attempt.challenge_id).await?;
            progress.push(ChallengeProgress {
                challenge,
                attempts: vec![attempt],
                best_attempt: None,
                is_completed: false,
            });
        }

        let mut completed = 0;
        for entry in &mut progress {
            entry.is_completed = entry.attempts.iter().any(|a| a.is_verified());
            entry.best_attempt = entry
                .attempts
                .iter()
                .max_by_key(|a| (a.is_verified(), a.total_points()))
                .cloned();
            if entry.is_completed {
                completed += 1;
            }
        }

        let total_challenges = self.challenges.count_active().await?;
        Ok(ChallengeProgressReport {
            progress,
            total_challenges,
            completed_challenges: completed,
        })
    }

    pub async fn metrics(&self, challenge_id: Uuid) -> Result<VerificationMetrics, Error> {
        self.verifications
            .metrics_for(challenge_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("No metrics for challenge {}", challenge_id))
            })
    }

    pub async fn metrics_all(&self) -> Result<Vec<VerificationMetrics>, Error> {
        self.verifications.metrics_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::MockPlacesClient;
    use crate::repositories::postgres::badge::MockBadgeRepo;
    use crate::repositories::postgres::challenge::MockChallengeRepo;
    use crate::repositories::postgres::challenge_attempt::MockChallengeAttemptRepo;
    use crate::repositories::postgres::level::MockLevelRepo;
    use crate::repositories::postgres::points::MockPointsRepo;
    use crate::repositories::postgres::profile::MockProfileRepo;
    use crate::repositories::postgres::verification::MockVerificationRepo;
    use naturequest_common::models::UserProfile;

    fn lake_challenge() -> Challenge {
        let now = Utc::now();
        Challenge {
            challenge_id: Uuid::new_v4(),
            title: "Visit Crystal Lake".to_string(),
            description: String::new(),
            difficulty: ChallengeDifficulty::Beginner,
            location_type: LocationType::Lake,
            location_name: "Crystal Lake".to_string(),
            target_latitude: 44.98,
            target_longitude: -93.26,
            verification_radius_m: 500,
            required_elements: vec![],
            special_instructions: String::new(),
            points_reward: 100,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn submission_at(challenge: &Challenge, latitude: f64, longitude: f64) -> AttemptSubmission {
        AttemptSubmission {
            challenge_id: challenge.challenge_id,
            photo_url: "https://cdn.example.com/p.jpg".to_string(),
            photo_digest: "abc123".to_string(),
            latitude,
            longitude,
            notes: String::new(),
        }
    }

    fn quiet_progress() -> Arc<ProgressService> {
        let mut profiles = MockProfileRepo::new();
        profiles
            .expect_get_or_create()
            .returning(|user_id| Ok(UserProfile::new(user_id)));
        profiles.expect_update().returning(|_| Ok(()));
        let mut points = MockPointsRepo::new();
        points.expect_insert().returning(|_| Ok(()));
        let mut badges = MockBadgeRepo::new();
        badges
            .expect_unearned_at_or_below()
            .returning(|_, _| Ok(vec![]));
        let mut levels = MockLevelRepo::new();
        levels.expect_highest_for_points().returning(|_| Ok(None));
        Arc::new(ProgressService::new(
            Arc::new(profiles),
            Arc::new(points),
            Arc::new(badges),
            Arc::new(levels),
        ))
    }

    fn clean_attempt_mocks() -> MockChallengeAttemptRepo {
        let mut attempts = MockChallengeAttemptRepo::new();
        attempts
            .expect_find_for_user_challenge()
            .returning(|_, _| Ok(None));
        attempts.expect_insert().returning(|_| Ok(()));
        attempts.expect_digest_seen().returning(|_, _| Ok(false));
        attempts.expect_count_since().returning(|_, _| Ok(1));
        attempts
            .expect_count_same_location()
            .returning(|_, _, _, _| Ok(0));
        attempts.expect_previous_before().returning(|_, _| Ok(None));
        attempts.expect_finalize().returning(|_| Ok(()));
        attempts
    }

    fn quiet_verifications() -> MockVerificationRepo {
        let mut verifications = MockVerificationRepo::new();
        verifications.expect_insert_location().returning(|_| Ok(()));
        verifications.expect_insert_fraud().returning(|_| Ok(()));
        verifications
            .expect_record_attempt()
            .returning(|_, _, _, _| Ok(()));
        verifications
    }

    fn challenge_repo(challenge: Challenge) -> MockChallengeRepo {
        let mut challenges = MockChallengeRepo::new();
        challenges
            .expect_get()
            .returning(move |_| Ok(Some(challenge.clone())));
        challenges
    }

    fn lake_places() -> MockPlacesClient {
        let mut places = MockPlacesClient::new();
        places.expect_nearby().returning(|_, _, _, _| {
            Ok(vec![NearbyPlace {
                name: "Crystal Lake".to_string(),
                categories: vec!["Lake".to_string()],
                distance_m: 50.0,
            }])
        });
        places
    }

    fn service(
        challenges: MockChallengeRepo,
        attempts: MockChallengeAttemptRepo,
        verifications: MockVerificationRepo,
        places: MockPlacesClient,
    ) -> VerificationService {
        VerificationService::new(
            Arc::new(challenges),
            Arc::new(attempts),
            Arc::new(verifications),
            Arc::new(places),
            quiet_progress(),
        )
    }

    #[tokio::test]
    async fn attempt_near_target_is_verified() {
        let challenge = lake_challenge();
        let submission = submission_at(&challenge, 44.9801, -93.2601);
        let reward = challenge.points_reward;

        let svc = service(
            challenge_repo(challenge),
            clean_attempt_mocks(),
            quiet_verifications(),
            lake_places(),
        );
        let attempt = svc.submit_attempt(Uuid::new_v4(), submission).await.unwrap();
        assert_eq!(attempt.status, AttemptStatus::Verified);
        assert!(attempt.location_verified);
        assert_eq!(attempt.points_earned, reward);
        assert!(attempt.verified_at.is_some());
    }

    #[tokio::test]
    async fn attempt_outside_radius_fails() {
        let challenge = lake_challenge();
        // ~13.5 km from the target.
        let submission = submission_at(&challenge, 44.9537, -93.0900);

        let svc = service(
            challenge_repo(challenge),
            clean_attempt_mocks(),
            quiet_verifications(),
            lake_places(),
        );
        let attempt = svc.submit_attempt(Uuid::new_v4(), submission).await.unwrap();
        assert_eq!(attempt.status, AttemptStatus::Failed);
        assert_eq!(attempt.points_earned, 0);
        let reasons = attempt.verification_details["reasons"].as_array().unwrap();
        assert!(!reasons.is_empty());
    }

    #[tokio::test]
    async fn invalid_coordinates_fail_without_places_lookup() {
        let challenge = lake_challenge();
        let submission = submission_at(&challenge, 95.0, -93.26);

        // No expectation on nearby: the lookup must not happen.
        let svc = service(
            challenge_repo(challenge),
            clean_attempt_mocks(),
            quiet_verifications(),
            MockPlacesClient::new(),
        );
        let attempt = svc.submit_attempt(Uuid::new_v4(), submission).await.unwrap();
        assert_eq!(attempt.status, AttemptStatus::Failed);
        assert_eq!(
            attempt.verification_details["location"]["is_valid_coordinate"],
            Value::Bool(false)
        );
    }

    #[tokio::test]
    async fn places_outage_degrades_to_distance_only() {
        let challenge = lake_challenge();
        // Close enough that distance-only confidence clears the bar.
        let submission = submission_at(&challenge, 44.9801, -93.2601);

        let mut places = MockPlacesClient::new();
        places
            .expect_nearby()
            .returning(|_, _, _, _| Err(Error::Validation("api down".into())));

        let svc = service(
            challenge_repo(challenge),
            clean_attempt_mocks(),
            quiet_verifications(),
            places,
        );
        let attempt = svc.submit_attempt(Uuid::new_v4(), submission).await.unwrap();
        assert_eq!(attempt.status, AttemptStatus::Verified);
    }

    #[tokio::test]
    async fn duplicate_photo_and_rapid_fire_get_rejected() {
        let challenge = lake_challenge();
        let submission = submission_at(&challenge, 44.9801, -93.2601);

        let mut attempts = MockChallengeAttemptRepo::new();
        attempts
            .expect_find_for_user_challenge()
            .returning(|_, _| Ok(None));
        attempts.expect_insert().returning(|_| Ok(()));
        attempts.expect_digest_seen().returning(|_, _| Ok(true));
        attempts.expect_count_since().returning(|_, _| Ok(9));
        attempts
            .expect_count_same_location()
            .returning(|_, _, _, _| Ok(0));
        attempts.expect_previous_before().returning(|_, _| Ok(None));
        attempts
            .expect_finalize()
            .withf(|attempt| attempt.status == AttemptStatus::Rejected)
            .returning(|_| Ok(()));

        let svc = service(
            challenge_repo(challenge),
            attempts,
            quiet_verifications(),
            lake_places(),
        );
        let attempt = svc.submit_attempt(Uuid::new_v4(), submission).await.unwrap();
        assert_eq!(attempt.status, AttemptStatus::Rejected);
        assert_eq!(attempt.points_earned, 0);
    }

    #[tokio::test]
    async fn inactive_challenge_is_rejected_up_front() {
        let mut challenge = lake_challenge();
        challenge.is_active = false;
        let submission = submission_at(&challenge, 44.98, -93.26);

        let svc = service(
            challenge_repo(challenge),
            MockChallengeAttemptRepo::new(),
            MockVerificationRepo::new(),
            MockPlacesClient::new(),
        );
        let err = svc.submit_attempt(Uuid::new_v4(), submission).await;
        assert!(matches!(err, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn second_attempt_on_same_challenge_conflicts() {
        let challenge = lake_challenge();
        let submission = submission_at(&challenge, 44.98, -93.26);
        let user_id = Uuid::new_v4();
        let existing = ChallengeAttempt {
            attempt_id: Uuid::new_v4(),
            user_id,
            challenge_id: challenge.challenge_id,
            status: AttemptStatus::Verified,
            photo_url: String::new(),
            photo_digest: String::new(),
            submitted_latitude: 0.0,
            submitted_longitude: 0.0,
            submission_notes: String::new(),
            location_verified: true,
            verification_details: Value::Null,
            points_earned: 100,
            bonus_points: 0,
            created_at: Utc::now(),
            verified_at: Some(Utc::now()),
        };

        let mut attempts = MockChallengeAttemptRepo::new();
        attempts
            .expect_find_for_user_challenge()
            .returning(move |_, _| Ok(Some(existing.clone())));

        let svc = service(
            challenge_repo(challenge),
            attempts,
            MockVerificationRepo::new(),
            MockPlacesClient::new(),
        );
        let err = svc.submit_attempt(user_id, submission).await;
        assert!(matches!(err, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn my_progress_rolls_up_by_challenge() {
        let challenge = lake_challenge();
        let challenge_id = challenge.challenge_id;
        let user_id = Uuid::new_v4();
        let verified = ChallengeAttempt {
            attempt_id: Uuid::new_v4(),
            user_id,
            challenge_id,
            status: AttemptStatus::Verified,
            photo_url: String::new(),
            photo_digest: String::new(),
            submitted_latitude: 44.98,
            submitted_longitude: -93.26,
            submission_notes: String::new(),
            location_verified: true,
            verification_details: Value::Null,
            points_earned: 100,
            bonus_points: 50,
            created_at: Utc::now(),
            verified_at: Some(Utc::now()),
        };

        let mut attempts = MockChallengeAttemptRepo::new();
        {
            let list = vec![verified.clone()];
            attempts
                .expect_list_for_user()
                .returning(move |_| Ok(list.clone()));
        }
        let mut challenges = challenge_repo(challenge);
        challenges.expect_count_active().returning(|| Ok(10));

        let svc = service(
            challenges,
            attempts,
            MockVerificationRepo::new(),
            MockPlacesClient::new(),
        );
        let report = svc.my_progress(user_id).await.unwrap();
        assert_eq!(report.total_challenges, 10);
        assert_eq!(report.completed_challenges, 1);
        assert_eq!(report.progress.len(), 1);
        assert!(report.progress[0].is_completed);
        assert_eq!(
            report.progress[0].best_attempt.as_ref().unwrap().total_points(),
            150
        );
    }
}
