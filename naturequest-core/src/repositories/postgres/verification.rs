// src/repositories/postgres/verification.rs
//
// Persists the per-attempt verification records (location check, fraud
// check) and the per-challenge rolling metrics.

use naturequest_common::models::{FraudCheck, LocationVerification, VerificationMetrics};
use crate::Error;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Which stage sank a failed verification; drives the failure counters.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FailureClass {
    Photo,
    Location,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VerificationRepo: Send + Sync {
    async fn insert_location(&self, verification: &LocationVerification) -> Result<(), Error>;
    async fn insert_fraud(&self, check: &FraudCheck) -> Result<(), Error>;
    /// Fold one attempt into the challenge's metrics row.
    async fn record_attempt(
        &self,
        challenge_id: Uuid,
        passed: bool,
        failure: Option<FailureClass>,
        elapsed_secs: f64,
    ) -> Result<(), Error>;
    async fn metrics_for(&self, challenge_id: Uuid) -> Result<Option<VerificationMetrics>, Error>;
    async fn metrics_all(&self) -> Result<Vec<VerificationMetrics>, Error>;
}

pub struct PostgresVerificationRepository {
    pool: Pool<Postgres>,
}

impl PostgresVerificationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl VerificationRepo for PostgresVerificationRepository {
    async fn insert_location(&self, verification: &LocationVerification) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO location_verifications (
                verification_id, attempt_id, is_valid_coordinate, distance_to_target_m,
                location_type_match, nearby_places, verification_confidence,
                verification_passed, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(verification.verification_id)
        .bind(verification.attempt_id)
        .bind(verification.is_valid_coordinate)
        .bind(verification.distance_to_target_m)
        .bind(verification.location_type_match)
        .bind(&verification.nearby_places)
        .bind(verification.verification_confidence)
        .bind(verification.verification_passed)
        .bind(verification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_fraud(&self, check: &FraudCheck) -> Result<(), Error> {
        let factors =
            Value::Array(check.risk_factors.iter().map(|f| Value::from(f.as_str())).collect());
        sqlx::query(
            r#"
            INSERT INTO fraud_checks (
                check_id, attempt_id, risk_level, risk_score, risk_factors,
                duplicate_photo_detected, rapid_submissions, suspicious_location,
                requires_manual_review, created_at, reviewed_at, reviewer
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(check.check_id)
        .bind(check.attempt_id)
        .bind(check.risk_level)
        .bind(check.risk_score)
        .bind(factors)
        .bind(check.duplicate_photo_detected)
        .bind(check.rapid_submissions)
        .bind(check.suspicious_location)
        .bind(check.requires_manual_review)
        .bind(check.created_at)
        .bind(check.reviewed_at)
        .bind(check.reviewer)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_attempt(
        &self,
        challenge_id: Uuid,
        passed: bool,
        failure: Option<FailureClass>,
        elapsed_secs: f64,
    ) -> Result<(), Error> {
        let photo_failure = matches!(failure, Some(FailureClass::Photo));
        let location_failure = matches!(failure, Some(FailureClass::Location));
        sqlx::query(
            r#"
            INSERT INTO verification_metrics (
                challenge_id, total_attempts, successful_verifications, failed_verifications,
                average_verification_time, photo_failures, location_failures, last_updated
            )
            VALUES ($1, 1,
                    CASE WHEN $2 THEN 1 ELSE 0 END,
                    CASE WHEN $2 THEN 0 ELSE 1 END,
                    $3,
                    CASE WHEN $4 THEN 1 ELSE 0 END,
                    CASE WHEN $5 THEN 1 ELSE 0 END,
                    $6)
            ON CONFLICT (challenge_id)
            DO UPDATE SET
                total_attempts = verification_metrics.total_attempts + 1,
                successful_verifications = verification_metrics.successful_verifications
                    + CASE WHEN $2 THEN 1 ELSE 0 END,
                failed_verifications = verification_metrics.failed_verifications
                    + CASE WHEN $2 THEN 0 ELSE 1 END,
                average_verification_time =
                    (verification_metrics.average_verification_time * verification_metrics.total_attempts + $3)
                    / (verification_metrics.total_attempts + 1),
                photo_failures = verification_metrics.photo_failures
                    + CASE WHEN $4 THEN 1 ELSE 0 END,
                location_failures = verification_metrics.location_failures
                    + CASE WHEN $5 THEN 1 ELSE 0 END,
                last_updated = $6
            "#,
        )
        .bind(challenge_id)
        .bind(passed)
        .bind(elapsed_secs)
        .bind(photo_failure)
        .bind(location_failure)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn metrics_for(&self, challenge_id: Uuid) -> Result<Option<VerificationMetrics>, Error> {
        let row = sqlx::query_as::<_, VerificationMetrics>(
            r#"
            SELECT challenge_id, total_attempts, successful_verifications, failed_verifications,
                   average_verification_time, photo_failures, location_failures, last_updated
            FROM verification_metrics
            WHERE challenge_id = $1
            "#,
        )
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn metrics_all(&self) -> Result<Vec<VerificationMetrics>, Error> {
        let rows = sqlx::query_as::<_, VerificationMetrics>(
            r#"
            SELECT challenge_id, total_attempts, successful_verifications, failed_verifications,
                   average_verification_time, photo_failures, location_failures, last_updated
            FROM verification_metrics
            ORDER BY total_attempts DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
