// src/repositories/postgres/badge.rs

use naturequest_common::models::{Badge, UserBadge};
use crate::Error;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BadgeRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Badge>, Error>;
    async fn earned_for_user(&self, user_id: Uuid) -> Result<Vec<(UserBadge, Badge)>, Error>;
    /// Badges the user has not earned whose threshold is at or below
    /// `points`, cheapest first.
    async fn unearned_at_or_below(&self, user_id: Uuid, points: i32) -> Result<Vec<Badge>, Error>;
    /// Next regular badge above `points` the user has not earned.
    async fn next_unearned_above(&self, user_id: Uuid, points: i32)
        -> Result<Option<Badge>, Error>;
    async fn grant(&self, user_badge: &UserBadge) -> Result<(), Error>;
    async fn regular_badge_count(&self, user_id: Uuid) -> Result<i64, Error>;
}

pub struct PostgresBadgeRepository {
    pool: Pool<Postgres>,
}

impl PostgresBadgeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BadgeRepo for PostgresBadgeRepository {
    async fn list_all(&self) -> Result<Vec<Badge>, Error> {
        let rows = sqlx::query_as::<_, Badge>(
            r#"
            SELECT badge_id, animal, name, description, points_required, is_special, icon_url
            FROM badges
            ORDER BY points_required ASC, badge_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn earned_for_user(&self, user_id: Uuid) -> Result<Vec<(UserBadge, Badge)>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT ub.user_badge_id, ub.user_id, ub.badge_id, ub.earned_at, ub.points_when_earned,
                   b.animal, b.name, b.description, b.points_required, b.is_special, b.icon_url
            FROM user_badges ub
            JOIN badges b ON b.badge_id = ub.badge_id
            WHERE ub.user_id = $1
            ORDER BY ub.earned_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let user_badge = UserBadge {
                user_badge_id: r.try_get("user_badge_id")?,
                user_id: r.try_get("user_id")?,
                badge_id: r.try_get("badge_id")?,
                earned_at: r.try_get("earned_at")?,
                points_when_earned: r.try_get("points_when_earned")?,
            };
            let badge = Badge {
                badge_id: r.try_get("badge_id")?,
                animal: r.try_get("animal")?,
                name: r.try_get("name")?,
                description: r.try_get("description")?,
                points_required: r.try_get("points_required")?,
                is_special: r.try_get("is_special")?,
                icon_url: r.try_get("icon_url")?,
            };
            out.push((user_badge, badge));
        }
        Ok(out)
    }

    async fn unearned_at_or_below(&self, user_id: Uuid, points: i32) -> Result<Vec<Badge>, Error> {
        let rows = sqlx::query_as::<_, Badge>(
            r#"
            SELECT badge_id, animal, name, description, points_required, is_special, icon_url
            FROM badges
            WHERE points_required <= $1
              AND badge_id NOT IN (SELECT badge_id FROM user_badges WHERE user_id = $2)
            ORDER BY points_required ASC, badge_id ASC
            "#,
        )
        .bind(points)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn next_unearned_above(
        &self,
        user_id: Uuid,
        points: i32,
    ) -> Result<Option<Badge>, Error> {
        let row = sqlx::query_as::<_, Badge>(
            r#"
            SELECT badge_id, animal, name, description, points_required, is_special, icon_url
            FROM badges
            WHERE points_required > $1
              AND is_special = FALSE
              AND badge_id NOT IN (SELECT badge_id FROM user_badges WHERE user_id = $2)
            ORDER BY points_required ASC
            LIMIT 1
            "#,
        )
        .bind(points)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn grant(&self, user_badge: &UserBadge) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO user_badges (user_badge_id, user_id, badge_id, earned_at, points_when_earned)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_badge.user_badge_id)
        .bind(user_badge.user_id)
        .bind(user_badge.badge_id)
        .bind(user_badge.earned_at)
        .bind(user_badge.points_when_earned)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn regular_badge_count(&self, user_id: Uuid) -> Result<i64, Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt
            FROM user_badges ub
            JOIN badges b ON b.badge_id = ub.badge_id
            WHERE ub.user_id = $1 AND b.is_special = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("cnt")?)
    }
}
