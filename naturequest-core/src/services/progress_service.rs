// src/services/progress_service.rs
//
// Points, badges and levels. Every point movement goes through
// `update_progress`, which appends a ledger row and then runs the
// achievement checks.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use naturequest_common::models::{
    AchievementSummary, Badge, EarnedBadge, Level, LeaderboardEntry, LevelUp, PointsTransaction,
    ProgressOutcome, ProgressUpdate, TransactionType, UserBadge, UserProfile, UserStats,
};
use crate::repositories::postgres::{BadgeRepo, LevelRepo, PointsRepo, ProfileRepo};
use crate::Error;

const BADGE_BONUS: i32 = 50;
const LEVEL_BONUS_PER_LEVEL: i32 = 100;

// The special badge unlocks on achievement, not points.
const SPECIAL_MIN_REGULAR_BADGES: i64 = 12;
const SPECIAL_MIN_LEVEL: i32 = 10;
const SPECIAL_MIN_CHALLENGES: i32 = 20;

const LEADERBOARD_DEFAULT: i64 = 10;
const LEADERBOARD_MAX: i64 = 50;
const HISTORY_PAGE_SIZE: i64 = 20;
const RECENT_TRANSACTIONS: i64 = 10;

pub struct ProgressService {
    profiles: Arc<dyn ProfileRepo>,
    points: Arc<dyn PointsRepo>,
    badges: Arc<dyn BadgeRepo>,
    levels: Arc<dyn LevelRepo>,
}

impl ProgressService {
    pub fn new(
        profiles: Arc<dyn ProfileRepo>,
        points: Arc<dyn PointsRepo>,
        badges: Arc<dyn BadgeRepo>,
        levels: Arc<dyn LevelRepo>,
    ) -> Self {
        Self {
            profiles,
            points,
            badges,
            levels,
        }
    }

    pub async fn my_profile(&self, user_id: Uuid) -> Result<UserProfile, Error> {
        self.profiles.get_or_create(user_id).await
    }

    pub async fn update_interests(
        &self,
        user_id: Uuid,
        is_techie: Option<bool>,
        tech_stacks: Option<String>,
    ) -> Result<UserProfile, Error> {
        let mut profile = self.profiles.get_or_create(user_id).await?;
        if let Some(techie) = is_techie {
            profile.is_techie = techie;
        }
        if let Some(stacks) = tech_stacks {
            profile.tech_stacks = stacks;
        }
        self.profiles.update(&profile).await?;
        Ok(profile)
    }

    /// Apply a points delta, append the ledger row, and run the
    /// achievement checks. Bonus points land in the same call.
    pub async fn update_progress(&self, update: ProgressUpdate) -> Result<ProgressOutcome, Error> {
        if update.points < 0 {
            return Err(Error::Validation("points must be non-negative".into()));
        }

        let mut profile = self.profiles.get_or_create(update.user_id).await?;
        profile.total_points += update.points;
        if update.increment_challenges {
            profile.challenges_completed += 1;
        }
        if update.increment_quizzes {
            profile.quizzes_completed += 1;
        }

        let mut tx = PointsTransaction::new(
            update.user_id,
            update.transaction_type,
            update.points,
            &update.description,
        );
        tx.challenge_id = update.challenge_id;
        tx.quiz_id = update.quiz_id;
        self.points.insert(&tx).await?;

        let achievements = self.check_achievements(&mut profile).await?;
        self.profiles.update(&profile).await?;

        info!(
            "Progress for {}: +{} points ({} bonus), total {}",
            update.user_id, update.points, achievements.bonus_points, profile.total_points
        );

        Ok(ProgressOutcome {
            new_total_points: profile.total_points,
            achievements,
        })
    }

    /// Badge pass, then level resolution, then the special badge which is
    /// gated on badges, level and challenge count rather than points.
    async fn check_achievements(
        &self,
        profile: &mut UserProfile,
    ) -> Result<AchievementSummary, Error> {
        let mut summary = AchievementSummary::default();

        let candidates = self
            .badges
            .unearned_at_or_below(profile.user_id, profile.total_points)
            .await?;
        let special: Vec<Badge> = candidates.iter().filter(|b| b.is_special).cloned().collect();
        for badge in candidates.iter().filter(|b| !b.is_special) {
            self.grant_badge(profile, badge, &mut summary).await?;
        }

        let resolved = self.levels.highest_for_points(profile.total_points).await?;
        if let Some(level) = resolved {
            if level.level_number > profile.current_level.unwrap_or(0) {
                self.level_up(profile, &level, &mut summary).await?;
            }
        }

        if !special.is_empty() && self.special_badge_eligible(profile).await? {
            for badge in &special {
                self.grant_badge(profile, badge, &mut summary).await?;
            }
        }

        Ok(summary)
    }

    async fn special_badge_eligible(&self, profile: &UserProfile) -> Result<bool, Error> {
        if profile.current_level.unwrap_or(0) < SPECIAL_MIN_LEVEL
            || profile.challenges_completed < SPECIAL_MIN_CHALLENGES
        {
            return Ok(false);
        }
        let regular = self.badges.regular_badge_count(profile.user_id).await?;
        Ok(regular >= SPECIAL_MIN_REGULAR_BADGES)
    }

    async fn grant_badge(
        &self,
        profile: &mut UserProfile,
        badge: &Badge,
        summary: &mut AchievementSummary,
    ) -> Result<(), Error> {
        let user_badge = UserBadge {
            user_badge_id: Uuid::new_v4(),
            user_id: profile.user_id,
            badge_id: badge.badge_id,
            earned_at: Utc::now(),
            points_when_earned: profile.total_points,
        };
        self.badges.grant(&user_badge).await?;

        let bonus = PointsTransaction::new(
            profile.user_id,
            TransactionType::BadgeEarned,
            BADGE_BONUS,
            &format!("Earned the {} badge", badge.name),
        );
        self.points.insert(&bonus).await?;

        profile.total_points += BADGE_BONUS;
        summary.bonus_points += BADGE_BONUS;
        summary.new_badges.push(EarnedBadge {
            animal: badge.animal.clone(),
            name: badge.name.clone(),
            description: badge.description.clone(),
        });
        info!("User {} earned badge '{}'", profile.user_id, badge.name);
        Ok(())
    }

    async fn level_up(
        &self,
        profile: &mut UserProfile,
        level: &Level,
        summary: &mut AchievementSummary,
    ) -> Result<(), Error> {
        let bonus = level.level_number * LEVEL_BONUS_PER_LEVEL;
        let tx = PointsTransaction::new(
            profile.user_id,
            TransactionType::LevelUp,
            bonus,
            &format!("Reached level {} ({})", level.level_number, level.name),
        );
        self.points.insert(&tx).await?;

        profile.current_level = Some(level.level_number);
        profile.total_points += bonus;
        summary.bonus_points += bonus;
        summary.new_level = Some(LevelUp {
            level_number: level.level_number,
            name: level.name.clone(),
            description: level.description.clone(),
            bonus_points: bonus,
        });
        info!(
            "User {} reached level {} ({})",
            profile.user_id, level.level_number, level.name
        );
        Ok(())
    }

    pub async fn user_stats(&self, user_id: Uuid) -> Result<UserStats, Error> {
        let profile = self.profiles.get_or_create(user_id).await?;
        let badges = self.badges.earned_for_user(user_id).await?;
        let recent_transactions = self
            .points
            .history(user_id, RECENT_TRANSACTIONS, 0)
            .await?;
        let next_badge = self
            .badges
            .next_unearned_above(user_id, profile.total_points)
            .await?;
        let next_level = self
            .levels
            .next_above(profile.current_level.unwrap_or(0))
            .await?;
        Ok(UserStats {
            profile,
            badges,
            recent_transactions,
            next_badge,
            next_level,
        })
    }

    pub async fn leaderboard(&self, limit: Option<i64>) -> Result<Vec<LeaderboardEntry>, Error> {
        let limit = limit.unwrap_or(LEADERBOARD_DEFAULT).clamp(1, LEADERBOARD_MAX);
        self.profiles.leaderboard(limit).await
    }

    /// One-based page of the ledger, 20 rows per page.
    pub async fn points_history(
        &self,
        user_id: Uuid,
        page: i64,
    ) -> Result<Vec<PointsTransaction>, Error> {
        let page = page.max(1);
        self.points
            .history(user_id, HISTORY_PAGE_SIZE, (page - 1) * HISTORY_PAGE_SIZE)
            .await
    }

    pub async fn badge_catalog(&self) -> Result<Vec<Badge>, Error> {
        self.badges.list_all().await
    }

    pub async fn my_badges(&self, user_id: Uuid) -> Result<Vec<(UserBadge, Badge)>, Error> {
        self.badges.earned_for_user(user_id).await
    }

    pub async fn level_catalog(&self) -> Result<Vec<Level>, Error> {
        self.levels.list_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::postgres::badge::MockBadgeRepo;
    use crate::repositories::postgres::level::MockLevelRepo;
    use crate::repositories::postgres::points::MockPointsRepo;
    use crate::repositories::postgres::profile::MockProfileRepo;

    fn profile_with(points: i32, level: Option<i32>, challenges: i32) -> UserProfile {
        let mut p = UserProfile::new(Uuid::new_v4());
        p.total_points = points;
        p.current_level = level;
        p.challenges_completed = challenges;
        p
    }

    fn badge(id: i32, name: &str, required: i32, special: bool) -> Badge {
        Badge {
            badge_id: id,
            animal: name.to_lowercase(),
            name: name.to_string(),
            description: String::new(),
            points_required: required,
            is_special: special,
            icon_url: None,
        }
    }

    fn level(number: i32, name: &str, required: i32) -> Level {
        Level {
            level_number: number,
            name: name.to_string(),
            points_required: required,
            description: String::new(),
        }
    }

    fn service(
        profiles: MockProfileRepo,
        points: MockPointsRepo,
        badges: MockBadgeRepo,
        levels: MockLevelRepo,
    ) -> ProgressService {
        ProgressService::new(
            Arc::new(profiles),
            Arc::new(points),
            Arc::new(badges),
            Arc::new(levels),
        )
    }

    fn update_for(profile: &UserProfile, points: i32) -> ProgressUpdate {
        ProgressUpdate {
            user_id: profile.user_id,
            points,
            transaction_type: TransactionType::ChallengeCompletion,
            description: "test".to_string(),
            challenge_id: None,
            quiz_id: None,
            increment_challenges: false,
            increment_quizzes: false,
        }
    }

    #[tokio::test]
    async fn rejects_negative_delta() {
        let svc = service(
            MockProfileRepo::new(),
            MockPointsRepo::new(),
            MockBadgeRepo::new(),
            MockLevelRepo::new(),
        );
        let profile = profile_with(0, None, 0);
        let mut update = update_for(&profile, 10);
        update.points = -5;
        assert!(matches!(
            svc.update_progress(update).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn plain_update_adds_points_without_achievements() {
        let profile = profile_with(100, Some(1), 0);
        let update = update_for(&profile, 25);

        let mut profiles = MockProfileRepo::new();
        let snapshot = profile.clone();
        profiles
            .expect_get_or_create()
            .returning(move |_| Ok(snapshot.clone()));
        profiles.expect_update().returning(|_| Ok(()));

        let mut points = MockPointsRepo::new();
        points.expect_insert().times(1).returning(|_| Ok(()));

        let mut badges = MockBadgeRepo::new();
        badges
            .expect_unearned_at_or_below()
            .returning(|_, _| Ok(vec![]));

        let mut levels = MockLevelRepo::new();
        levels
            .expect_highest_for_points()
            .returning(|_| Ok(Some(level(1, "Quartz", 0))));

        let outcome = service(profiles, points, badges, levels)
            .update_progress(update)
            .await
            .unwrap();
        assert_eq!(outcome.new_total_points, 125);
        assert!(outcome.achievements.new_badges.is_empty());
        assert!(outcome.achievements.new_level.is_none());
        assert_eq!(outcome.achievements.bonus_points, 0);
    }

    #[tokio::test]
    async fn crossing_badge_threshold_awards_badge_and_bonus() {
        let profile = profile_with(240, Some(1), 0);
        let update = update_for(&profile, 20);

        let mut profiles = MockProfileRepo::new();
        let snapshot = profile.clone();
        profiles
            .expect_get_or_create()
            .returning(move |_| Ok(snapshot.clone()));
        profiles.expect_update().returning(|_| Ok(()));

        let mut points = MockPointsRepo::new();
        // base transaction + badge bonus
        points.expect_insert().times(2).returning(|_| Ok(()));

        let mut badges = MockBadgeRepo::new();
        badges
            .expect_unearned_at_or_below()
            .returning(|_, _| Ok(vec![badge(1, "Rat", 250, false)]));
        badges.expect_grant().times(1).returning(|_| Ok(()));

        let mut levels = MockLevelRepo::new();
        levels
            .expect_highest_for_points()
            .returning(|_| Ok(Some(level(1, "Quartz", 0))));

        let outcome = service(profiles, points, badges, levels)
            .update_progress(update)
            .await
            .unwrap();
        // 240 + 20 + 50 badge bonus
        assert_eq!(outcome.new_total_points, 310);
        assert_eq!(outcome.achievements.new_badges.len(), 1);
        assert_eq!(outcome.achievements.new_badges[0].name, "Rat");
        assert_eq!(outcome.achievements.bonus_points, 50);
    }

    #[tokio::test]
    async fn level_up_awards_scaled_bonus() {
        let profile = profile_with(230, Some(1), 0);
        let update = update_for(&profile, 30);

        let mut profiles = MockProfileRepo::new();
        let snapshot = profile.clone();
        profiles
            .expect_get_or_create()
            .returning(move |_| Ok(snapshot.clone()));
        profiles.expect_update().returning(|_| Ok(()));

        let mut points = MockPointsRepo::new();
        points.expect_insert().times(2).returning(|_| Ok(()));

        let mut badges = MockBadgeRepo::new();
        badges
            .expect_unearned_at_or_below()
            .returning(|_, _| Ok(vec![]));

        let mut levels = MockLevelRepo::new();
        levels
            .expect_highest_for_points()
            .returning(|_| Ok(Some(level(2, "Amethyst", 250))));

        let outcome = service(profiles, points, badges, levels)
            .update_progress(update)
            .await
            .unwrap();
        // 230 + 30 + 200 level bonus
        assert_eq!(outcome.new_total_points, 460);
        let up = outcome.achievements.new_level.unwrap();
        assert_eq!(up.level_number, 2);
        assert_eq!(up.bonus_points, 200);
    }

    #[tokio::test]
    async fn special_badge_withheld_until_eligible() {
        // Plenty of points but too few challenges completed.
        let profile = profile_with(20_000, Some(12), 5);
        let update = update_for(&profile, 10);

        let mut profiles = MockProfileRepo::new();
        let snapshot = profile.clone();
        profiles
            .expect_get_or_create()
            .returning(move |_| Ok(snapshot.clone()));
        profiles.expect_update().returning(|_| Ok(()));

        let mut points = MockPointsRepo::new();
        points.expect_insert().times(1).returning(|_| Ok(()));

        let mut badges = MockBadgeRepo::new();
        badges
            .expect_unearned_at_or_below()
            .returning(|_, _| Ok(vec![badge(13, "Cat", 3000, true)]));

        let mut levels = MockLevelRepo::new();
        levels
            .expect_highest_for_points()
            .returning(|_| Ok(Some(level(12, "Tanzanite", 16_500))));

        let outcome = service(profiles, points, badges, levels)
            .update_progress(update)
            .await
            .unwrap();
        assert!(outcome.achievements.new_badges.is_empty());
    }

    #[tokio::test]
    async fn special_badge_granted_when_all_gates_pass() {
        let profile = profile_with(20_000, Some(12), 25);
        let update = update_for(&profile, 10);

        let mut profiles = MockProfileRepo::new();
        let snapshot = profile.clone();
        profiles
            .expect_get_or_create()
            .returning(move |_| Ok(snapshot.clone()));
        profiles.expect_update().returning(|_| Ok(()));

        let mut points = MockPointsRepo::new();
        points.expect_insert().times(2).returning(|_| Ok(()));

        let mut badges = MockBadgeRepo::new();
        badges
            .expect_unearned_at_or_below()
            .returning(|_, _| Ok(vec![badge(13, "Cat", 3000, true)]));
        badges.expect_regular_badge_count().returning(|_| Ok(12));
        badges.expect_grant().times(1).returning(|_| Ok(()));

        let mut levels = MockLevelRepo::new();
        levels
            .expect_highest_for_points()
            .returning(|_| Ok(Some(level(12, "Tanzanite", 16_500))));

        let outcome = service(profiles, points, badges, levels)
            .update_progress(update)
            .await
            .unwrap();
        assert_eq!(outcome.achievements.new_badges.len(), 1);
        assert_eq!(outcome.achievements.new_badges[0].name, "Cat");
    }

    #[tokio::test]
    async fn leaderboard_limit_is_clamped() {
        let mut profiles = MockProfileRepo::new();
        profiles
            .expect_leaderboard()
            .withf(|limit| *limit == 50)
            .returning(|_| Ok(vec![]));
        let svc = service(
            profiles,
            MockPointsRepo::new(),
            MockBadgeRepo::new(),
            MockLevelRepo::new(),
        );
        svc.leaderboard(Some(500)).await.unwrap();
    }

    #[tokio::test]
    async fn history_pages_are_one_based() {
        let user_id = Uuid::new_v4();
        let mut points = MockPointsRepo::new();
        points
            .expect_history()
            .withf(|_, limit, offset| *limit == 20 && *offset == 20)
            .returning(|_, _, _| Ok(vec![]));
        let svc = service(
            MockProfileRepo::new(),
            points,
            MockBadgeRepo::new(),
            MockLevelRepo::new(),
        );
        svc.points_history(user_id, 2).await.unwrap();
    }
}
