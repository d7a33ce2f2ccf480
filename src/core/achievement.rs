//! Achievement catalog and evaluator.
//!
//! Achievement definitions are static data. Each one carries a [`Condition`]
//! that is checked against the profile's current [`AchievementMetrics`]; the
//! first time a condition holds, an earned row is written and the reward XP is
//! granted through the leveling rules. Re-evaluating never awards anything twice.

use crate::{
    core::{
        expense::{ExpenseFilter, count_expenses},
        leveling::add_xp,
        profile::{get_or_create_profile, save_profile},
    },
    entities::{EarnedAchievement, earned_achievement, profile},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{error, info, instrument};

/// Ordered rarity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Entry-level achievements
    Bronze,
    /// Second tier
    Silver,
    /// Third tier
    Gold,
    /// Fourth tier
    Platinum,
    /// Rarest tier
    Diamond,
}

impl Tier {
    /// Every tier from most common to rarest.
    pub const ALL: [Self; 5] = [
        Self::Bronze,
        Self::Silver,
        Self::Gold,
        Self::Platinum,
        Self::Diamond,
    ];

    /// Display name of the tier.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Diamond => "Diamond",
        }
    }
}

/// Unlock condition of an achievement, with its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// At least this many expenses logged
    ExpenseCount(u32),
    /// Current streak of at least this many days
    Streak(u32),
    /// At least this many challenges completed
    Challenges(u32),
}

/// Values the conditions are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AchievementMetrics {
    /// Expenses logged by the profile
    pub expense_count: u64,
    /// Profile's current streak
    pub current_streak: u64,
    /// Challenges the profile has completed
    pub challenges_completed: u64,
}

impl AchievementMetrics {
    /// Gathers the metrics for a profile.
    pub async fn gather<C>(db: &C, profile: &profile::Model) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let expense_count = count_expenses(db, profile.id, &ExpenseFilter::default()).await?;
        Ok(Self {
            expense_count,
            current_streak: u64::try_from(profile.current_streak).unwrap_or(0),
            challenges_completed: u64::try_from(profile.challenges_completed).unwrap_or(0),
        })
    }
}

impl Condition {
    /// Threshold the metric has to reach.
    #[must_use]
    pub const fn threshold(self) -> u32 {
        match self {
            Self::ExpenseCount(n) | Self::Streak(n) | Self::Challenges(n) => n,
        }
    }

    /// Current value of the metric this condition watches.
    #[must_use]
    pub const fn current(self, metrics: &AchievementMetrics) -> u64 {
        match self {
            Self::ExpenseCount(_) => metrics.expense_count,
            Self::Streak(_) => metrics.current_streak,
            Self::Challenges(_) => metrics.challenges_completed,
        }
    }

    /// Whether the condition holds.
    #[must_use]
    pub fn is_met(self, metrics: &AchievementMetrics) -> bool {
        self.current(metrics) >= u64::from(self.threshold())
    }

    /// Progress toward the threshold as a whole percentage, capped at 100.
    #[must_use]
    pub fn progress(self, metrics: &AchievementMetrics) -> u32 {
        let threshold = u64::from(self.threshold());
        if threshold == 0 {
            return 100;
        }
        let percent = (self.current(metrics) * 100 / threshold).min(100);
        u32::try_from(percent).unwrap_or(100)
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDefinition {
    /// Stable identifier stored on earned rows
    pub key: &'static str,
    /// Display name
    pub name: &'static str,
    /// What the user has to do
    pub description: &'static str,
    /// Emoji badge
    pub icon: &'static str,
    /// Rarity tier
    pub tier: Tier,
    /// XP granted when earned
    pub xp_reward: i64,
    /// Unlock condition
    pub condition: Condition,
}

const fn def(
    key: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    tier: Tier,
    xp_reward: i64,
    condition: Condition,
) -> AchievementDefinition {
    AchievementDefinition {
        key,
        name,
        description,
        icon,
        tier,
        xp_reward,
        condition,
    }
}

/// The standard achievement set.
pub const STANDARD_ACHIEVEMENTS: [AchievementDefinition; 13] = [
    def("first_steps", "First Steps", "Log your first expense", "👣", Tier::Bronze, 25, Condition::ExpenseCount(1)),
    def("getting_started", "Getting Started", "Log 10 expenses", "🌱", Tier::Bronze, 50, Condition::ExpenseCount(10)),
    def("streak_starter", "Streak Starter", "Maintain a 3-day streak", "🔥", Tier::Bronze, 50, Condition::Streak(3)),
    def("consistent_tracker", "Consistent Tracker", "Log 50 expenses", "📊", Tier::Silver, 100, Condition::ExpenseCount(50)),
    def("week_warrior", "Week Warrior", "Maintain a 7-day streak", "⚔️", Tier::Silver, 100, Condition::Streak(7)),
    def("challenge_accepted", "Challenge Accepted", "Complete 5 challenges", "🎯", Tier::Silver, 100, Condition::Challenges(5)),
    def("century_club", "Century Club", "Log 100 expenses", "💯", Tier::Gold, 200, Condition::ExpenseCount(100)),
    def("fortnight_fighter", "Fortnight Fighter", "Maintain a 14-day streak", "🛡️", Tier::Gold, 200, Condition::Streak(14)),
    def("challenge_champion", "Challenge Champion", "Complete 15 challenges", "🏅", Tier::Gold, 200, Condition::Challenges(15)),
    def("expense_expert", "Expense Expert", "Log 250 expenses", "🎓", Tier::Platinum, 350, Condition::ExpenseCount(250)),
    def("month_master", "Month Master", "Maintain a 30-day streak", "🌙", Tier::Platinum, 350, Condition::Streak(30)),
    def("financial_legend", "Financial Legend", "Log 500 expenses", "👑", Tier::Diamond, 500, Condition::ExpenseCount(500)),
    def("streak_immortal", "Streak Immortal", "Maintain a 60-day streak", "💎", Tier::Diamond, 500, Condition::Streak(60)),
];

/// Read-only list of achievement definitions, evaluated in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementCatalog {
    definitions: Vec<AchievementDefinition>,
}

impl AchievementCatalog {
    /// Builds a catalog from explicit definitions.
    #[must_use]
    pub const fn new(definitions: Vec<AchievementDefinition>) -> Self {
        Self { definitions }
    }

    /// The standard achievement set.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD_ACHIEVEMENTS.to_vec())
    }

    /// All definitions in evaluation order.
    #[must_use]
    pub fn definitions(&self) -> &[AchievementDefinition] {
        &self.definitions
    }

    /// Looks up a definition by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AchievementDefinition> {
        self.definitions.iter().find(|d| d.key == key)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the catalog has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn resolve(&self, key: &str) -> Result<&AchievementDefinition> {
        self.get(key).ok_or_else(|| {
            error!(key, "Earned achievement references unknown catalog entry");
            Error::AchievementNotFound {
                key: key.to_string(),
            }
        })
    }
}

impl Default for AchievementCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Earned rows for a profile, newest first.
pub async fn earned_achievements<C>(
    db: &C,
    profile_id: i64,
) -> Result<Vec<earned_achievement::Model>>
where
    C: ConnectionTrait,
{
    EarnedAchievement::find()
        .filter(earned_achievement::Column::ProfileId.eq(profile_id))
        .order_by_desc(earned_achievement::Column::EarnedAt)
        .order_by_desc(earned_achievement::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Awards every achievement whose condition now holds and that the profile
/// has not earned yet.
///
/// All unearned definitions are checked on every call, in catalog order.
/// Reward XP goes through [`add_xp`], so the streak multiplier applies. The
/// profile is changed in memory only; the caller saves it.
#[instrument(skip(db, catalog, profile), fields(user = %profile.user_key))]
pub async fn check_achievements<C>(
    db: &C,
    catalog: &AchievementCatalog,
    profile: &mut profile::Model,
) -> Result<Vec<AchievementDefinition>>
where
    C: ConnectionTrait,
{
    let earned: Vec<String> = earned_achievements(db, profile.id)
        .await?
        .into_iter()
        .map(|row| row.achievement_key)
        .collect();
    let metrics = AchievementMetrics::gather(db, profile).await?;

    let mut newly_earned = Vec::new();
    for definition in catalog.definitions() {
        if earned.iter().any(|key| key == definition.key) {
            continue;
        }
        if !definition.condition.is_met(&metrics) {
            continue;
        }

        earned_achievement::ActiveModel {
            profile_id: Set(profile.id),
            achievement_key: Set(definition.key.to_string()),
            earned_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let gained = add_xp(profile, definition.xp_reward)?;
        info!(
            achievement = definition.key,
            xp = gained,
            "Achievement earned"
        );
        newly_earned.push(*definition);
    }

    Ok(newly_earned)
}

/// One achievement as shown on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementStatus {
    /// The definition
    pub definition: AchievementDefinition,
    /// When it was earned, if it has been
    pub earned_at: Option<DateTimeUtc>,
    /// Progress toward the condition, 0-100
    pub progress: u32,
}

impl AchievementStatus {
    /// Whether the profile has earned this achievement.
    #[must_use]
    pub const fn is_earned(&self) -> bool {
        self.earned_at.is_some()
    }
}

/// Achievements of one tier, ordered by threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierGroup {
    /// The tier
    pub tier: Tier,
    /// Achievements in the tier
    pub achievements: Vec<AchievementStatus>,
}

/// Every achievement grouped by tier, with the profile's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementBoard {
    /// One group per tier, bronze first
    pub tiers: Vec<TierGroup>,
    /// Achievements the profile has earned
    pub earned_count: usize,
    /// Achievements in the catalog
    pub total_count: usize,
    /// Most recently earned achievements, newest first
    pub recent: Vec<AchievementStatus>,
    /// Achievements awarded while building this board
    pub newly_earned: Vec<AchievementDefinition>,
}

const RECENT_LIMIT: usize = 3;

/// Evaluates pending achievements and builds the board for a profile.
#[instrument(skip(db, catalog))]
pub async fn get_achievement_board(
    db: &DatabaseConnection,
    catalog: &AchievementCatalog,
    user_key: &str,
) -> Result<AchievementBoard> {
    let txn = db.begin().await?;
    let mut profile = get_or_create_profile(&txn, user_key).await?;

    let newly_earned = check_achievements(&txn, catalog, &mut profile).await?;
    if !newly_earned.is_empty() {
        profile = save_profile(&txn, &profile).await?;
    }

    let earned_rows = earned_achievements(&txn, profile.id).await?;
    let metrics = AchievementMetrics::gather(&txn, &profile).await?;
    txn.commit().await?;

    let mut earned_at = HashMap::new();
    for row in &earned_rows {
        catalog.resolve(&row.achievement_key)?;
        earned_at.insert(row.achievement_key.as_str(), row.earned_at);
    }

    let status_of = |definition: &AchievementDefinition| AchievementStatus {
        definition: *definition,
        earned_at: earned_at.get(definition.key).copied(),
        progress: definition.condition.progress(&metrics),
    };

    let tiers = Tier::ALL
        .iter()
        .map(|tier| {
            let mut achievements: Vec<AchievementStatus> = catalog
                .definitions()
                .iter()
                .filter(|d| d.tier == *tier)
                .map(status_of)
                .collect();
            achievements.sort_by_key(|s| s.definition.condition.threshold());
            TierGroup {
                tier: *tier,
                achievements,
            }
        })
        .collect();

    let recent = earned_rows
        .iter()
        .take(RECENT_LIMIT)
        .map(|row| catalog.resolve(&row.achievement_key).map(status_of))
        .collect::<Result<Vec<_>>>()?;

    Ok(AchievementBoard {
        tiers,
        earned_count: earned_rows.len(),
        total_count: catalog.len(),
        recent,
        newly_earned,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::expense::create_expense;
    use crate::test_utils::*;

    fn metrics(expense_count: u64, current_streak: u64, challenges_completed: u64) -> AchievementMetrics {
        AchievementMetrics {
            expense_count,
            current_streak,
            challenges_completed,
        }
    }

    #[test]
    fn test_condition_dispatch() {
        let m = metrics(10, 3, 1);
        assert!(Condition::ExpenseCount(10).is_met(&m));
        assert!(!Condition::ExpenseCount(11).is_met(&m));
        assert!(Condition::Streak(3).is_met(&m));
        assert!(!Condition::Streak(7).is_met(&m));
        assert!(!Condition::Challenges(5).is_met(&m));
    }

    #[test]
    fn test_condition_progress() {
        let m = metrics(25, 0, 5);
        assert_eq!(Condition::ExpenseCount(50).progress(&m), 50);
        assert_eq!(Condition::ExpenseCount(10).progress(&m), 100);
        assert_eq!(Condition::Streak(3).progress(&m), 0);
        assert_eq!(Condition::Challenges(15).progress(&m), 33);
        assert_eq!(Condition::Challenges(0).progress(&m), 100);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Bronze < Tier::Silver);
        assert!(Tier::Platinum < Tier::Diamond);
        let mut shuffled = vec![Tier::Gold, Tier::Bronze, Tier::Diamond, Tier::Silver];
        shuffled.sort();
        assert_eq!(shuffled, vec![Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Diamond]);
    }

    #[test]
    fn test_standard_catalog_keys_unique() {
        let catalog = AchievementCatalog::standard();
        assert_eq!(catalog.len(), 13);
        for definition in catalog.definitions() {
            let matches = catalog
                .definitions()
                .iter()
                .filter(|d| d.key == definition.key)
                .count();
            assert_eq!(matches, 1, "duplicate key {}", definition.key);
        }
    }

    #[tokio::test]
    async fn test_check_achievements_awards_once() -> Result<()> {
        let (db, mut profile) = setup_with_profile("alice").await?;
        let catalog = AchievementCatalog::standard();
        create_expense(&db, profile.id, new_expense(10.0, "Food", date(2024, 5, 1))).await?;

        let first = check_achievements(&db, &catalog, &mut profile).await?;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].key, "first_steps");
        assert_eq!(profile.xp, 25);

        let second = check_achievements(&db, &catalog, &mut profile).await?;
        assert!(second.is_empty());
        assert_eq!(profile.xp, 25);
        assert_eq!(earned_achievements(&db, profile.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_check_achievements_checks_every_definition() -> Result<()> {
        let (db, mut profile) = setup_with_profile("alice").await?;
        let catalog = AchievementCatalog::standard();
        profile.current_streak = 7;
        profile.challenges_completed = 5;

        let earned = check_achievements(&db, &catalog, &mut profile).await?;
        let keys: Vec<&str> = earned.iter().map(|d| d.key).collect();

        assert_eq!(
            keys,
            vec!["streak_starter", "week_warrior", "challenge_accepted"]
        );
        assert_eq!(profile.xp, 250);
        assert_eq!(profile.level, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_achievement_reward_uses_multiplier() -> Result<()> {
        let (db, mut profile) = setup_with_profile("alice").await?;
        let catalog = AchievementCatalog::new(vec![def(
            "streak_two",
            "Two Days",
            "Maintain a 2-day streak",
            "🔥",
            Tier::Bronze,
            40,
            Condition::Streak(2),
        )]);
        profile.current_streak = 2;
        profile.streak_multiplier = 1.5;

        check_achievements(&db, &catalog, &mut profile).await?;
        assert_eq!(profile.xp, 60);
        Ok(())
    }

    #[tokio::test]
    async fn test_achievement_board_groups_by_tier() -> Result<()> {
        let (db, profile) = setup_with_profile("alice").await?;
        let catalog = AchievementCatalog::standard();
        for _ in 0..5 {
            create_expense(&db, profile.id, new_expense(10.0, "Food", date(2024, 5, 1))).await?;
        }

        let board = get_achievement_board(&db, &catalog, "alice").await?;

        assert_eq!(board.total_count, 13);
        assert_eq!(board.earned_count, 1);
        assert_eq!(board.newly_earned.len(), 1);
        assert_eq!(board.tiers.len(), 5);
        assert_eq!(board.tiers[0].tier, Tier::Bronze);
        assert_eq!(board.tiers[0].achievements.len(), 3);

        let bronze = &board.tiers[0].achievements;
        assert_eq!(bronze[0].definition.key, "first_steps");
        assert!(bronze[0].is_earned());
        let getting_started = bronze.iter().find(|s| s.definition.key == "getting_started").unwrap();
        assert!(!getting_started.is_earned());
        assert_eq!(getting_started.progress, 50);

        assert_eq!(board.recent.len(), 1);
        assert_eq!(board.recent[0].definition.key, "first_steps");

        // A second look awards nothing new
        let again = get_achievement_board(&db, &catalog, "alice").await?;
        assert!(again.newly_earned.is_empty());
        assert_eq!(again.earned_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_board_rejects_unknown_earned_key() -> Result<()> {
        let (db, profile) = setup_with_profile("alice").await?;
        earned_achievement::ActiveModel {
            profile_id: Set(profile.id),
            achievement_key: Set("retired_badge".to_string()),
            earned_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let result = get_achievement_board(&db, &AchievementCatalog::standard(), "alice").await;
        assert!(matches!(result, Err(Error::AchievementNotFound { key: _ })));
        Ok(())
    }
}
