//! Tracker facade - the operations a front end calls.
//!
//! Logging an expense touches every game rule at once: the expense is stored,
//! the streak and XP move, achievements are evaluated and challenges are
//! rescored. All of it happens inside one database transaction so a failure
//! part way leaves nothing behind.

use crate::{
    config::settings::Settings,
    core::{
        achievement::{
            AchievementCatalog, AchievementDefinition, check_achievements, earned_achievements,
        },
        challenge::{
            ChallengeCatalog, ChallengeEntry, ChallengeOutcome, active_challenge_entries,
            refresh_challenges,
        },
        expense::{
            ExpenseFilter, NewExpense, count_distinct_dates, count_expenses, create_expense,
            recent_expenses, sum_expenses, validate_expense,
        },
        leveling::{add_xp, progress_percentage, rank_title, xp_to_next_level},
        profile::{get_or_create_profile, save_profile},
        streak::{StreakChange, update_streak},
    },
    entities::{expense, profile},
    errors::Result,
};
use chrono::{Days, NaiveDate};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{info, instrument};

const DASHBOARD_RECENT_EXPENSES: u64 = 5;
const RECENT_ACHIEVEMENTS: usize = 3;

/// The static catalogs the game rules read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogs {
    /// Achievement definitions
    pub achievements: AchievementCatalog,
    /// Challenge definitions
    pub challenges: ChallengeCatalog,
}

impl Catalogs {
    /// The standard achievement and challenge sets.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            achievements: AchievementCatalog::standard(),
            challenges: ChallengeCatalog::standard(),
        }
    }
}

/// Everything that changed because an expense was logged.
#[derive(Debug, Clone, PartialEq)]
pub struct LogOutcome {
    /// The stored expense
    pub expense: expense::Model,
    /// XP earned for the expense itself, after the multiplier
    pub xp_gained: i64,
    /// What happened to the streak
    pub streak: StreakChange,
    /// Achievements earned by this log
    pub new_achievements: Vec<AchievementDefinition>,
    /// Challenges completed or failed by this log
    pub challenge_outcomes: Vec<ChallengeOutcome>,
    /// Level before the log
    pub level_before: i32,
    /// Level after every reward was applied
    pub level_after: i32,
    /// Profile as saved
    pub profile: profile::Model,
}

impl LogOutcome {
    /// Whether the profile gained at least one level.
    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// Logs an expense and applies every game rule it triggers.
///
/// Order: store the expense, update the streak, award the expense XP,
/// evaluate achievements, refresh challenges, save the profile. Invalid
/// input is rejected before anything is written.
#[instrument(skip(db, settings, catalogs, new_expense), fields(amount = new_expense.amount))]
pub async fn log_expense(
    db: &DatabaseConnection,
    settings: &Settings,
    catalogs: &Catalogs,
    user_key: &str,
    new_expense: NewExpense,
    today: NaiveDate,
) -> Result<LogOutcome> {
    validate_expense(&new_expense)?;

    let txn = db.begin().await?;
    let mut profile = get_or_create_profile(&txn, user_key).await?;
    let level_before = profile.level;

    let expense = create_expense(&txn, profile.id, new_expense).await?;
    let streak = update_streak(&mut profile, today);
    let xp_gained = add_xp(&mut profile, settings.rewards.expense_xp)?;
    let new_achievements = check_achievements(&txn, &catalogs.achievements, &mut profile).await?;
    let challenge_outcomes =
        refresh_challenges(&txn, &catalogs.challenges, settings, &mut profile, today).await?;

    let profile = save_profile(&txn, &profile).await?;
    txn.commit().await?;

    info!(
        expense_id = expense.id,
        xp = xp_gained,
        level = profile.level,
        achievements = new_achievements.len(),
        challenges = challenge_outcomes.len(),
        "Expense logged"
    );

    Ok(LogOutcome {
        expense,
        xp_gained,
        streak,
        new_achievements,
        challenge_outcomes,
        level_before,
        level_after: profile.level,
        profile,
    })
}

/// Display-ready view of a profile's progression.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    /// Profile key
    pub user_key: String,
    /// Cumulative XP
    pub xp: i64,
    /// Current level
    pub level: i32,
    /// Rank title for the level
    pub rank: &'static str,
    /// Progress through the current level, 0-100
    pub progress_percent: u32,
    /// XP left until the next level
    pub xp_to_next_level: i64,
    /// Current streak in days
    pub current_streak: i32,
    /// Best streak in days
    pub longest_streak: i32,
    /// XP multiplier from the streak
    pub streak_multiplier: f64,
    /// Selected theme
    pub theme: String,
    /// Challenges completed so far
    pub challenges_completed: i32,
}

impl ProfileSummary {
    /// Builds the summary for a profile.
    #[must_use]
    pub fn from_profile(profile: &profile::Model) -> Self {
        Self {
            user_key: profile.user_key.clone(),
            xp: profile.xp,
            level: profile.level,
            rank: rank_title(profile.level),
            progress_percent: progress_percentage(profile.xp, profile.level),
            xp_to_next_level: xp_to_next_level(profile),
            current_streak: profile.current_streak,
            longest_streak: profile.longest_streak,
            streak_multiplier: profile.streak_multiplier,
            theme: profile.theme.clone(),
            challenges_completed: profile.challenges_completed,
        }
    }
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    /// Progression summary
    pub profile: ProfileSummary,
    /// Expenses logged
    pub expense_count: u64,
    /// Sum of all expenses
    pub total_amount: f64,
    /// Sum of expenses dated in the last 7 days
    pub week_amount: f64,
    /// Achievements earned
    pub achievements_earned: usize,
    /// Achievements in the catalog
    pub achievements_total: usize,
    /// Active challenges for the current periods
    pub active_challenges: Vec<ChallengeEntry>,
    /// Latest expenses, newest first
    pub recent_expenses: Vec<expense::Model>,
}

/// Collects the dashboard numbers. Read-only.
#[instrument(skip(db, catalogs))]
pub async fn get_dashboard_stats<C>(
    db: &C,
    catalogs: &Catalogs,
    user_key: &str,
    today: NaiveDate,
) -> Result<DashboardStats>
where
    C: ConnectionTrait,
{
    let profile = get_or_create_profile(db, user_key).await?;
    let week_start = today.checked_sub_days(Days::new(7)).unwrap_or(NaiveDate::MIN);

    Ok(DashboardStats {
        profile: ProfileSummary::from_profile(&profile),
        expense_count: count_expenses(db, profile.id, &ExpenseFilter::default()).await?,
        total_amount: sum_expenses(db, profile.id, &ExpenseFilter::default()).await?,
        week_amount: sum_expenses(db, profile.id, &ExpenseFilter::since(week_start)).await?,
        achievements_earned: earned_achievements(db, profile.id).await?.len(),
        achievements_total: catalogs.achievements.len(),
        active_challenges: active_challenge_entries(db, &catalogs.challenges, profile.id, today)
            .await?,
        recent_expenses: recent_expenses(db, profile.id, Some(DASHBOARD_RECENT_EXPENSES)).await?,
    })
}

/// Every expense with running totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseSummary {
    /// All expenses, newest first
    pub expenses: Vec<expense::Model>,
    /// Sum of all expenses
    pub total_amount: f64,
    /// Total divided by the number of distinct expense dates
    pub avg_daily: f64,
    /// Achievements earned while building the summary
    pub new_achievements: Vec<AchievementDefinition>,
    /// Most recently earned achievements, newest first
    pub recent_achievements: Vec<AchievementDefinition>,
}

/// Lists a profile's expenses and evaluates pending achievements.
#[instrument(skip(db, catalogs))]
pub async fn get_expense_summary(
    db: &DatabaseConnection,
    catalogs: &Catalogs,
    user_key: &str,
) -> Result<ExpenseSummary> {
    let txn = db.begin().await?;
    let mut profile = get_or_create_profile(&txn, user_key).await?;

    let new_achievements = check_achievements(&txn, &catalogs.achievements, &mut profile).await?;
    if !new_achievements.is_empty() {
        save_profile(&txn, &profile).await?;
    }

    let expenses = recent_expenses(&txn, profile.id, None).await?;
    let total_amount = sum_expenses(&txn, profile.id, &ExpenseFilter::default()).await?;
    let days = count_distinct_dates(&txn, profile.id, &ExpenseFilter::default()).await?;
    let recent_achievements = earned_achievements(&txn, profile.id)
        .await?
        .iter()
        .filter_map(|row| catalogs.achievements.get(&row.achievement_key).copied())
        .take(RECENT_ACHIEVEMENTS)
        .collect();
    txn.commit().await?;

    #[allow(clippy::cast_precision_loss)]
    let avg_daily = if days == 0 {
        0.0
    } else {
        total_amount / days as f64
    };

    Ok(ExpenseSummary {
        expenses,
        total_amount,
        avg_daily,
        new_achievements,
        recent_achievements,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{
        challenge::{active_instances, find_instance},
        profile::get_profile,
    };
    use crate::entities::ChallengeStatus;
    use crate::errors::Error;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_first_log_awards_expense_and_achievement_xp() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = Settings::default();
        let catalogs = Catalogs::standard();
        let today = date(2024, 5, 15);

        let outcome = log_expense(&db, &settings, &catalogs, "alice", new_expense(120.0, "Transport", today), today).await?;

        assert_eq!(outcome.xp_gained, 10);
        assert_eq!(outcome.streak, StreakChange::Started);
        assert_eq!(outcome.new_achievements.len(), 1);
        assert_eq!(outcome.new_achievements[0].key, "first_steps");
        // 10 for the expense, 25 for first_steps
        assert_eq!(outcome.profile.xp, 35);
        assert_eq!(outcome.profile.current_streak, 1);
        assert_eq!(outcome.level_before, 1);
        assert!(!outcome.leveled_up());

        // Two daily and two weekly challenges were assigned
        assert_eq!(active_instances(&db, outcome.profile.id).await?.len(), 4);

        let stored = get_profile(&db, "alice").await?.unwrap();
        assert_eq!(stored.xp, 35);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_amount_writes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = Settings::default();
        let catalogs = Catalogs::standard();
        let today = date(2024, 5, 15);

        let result = log_expense(&db, &settings, &catalogs, "alice", new_expense(0.0, "Food", today), today).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: _ })));
        assert!(get_profile(&db, "alice").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_dining_out_fails_daily_no_spend() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = Settings::default();
        let catalogs = Catalogs::standard();
        let today = date(2024, 5, 15);

        let outcome = log_expense(&db, &settings, &catalogs, "alice", new_expense(250.0, "Restaurant", today), today).await?;

        assert_eq!(outcome.challenge_outcomes.len(), 1);
        assert_eq!(outcome.challenge_outcomes[0].definition.key, "no_dining_out");
        assert_eq!(outcome.challenge_outcomes[0].status, ChallengeStatus::Failed);

        let instance = find_instance(&db, outcome.profile.id, "minimalist_monday", today).await?.unwrap();
        assert_eq!(instance.status, ChallengeStatus::Active);
        assert_eq!(instance.progress, 250);
        Ok(())
    }

    #[tokio::test]
    async fn test_consecutive_days_build_streak() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = Settings::default();
        let catalogs = Catalogs::standard();

        let mut last = None;
        for day in 13..=15 {
            let today = date(2024, 5, day);
            last = Some(log_expense(&db, &settings, &catalogs, "alice", new_expense(10.0, "Transport", today), today).await?);
        }
        let last = last.unwrap();

        assert_eq!(last.streak, StreakChange::Extended);
        assert_eq!(last.profile.current_streak, 3);
        assert!(last.new_achievements.iter().any(|a| a.key == "streak_starter"));
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_stats() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = Settings::default();
        let catalogs = Catalogs::standard();
        let today = date(2024, 5, 15);

        log_expense(&db, &settings, &catalogs, "alice", new_expense(100.0, "Transport", date(2024, 5, 1)), today).await?;
        for _ in 0..6 {
            log_expense(&db, &settings, &catalogs, "alice", new_expense(20.0, "Transport", today), today).await?;
        }

        let stats = get_dashboard_stats(&db, &catalogs, "alice", today).await?;
        assert_eq!(stats.expense_count, 7);
        assert_eq!(stats.total_amount, 220.0);
        assert_eq!(stats.week_amount, 120.0);
        assert_eq!(stats.achievements_earned, 1);
        assert_eq!(stats.achievements_total, 13);
        assert_eq!(stats.recent_expenses.len(), 5);
        assert_eq!(stats.active_challenges.len(), 4);
        assert_eq!(stats.profile.rank, "Budget Beginner");
        Ok(())
    }

    #[tokio::test]
    async fn test_expense_summary_average() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = Settings::default();
        let catalogs = Catalogs::standard();
        let today = date(2024, 5, 15);

        let empty = get_expense_summary(&db, &catalogs, "alice").await?;
        assert_eq!(empty.avg_daily, 0.0);
        assert!(empty.expenses.is_empty());

        log_expense(&db, &settings, &catalogs, "alice", new_expense(30.0, "Transport", date(2024, 5, 14)), today).await?;
        log_expense(&db, &settings, &catalogs, "alice", new_expense(50.0, "Transport", today), today).await?;
        log_expense(&db, &settings, &catalogs, "alice", new_expense(20.0, "Transport", today), today).await?;

        let summary = get_expense_summary(&db, &catalogs, "alice").await?;
        assert_eq!(summary.expenses.len(), 3);
        assert_eq!(summary.expenses[0].date, today);
        assert_eq!(summary.total_amount, 100.0);
        assert_eq!(summary.avg_daily, 50.0);
        assert!(summary.new_achievements.is_empty());
        assert_eq!(summary.recent_achievements[0].key, "first_steps");
        Ok(())
    }

    #[tokio::test]
    async fn test_profiles_are_isolated() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = Settings::default();
        let catalogs = Catalogs::standard();
        let today = date(2024, 5, 15);

        log_expense(&db, &settings, &catalogs, "alice", new_expense(10.0, "Transport", today), today).await?;
        let bob = get_dashboard_stats(&db, &catalogs, "bob", today).await?;

        assert_eq!(bob.expense_count, 0);
        assert_eq!(bob.profile.xp, 0);
        assert_eq!(bob.achievements_earned, 0);
        Ok(())
    }
}
