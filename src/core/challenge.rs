//! Challenge lifecycle - assignment, progress scoring and resolution.
//!
//! Challenge definitions live in a static catalog. A profile gets one instance
//! per definition and period; the instance is scored against its own period
//! only and ends either completed or failed. Goal challenges (`track`, `save`)
//! complete once progress reaches the target. Limit challenges (`no_spend`,
//! `budget`) fail as soon as progress exceeds the target and complete when
//! their period rolls over within the limit.

use crate::{
    config::settings::Settings,
    core::{
        expense::{ExpenseFilter, count_distinct_dates, count_expenses, sum_expenses},
        leveling::{add_xp, effective_xp},
        profile::{get_or_create_profile, save_profile},
    },
    entities::{
        ChallengeInstance, ChallengeStatus, challenge_instance, challenge_instance::ChallengeKind,
        profile,
    },
    errors::{Error, Result},
};
use chrono::{Datelike, Days, NaiveDate};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{debug, error, info, instrument};

/// What a challenge measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeCategory {
    /// Spend nothing in the listed categories
    NoSpend,
    /// Keep total spend (minus the listed categories) under the target
    Budget,
    /// Log expenses on enough days
    Track,
    /// Stay ahead of the pro-rated income allowance by the target
    Save,
}

impl ChallengeCategory {
    /// Whether the target is an upper bound rather than a goal.
    #[must_use]
    pub const fn is_limit(self) -> bool {
        matches!(self, Self::NoSpend | Self::Budget)
    }

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoSpend => "No Spend",
            Self::Budget => "Budget",
            Self::Track => "Track",
            Self::Save => "Save",
        }
    }
}

impl ChallengeKind {
    /// First day of the period containing `today`. Weeks start on Monday.
    #[must_use]
    pub fn period_start(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => today,
            Self::Weekly => today
                .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
                .unwrap_or(today),
        }
    }

    /// Length of a period in days.
    #[must_use]
    pub const fn period_days(self) -> u64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
        }
    }

    /// First day after the period that starts on `start`.
    #[must_use]
    pub fn period_end(self, start: NaiveDate) -> NaiveDate {
        start
            .checked_add_days(Days::new(self.period_days()))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
        }
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeDefinition {
    /// Stable identifier stored on instances
    pub key: &'static str,
    /// Display title
    pub title: &'static str,
    /// What the user has to do
    pub description: &'static str,
    /// Emoji badge
    pub icon: &'static str,
    /// Daily or weekly
    pub kind: ChallengeKind,
    /// What is measured
    pub category: ChallengeCategory,
    /// Goal to reach, or limit not to exceed
    pub target_value: i64,
    /// Categories the measure applies to (no_spend) or ignores (budget)
    pub excluded_categories: &'static [&'static str],
    /// XP granted on completion
    pub xp_reward: i64,
    /// Whether the reward is scaled by the streak multiplier before it is awarded
    pub streak_bonus: bool,
    /// Inactive definitions are never assigned
    pub active: bool,
}

const DINING: &[&str] = &["Food", "Dining", "Restaurant"];
const IMPULSE: &[&str] = &["Shopping", "Entertainment"];

/// The standard challenge set, in assignment order.
pub const STANDARD_CHALLENGES: [ChallengeDefinition; 8] = [
    ChallengeDefinition {
        key: "no_dining_out",
        title: "No Dining Out Today",
        description: "Avoid restaurant expenses for 24 hours",
        icon: "🍽️",
        kind: ChallengeKind::Daily,
        category: ChallengeCategory::NoSpend,
        target_value: 0,
        excluded_categories: DINING,
        xp_reward: 30,
        streak_bonus: false,
        active: true,
    },
    ChallengeDefinition {
        key: "minimalist_monday",
        title: "Minimalist Monday",
        description: "Spend less than ₹500 today",
        icon: "💰",
        kind: ChallengeKind::Daily,
        category: ChallengeCategory::Budget,
        target_value: 500,
        excluded_categories: &[],
        xp_reward: 35,
        streak_bonus: false,
        active: true,
    },
    ChallengeDefinition {
        key: "track_everything",
        title: "Track Everything",
        description: "Log at least 3 expenses today",
        icon: "📝",
        kind: ChallengeKind::Daily,
        category: ChallengeCategory::Track,
        target_value: 3,
        excluded_categories: &[],
        xp_reward: 25,
        streak_bonus: false,
        active: true,
    },
    ChallengeDefinition {
        key: "no_impulse_day",
        title: "No Impulse Day",
        description: "No shopping/entertainment expenses",
        icon: "🛒",
        kind: ChallengeKind::Daily,
        category: ChallengeCategory::NoSpend,
        target_value: 0,
        excluded_categories: IMPULSE,
        xp_reward: 40,
        streak_bonus: false,
        active: true,
    },
    ChallengeDefinition {
        key: "frugal_week",
        title: "Frugal Week",
        description: "Keep weekly spending under ₹5000",
        icon: "📉",
        kind: ChallengeKind::Weekly,
        category: ChallengeCategory::Budget,
        target_value: 5_000,
        excluded_categories: &[],
        xp_reward: 100,
        streak_bonus: false,
        active: true,
    },
    ChallengeDefinition {
        key: "tracking_champion",
        title: "Tracking Champion",
        description: "Log expenses every day this week",
        icon: "🏆",
        kind: ChallengeKind::Weekly,
        category: ChallengeCategory::Track,
        target_value: 7,
        excluded_categories: &[],
        xp_reward: 150,
        streak_bonus: true,
        active: true,
    },
    ChallengeDefinition {
        key: "home_cook_hero",
        title: "Home Cook Hero",
        description: "No dining out for a week",
        icon: "👨‍🍳",
        kind: ChallengeKind::Weekly,
        category: ChallengeCategory::NoSpend,
        target_value: 0,
        excluded_categories: DINING,
        xp_reward: 200,
        streak_bonus: false,
        active: true,
    },
    ChallengeDefinition {
        key: "savings_sprint",
        title: "Savings Sprint",
        description: "Save at least ₹1000 this week",
        icon: "🏃",
        kind: ChallengeKind::Weekly,
        category: ChallengeCategory::Save,
        target_value: 1_000,
        excluded_categories: &[],
        xp_reward: 175,
        streak_bonus: false,
        active: true,
    },
];

/// Read-only list of challenge definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeCatalog {
    definitions: Vec<ChallengeDefinition>,
}

impl ChallengeCatalog {
    /// Builds a catalog from explicit definitions.
    #[must_use]
    pub const fn new(definitions: Vec<ChallengeDefinition>) -> Self {
        Self { definitions }
    }

    /// The standard challenge set.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD_CHALLENGES.to_vec())
    }

    /// All definitions in catalog order.
    #[must_use]
    pub fn definitions(&self) -> &[ChallengeDefinition] {
        &self.definitions
    }

    /// Looks up a definition by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ChallengeDefinition> {
        self.definitions.iter().find(|d| d.key == key)
    }

    /// Active definitions of one kind, in catalog order.
    pub fn assignable(&self, kind: ChallengeKind) -> impl Iterator<Item = &ChallengeDefinition> {
        self.definitions
            .iter()
            .filter(move |d| d.active && d.kind == kind)
    }

    fn resolve(&self, key: &str) -> Result<&ChallengeDefinition> {
        self.get(key).ok_or_else(|| {
            error!(key, "Challenge instance references unknown catalog entry");
            Error::ChallengeNotFound {
                key: key.to_string(),
            }
        })
    }
}

impl Default for ChallengeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Result of judging an instance's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep scoring
    Pending,
    /// Resolve as completed
    Complete,
    /// Resolve as failed
    Fail,
}

/// Decides what happens to an instance with the given progress.
///
/// `period_over` is true once the instance's period has ended.
#[must_use]
pub const fn judge(definition: &ChallengeDefinition, progress: i64, period_over: bool) -> Verdict {
    if definition.category.is_limit() {
        if progress > definition.target_value {
            Verdict::Fail
        } else if period_over {
            Verdict::Complete
        } else {
            Verdict::Pending
        }
    } else if progress >= definition.target_value {
        Verdict::Complete
    } else if period_over {
        Verdict::Fail
    } else {
        Verdict::Pending
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole_units(amount: f64) -> i64 {
    amount.floor() as i64
}

/// Spend measured against a limit, rounded up so any fraction over the limit counts.
#[allow(clippy::cast_possible_truncation)]
fn limit_units(amount: f64) -> i64 {
    ((amount * 100.0).round() / 100.0).ceil() as i64
}

/// Recomputes an instance's progress from the expenses in its period.
///
/// `today` only matters for `save` challenges, whose allowance grows with
/// each elapsed day of the period.
pub async fn compute_progress<C>(
    db: &C,
    profile_id: i64,
    definition: &ChallengeDefinition,
    period_start: NaiveDate,
    today: NaiveDate,
    monthly_income: f64,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    let kind = definition.kind;
    let period = ExpenseFilter::between(period_start, kind.period_end(period_start));

    let progress = match definition.category {
        ChallengeCategory::Track => {
            let count = match kind {
                ChallengeKind::Daily => count_expenses(db, profile_id, &period).await?,
                ChallengeKind::Weekly => count_distinct_dates(db, profile_id, &period).await?,
            };
            i64::try_from(count).unwrap_or(i64::MAX)
        }
        ChallengeCategory::NoSpend => {
            let filter = period.only(definition.excluded_categories);
            limit_units(sum_expenses(db, profile_id, &filter).await?)
        }
        ChallengeCategory::Budget => {
            let filter = period.excluding(definition.excluded_categories);
            limit_units(sum_expenses(db, profile_id, &filter).await?)
        }
        ChallengeCategory::Save => {
            let spend = sum_expenses(db, profile_id, &period).await?;
            let elapsed = ((today - period_start).num_days() + 1)
                .clamp(0, i64::try_from(kind.period_days()).unwrap_or(7));
            #[allow(clippy::cast_precision_loss)]
            let allowance = monthly_income / 30.0 * elapsed as f64;
            whole_units(allowance - spend)
        }
    };

    debug!(challenge = definition.key, progress, "Challenge progress computed");
    Ok(progress)
}

/// Finds the instance of a challenge for one period, whatever its status.
pub async fn find_instance<C>(
    db: &C,
    profile_id: i64,
    challenge_key: &str,
    period_start: NaiveDate,
) -> Result<Option<challenge_instance::Model>>
where
    C: ConnectionTrait,
{
    ChallengeInstance::find()
        .filter(challenge_instance::Column::ProfileId.eq(profile_id))
        .filter(challenge_instance::Column::ChallengeKey.eq(challenge_key))
        .filter(challenge_instance::Column::PeriodStart.eq(period_start))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Every active instance of a profile, oldest first.
pub async fn active_instances<C>(db: &C, profile_id: i64) -> Result<Vec<challenge_instance::Model>>
where
    C: ConnectionTrait,
{
    ChallengeInstance::find()
        .filter(challenge_instance::Column::ProfileId.eq(profile_id))
        .filter(challenge_instance::Column::Status.eq(ChallengeStatus::Active))
        .order_by_asc(challenge_instance::Column::PeriodStart)
        .order_by_asc(challenge_instance::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// What happened to an instance that reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeOutcome {
    /// The challenge
    pub definition: ChallengeDefinition,
    /// Completed or failed
    pub status: ChallengeStatus,
    /// Final progress value
    pub progress: i64,
    /// XP awarded, 0 for failures
    pub xp_gained: i64,
}

async fn resolve_instance<C>(
    db: &C,
    profile: &mut profile::Model,
    definition: &ChallengeDefinition,
    instance: challenge_instance::Model,
    progress: i64,
    verdict: Verdict,
) -> Result<Option<ChallengeOutcome>>
where
    C: ConnectionTrait,
{
    let status = match verdict {
        Verdict::Pending => {
            if instance.progress != progress {
                let mut active: challenge_instance::ActiveModel = instance.into();
                active.progress = Set(progress);
                active.update(db).await?;
            }
            return Ok(None);
        }
        Verdict::Complete => ChallengeStatus::Completed,
        Verdict::Fail => ChallengeStatus::Failed,
    };

    let mut active: challenge_instance::ActiveModel = instance.into();
    active.status = Set(status);
    active.progress = Set(progress);
    active.completed_at = Set(Some(chrono::Utc::now()));
    active.update(db).await?;

    let xp_gained = if status == ChallengeStatus::Completed {
        let reward = if definition.streak_bonus {
            effective_xp(definition.xp_reward, profile.streak_multiplier)
        } else {
            definition.xp_reward
        };
        let gained = add_xp(profile, reward)?;
        profile.challenges_completed += 1;
        info!(challenge = definition.key, xp = gained, "Challenge completed");
        gained
    } else {
        info!(challenge = definition.key, progress, "Challenge failed");
        0
    };

    Ok(Some(ChallengeOutcome {
        definition: *definition,
        status,
        progress,
        xp_gained,
    }))
}

/// Resolves active instances whose period ended before `today`.
///
/// Limit challenges are scored one final time and complete or fail. Goal
/// challenges that got this far without completing fail.
#[instrument(skip(db, catalog, settings, profile), fields(user = %profile.user_key))]
pub async fn expire_past_challenges<C>(
    db: &C,
    catalog: &ChallengeCatalog,
    settings: &Settings,
    profile: &mut profile::Model,
    today: NaiveDate,
) -> Result<Vec<ChallengeOutcome>>
where
    C: ConnectionTrait,
{
    let mut outcomes = Vec::new();
    for instance in active_instances(db, profile.id).await? {
        let period_end = instance.kind.period_end(instance.period_start);
        if period_end > today {
            continue;
        }

        let definition = *catalog.resolve(&instance.challenge_key)?;
        let last_day = period_end.pred_opt().unwrap_or(instance.period_start);
        let progress = compute_progress(
            db,
            profile.id,
            &definition,
            instance.period_start,
            last_day,
            settings.projections.default_monthly_income,
        )
        .await?;
        let verdict = judge(&definition, progress, true);

        if let Some(outcome) =
            resolve_instance(db, profile, &definition, instance, progress, verdict).await?
        {
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

/// Assigns the first configured number of active definitions of each kind
/// for the current periods.
///
/// Nothing is assigned for a definition that already has an instance in the
/// period, whatever its status, so a resolved challenge is not handed out again.
#[instrument(skip(db, catalog, settings, profile), fields(user = %profile.user_key))]
pub async fn assign_challenges<C>(
    db: &C,
    catalog: &ChallengeCatalog,
    settings: &Settings,
    profile: &profile::Model,
    today: NaiveDate,
) -> Result<Vec<challenge_instance::Model>>
where
    C: ConnectionTrait,
{
    let slots = [
        (ChallengeKind::Daily, settings.challenges.daily_slots),
        (ChallengeKind::Weekly, settings.challenges.weekly_slots),
    ];

    let mut assigned = Vec::new();
    for (kind, count) in slots {
        let period_start = kind.period_start(today);
        for definition in catalog.assignable(kind).take(count) {
            if find_instance(db, profile.id, definition.key, period_start)
                .await?
                .is_some()
            {
                continue;
            }

            let instance = challenge_instance::ActiveModel {
                profile_id: Set(profile.id),
                challenge_key: Set(definition.key.to_string()),
                kind: Set(kind),
                period_start: Set(period_start),
                status: Set(ChallengeStatus::Active),
                progress: Set(0),
                started_at: Set(chrono::Utc::now()),
                completed_at: Set(None),
                ..Default::default()
            }
            .insert(db)
            .await?;
            debug!(challenge = definition.key, %period_start, "Challenge assigned");
            assigned.push(instance);
        }
    }
    Ok(assigned)
}

/// Rescores every active instance and resolves those that are decided.
#[instrument(skip(db, catalog, settings, profile), fields(user = %profile.user_key))]
pub async fn update_challenge_progress<C>(
    db: &C,
    catalog: &ChallengeCatalog,
    settings: &Settings,
    profile: &mut profile::Model,
    today: NaiveDate,
) -> Result<Vec<ChallengeOutcome>>
where
    C: ConnectionTrait,
{
    let mut outcomes = Vec::new();
    for instance in active_instances(db, profile.id).await? {
        let definition = *catalog.resolve(&instance.challenge_key)?;
        let period_over = instance.kind.period_end(instance.period_start) <= today;
        let progress = compute_progress(
            db,
            profile.id,
            &definition,
            instance.period_start,
            today,
            settings.projections.default_monthly_income,
        )
        .await?;
        let verdict = judge(&definition, progress, period_over);

        if let Some(outcome) =
            resolve_instance(db, profile, &definition, instance, progress, verdict).await?
        {
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

/// Expires past periods, assigns current ones and rescores what is left.
///
/// The profile is changed in memory only; the caller saves it.
pub async fn refresh_challenges<C>(
    db: &C,
    catalog: &ChallengeCatalog,
    settings: &Settings,
    profile: &mut profile::Model,
    today: NaiveDate,
) -> Result<Vec<ChallengeOutcome>>
where
    C: ConnectionTrait,
{
    let mut outcomes = expire_past_challenges(db, catalog, settings, profile, today).await?;
    assign_challenges(db, catalog, settings, profile, today).await?;
    outcomes.extend(update_challenge_progress(db, catalog, settings, profile, today).await?);
    Ok(outcomes)
}

/// An instance paired with its definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeEntry {
    /// The challenge
    pub definition: ChallengeDefinition,
    /// The profile's instance of it
    pub instance: challenge_instance::Model,
}

impl ChallengeEntry {
    /// Share of the target reached (goals) or used up (limits), 0-100.
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        let progress = self.instance.progress.max(0);
        let target = self.definition.target_value;
        if target <= 0 {
            return if self.definition.category.is_limit() && progress == 0 {
                0
            } else {
                100
            };
        }
        u32::try_from((progress * 100 / target).min(100)).unwrap_or(100)
    }
}

fn pair(
    catalog: &ChallengeCatalog,
    instances: Vec<challenge_instance::Model>,
) -> Result<Vec<ChallengeEntry>> {
    instances
        .into_iter()
        .map(|instance| -> Result<ChallengeEntry> {
            let definition = *catalog.resolve(&instance.challenge_key)?;
            Ok(ChallengeEntry {
                definition,
                instance,
            })
        })
        .collect()
}

/// Active instances belonging to the periods that contain `today`.
pub async fn active_challenge_entries<C>(
    db: &C,
    catalog: &ChallengeCatalog,
    profile_id: i64,
    today: NaiveDate,
) -> Result<Vec<ChallengeEntry>>
where
    C: ConnectionTrait,
{
    let current: Vec<_> = active_instances(db, profile_id)
        .await?
        .into_iter()
        .filter(|i| i.period_start == i.kind.period_start(today))
        .collect();
    pair(catalog, current)
}

/// Most recently completed instances, newest first.
pub async fn completed_entries<C>(
    db: &C,
    catalog: &ChallengeCatalog,
    profile_id: i64,
    limit: u64,
) -> Result<Vec<ChallengeEntry>>
where
    C: ConnectionTrait,
{
    let completed = ChallengeInstance::find()
        .filter(challenge_instance::Column::ProfileId.eq(profile_id))
        .filter(challenge_instance::Column::Status.eq(ChallengeStatus::Completed))
        .order_by_desc(challenge_instance::Column::CompletedAt)
        .order_by_desc(challenge_instance::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    pair(catalog, completed)
}

/// Current challenges of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeBoard {
    /// Active daily challenges for today
    pub daily: Vec<ChallengeEntry>,
    /// Active weekly challenges for this week
    pub weekly: Vec<ChallengeEntry>,
    /// Latest completions, newest first
    pub recently_completed: Vec<ChallengeEntry>,
    /// Instances resolved while building this board
    pub outcomes: Vec<ChallengeOutcome>,
}

const RECENTLY_COMPLETED_LIMIT: u64 = 10;

/// Refreshes the profile's challenges and lists the current ones.
#[instrument(skip(db, settings, catalog))]
pub async fn get_challenge_board(
    db: &DatabaseConnection,
    settings: &Settings,
    catalog: &ChallengeCatalog,
    user_key: &str,
    today: NaiveDate,
) -> Result<ChallengeBoard> {
    let txn = db.begin().await?;
    let mut profile = get_or_create_profile(&txn, user_key).await?;

    let outcomes = refresh_challenges(&txn, catalog, settings, &mut profile, today).await?;
    if !outcomes.is_empty() {
        save_profile(&txn, &profile).await?;
    }

    let (daily, weekly): (Vec<_>, Vec<_>) = active_challenge_entries(&txn, catalog, profile.id, today)
        .await?
        .into_iter()
        .partition(|e| e.definition.kind == ChallengeKind::Daily);
    let recently_completed =
        completed_entries(&txn, catalog, profile.id, RECENTLY_COMPLETED_LIMIT).await?;
    txn.commit().await?;

    Ok(ChallengeBoard {
        daily,
        weekly,
        recently_completed,
        outcomes,
    })
}
