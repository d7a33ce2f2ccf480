//! Spending projections - averages, savings scenarios and financial health.
//!
//! [`SpendingHistory::load`] gathers the few aggregates the report needs and
//! [`build_projection`] turns them into a [`ProjectionReport`] without any
//! further database access, so the arithmetic can be tested directly.

use crate::{
    config::settings::Settings,
    core::{
        expense::{
            CategoryTotal, ExpenseFilter, earliest_expense_date, sum_expenses, top_categories,
        },
        profile::get_or_create_profile,
        report::format_amount,
    },
    errors::Result,
};
use chrono::{Datelike, Days, NaiveDate};
use sea_orm::ConnectionTrait;
use tracing::{debug, instrument};

/// Number of days the averages look back over.
pub const LOOKBACK_DAYS: u64 = 30;

const TOP_CATEGORY_LIMIT: usize = 5;
const MILESTONE_TARGETS: [f64; 7] = [
    10_000.0, 25_000.0, 50_000.0, 100_000.0, 250_000.0, 500_000.0, 1_000_000.0,
];
const MAX_MILESTONES: usize = 3;
const MAX_MILESTONE_MONTHS: f64 = 36.0;
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Aggregates of a profile's expenses that projections are built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendingHistory {
    /// Sum of every expense
    pub total_amount: f64,
    /// Sum of expenses dated within the last 30 days
    pub last_30_amount: f64,
    /// Date of the oldest expense
    pub first_expense: Option<NaiveDate>,
    /// Categories with the highest spend, largest first
    pub categories: Vec<CategoryTotal>,
}

impl SpendingHistory {
    /// Loads the aggregates for a profile as of `today`.
    pub async fn load<C>(db: &C, profile_id: i64, today: NaiveDate) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let window_start = today
            .checked_sub_days(Days::new(LOOKBACK_DAYS))
            .unwrap_or(NaiveDate::MIN);

        Ok(Self {
            total_amount: sum_expenses(db, profile_id, &ExpenseFilter::default()).await?,
            last_30_amount: sum_expenses(db, profile_id, &ExpenseFilter::since(window_start))
                .await?,
            first_expense: earliest_expense_date(db, profile_id).await?,
            categories: top_categories(db, profile_id, TOP_CATEGORY_LIMIT).await?,
        })
    }
}

/// A what-if savings scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Display name
    pub name: &'static str,
    /// Emoji badge
    pub icon: &'static str,
    /// Share of spending removed, e.g. 0.1 for 10%
    pub cut: f64,
    /// Savings per month under the scenario
    pub monthly_savings: f64,
    /// Savings per year under the scenario
    pub yearly_savings: f64,
    /// Display colour
    pub colour: &'static str,
    /// Short explanation
    pub description: &'static str,
}

/// One month of the 12-month outlook.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthProjection {
    /// Abbreviated month name
    pub month: &'static str,
    /// Savings accumulated by the end of this month
    pub cumulative_savings: f64,
    /// Spending expected in this month
    pub spending: f64,
    /// Share of the yearly savings reached, 0-100
    pub percentage: u32,
    /// Whether this is the month containing today
    pub is_current: bool,
}

/// Financial health band derived from the savings rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    /// Score out of 100
    pub score: u32,
    /// Display label
    pub label: &'static str,
    /// Display colour
    pub colour: &'static str,
}

/// Tone of an insight line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    /// Good news
    Positive,
    /// Something to fix
    Warning,
    /// Neutral information
    Info,
}

/// A short sentence about the user's finances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    /// Tone of the message
    pub kind: InsightKind,
    /// Emoji badge
    pub icon: &'static str,
    /// Message text
    pub text: String,
}

/// A savings total reachable within three years.
#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    /// Amount to reach
    pub target: f64,
    /// Whole months needed at the current savings rate
    pub months: u32,
    /// Formatted amount
    pub label: String,
}

/// Full projection for one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionReport {
    /// Income the report was computed for
    pub monthly_income: f64,
    /// Days between the first expense and today, at least 1
    pub days_tracked: i64,
    /// Average daily spend over the lookback window
    pub daily_avg: f64,
    /// `daily_avg` scaled to 30 days
    pub monthly_avg: f64,
    /// Expected spend for the current month
    pub projected_month_spend: f64,
    /// Income minus the monthly average
    pub monthly_savings: f64,
    /// Monthly savings over a year
    pub yearly_savings: f64,
    /// Monthly savings as a percentage of income
    pub savings_rate: f64,
    /// What-if scenarios, current path first
    pub scenarios: Vec<Scenario>,
    /// Twelve months starting with the current one
    pub monthly: Vec<MonthProjection>,
    /// Health band
    pub health: Health,
    /// Top categories by spend
    pub categories: Vec<CategoryTotal>,
    /// Insight lines
    pub insights: Vec<Insight>,
    /// Upcoming savings milestones
    pub milestones: Vec<Milestone>,
}

/// Maps a savings rate to its health band. Every lower bound is inclusive.
#[must_use]
pub fn health_for_rate(savings_rate: f64) -> Health {
    let (score, label, colour) = if savings_rate >= 30.0 {
        (95, "Excellent", "green")
    } else if savings_rate >= 20.0 {
        (80, "Great", "green")
    } else if savings_rate >= 10.0 {
        (65, "Good", "yellow")
    } else if savings_rate >= 0.0 {
        (45, "Fair", "orange")
    } else {
        (25, "Needs Attention", "red")
    };
    Health {
        score,
        label,
        colour,
    }
}

/// Savings targets above the yearly savings that can be reached within 36 months.
#[must_use]
pub fn milestones(monthly_savings: f64, yearly_savings: f64, currency: &str) -> Vec<Milestone> {
    if yearly_savings <= 0.0 || monthly_savings <= 0.0 {
        return Vec::new();
    }

    MILESTONE_TARGETS
        .iter()
        .filter(|target| **target > yearly_savings)
        .filter_map(|target| {
            let months = target / monthly_savings;
            if months > MAX_MILESTONE_MONTHS {
                return None;
            }
            // Cast safety: months is in (0, 36]
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let whole_months = months.floor() as u32;
            Some(Milestone {
                target: *target,
                months: whole_months,
                label: format_amount(currency, *target),
            })
        })
        .take(MAX_MILESTONES)
        .collect()
}

fn scenarios(monthly_income: f64, monthly_avg: f64, monthly_savings: f64) -> Vec<Scenario> {
    let scenario = |name: &'static str,
                    icon: &'static str,
                    cut: f64,
                    colour: &'static str,
                    description: &'static str| {
        let monthly = monthly_income - monthly_avg * (1.0 - cut);
        Scenario {
            name,
            icon,
            cut,
            monthly_savings: monthly,
            yearly_savings: monthly * 12.0,
            colour,
            description,
        }
    };

    vec![
        scenario(
            "Current Path",
            "📊",
            0.0,
            if monthly_savings >= 0.0 { "blue" } else { "red" },
            "If you continue spending at this rate",
        ),
        scenario("Cut 10%", "✂️", 0.1, "green", "Reduce spending by 10%"),
        scenario("Cut 25%", "🎯", 0.25, "gold", "Reduce spending by 25%"),
    ]
}

fn monthly_outlook(
    today: NaiveDate,
    monthly_avg: f64,
    monthly_savings: f64,
    yearly_savings: f64,
) -> Vec<MonthProjection> {
    let current = today.month0() as usize;
    (0..12)
        .map(|offset| {
            #[allow(clippy::cast_precision_loss)]
            let cumulative_savings = monthly_savings * (offset + 1) as f64;
            let percentage = if yearly_savings > 0.0 {
                // Cast safety: clamped to [0, 100]
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let percent = (cumulative_savings / yearly_savings * 100.0)
                    .floor()
                    .clamp(0.0, 100.0) as u32;
                percent
            } else {
                0
            };
            MonthProjection {
                month: MONTH_NAMES[(current + offset) % 12],
                cumulative_savings,
                spending: monthly_avg,
                percentage,
                is_current: offset == 0,
            }
        })
        .collect()
}

fn insights(
    monthly_savings: f64,
    yearly_savings: f64,
    categories: &[CategoryTotal],
    currency: &str,
) -> Vec<Insight> {
    let mut lines = Vec::new();
    if monthly_savings > 0.0 {
        lines.push(Insight {
            kind: InsightKind::Positive,
            icon: "🎉",
            text: format!(
                "You're saving {}/month - that's {} per year!",
                format_amount(currency, monthly_savings),
                format_amount(currency, yearly_savings)
            ),
        });
    } else {
        lines.push(Insight {
            kind: InsightKind::Warning,
            icon: "⚠️",
            text: format!(
                "You're overspending by {}/month",
                format_amount(currency, monthly_savings.abs())
            ),
        });
    }

    if let Some(top) = categories.first().filter(|c| c.total > 0.0) {
        lines.push(Insight {
            kind: InsightKind::Info,
            icon: "💡",
            text: format!(
                "Your biggest expense category is {} ({})",
                top.category,
                format_amount(currency, top.total)
            ),
        });
    }
    lines
}

/// Builds the projection report from loaded history.
#[must_use]
pub fn build_projection(
    history: &SpendingHistory,
    monthly_income: f64,
    today: NaiveDate,
    currency: &str,
) -> ProjectionReport {
    let days_tracked = history
        .first_expense
        .map_or(1, |first| (today - first).num_days().max(1));
    let window_days = days_tracked.min(30);

    // Scale the window sum directly so a full window keeps its exact total
    #[allow(clippy::cast_precision_loss)]
    let (daily_avg, monthly_avg) = if history.first_expense.is_some() && window_days > 0 {
        let window = window_days as f64;
        (
            history.last_30_amount / window,
            history.last_30_amount * 30.0 / window,
        )
    } else {
        (0.0, 0.0)
    };

    let days_left = (30 - i64::from(today.day())).max(0);
    let spent_so_far = if days_tracked < 30 {
        history.total_amount
    } else {
        history.last_30_amount
    };
    #[allow(clippy::cast_precision_loss)]
    let projected_month_spend = spent_so_far + daily_avg * days_left as f64;

    let monthly_savings = monthly_income - monthly_avg;
    let yearly_savings = monthly_savings * 12.0;
    let savings_rate = if monthly_income > 0.0 {
        monthly_savings / monthly_income * 100.0
    } else {
        0.0
    };

    debug!(daily_avg, monthly_savings, savings_rate, "Projection computed");

    ProjectionReport {
        monthly_income,
        days_tracked,
        daily_avg,
        monthly_avg,
        projected_month_spend,
        monthly_savings,
        yearly_savings,
        savings_rate,
        scenarios: scenarios(monthly_income, monthly_avg, monthly_savings),
        monthly: monthly_outlook(today, monthly_avg, monthly_savings, yearly_savings),
        health: health_for_rate(savings_rate),
        categories: history.categories.clone(),
        insights: insights(monthly_savings, yearly_savings, &history.categories, currency),
        milestones: milestones(monthly_savings, yearly_savings, currency),
    }
}

/// Projection report for a profile.
///
/// `monthly_income` falls back to the configured default.
#[instrument(skip(db, settings))]
pub async fn get_projections<C>(
    db: &C,
    settings: &Settings,
    user_key: &str,
    monthly_income: Option<f64>,
    today: NaiveDate,
) -> Result<ProjectionReport>
where
    C: ConnectionTrait,
{
    let profile = get_or_create_profile(db, user_key).await?;
    let history = SpendingHistory::load(db, profile.id, today).await?;
    let income = monthly_income.unwrap_or(settings.projections.default_monthly_income);

    Ok(build_projection(
        &history,
        income,
        today,
        &settings.projections.currency_symbol,
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::expense::create_expense;
    use crate::test_utils::*;

    fn history(last_30_amount: f64, first_expense: Option<NaiveDate>) -> SpendingHistory {
        SpendingHistory {
            total_amount: last_30_amount,
            last_30_amount,
            first_expense,
            categories: Vec::new(),
        }
    }

    #[test]
    fn test_health_bands_are_inclusive() {
        assert_eq!(health_for_rate(45.0).label, "Excellent");
        assert_eq!(health_for_rate(30.0).score, 95);
        assert_eq!(health_for_rate(29.9).score, 80);
        assert_eq!(health_for_rate(20.0).label, "Great");
        assert_eq!(health_for_rate(10.0).label, "Good");
        assert_eq!(health_for_rate(9.99).label, "Fair");
        assert_eq!(health_for_rate(0.0).label, "Fair");
        assert_eq!(health_for_rate(-0.01).label, "Needs Attention");
        assert_eq!(health_for_rate(-0.01).colour, "red");
    }

    #[test]
    fn test_forty_thousand_average_on_fifty_thousand_income() {
        let today = date(2024, 6, 20);
        // 30+ days of history at ~1333.33/day
        let report = build_projection(
            &history(40_000.0, Some(date(2024, 4, 1))),
            50_000.0,
            today,
            "₹",
        );

        assert_eq!(report.monthly_avg, 40_000.0);
        assert_eq!(report.monthly_savings, 10_000.0);
        assert_eq!(report.yearly_savings, 120_000.0);
        assert_eq!(report.savings_rate, 20.0);
        assert_eq!(report.health.score, 80);
        assert_eq!(report.health.label, "Great");

        assert_eq!(report.scenarios.len(), 3);
        assert_eq!(report.scenarios[0].colour, "blue");
        assert_eq!(report.scenarios[1].monthly_savings, 14_000.0);
        assert_eq!(report.scenarios[2].monthly_savings, 20_000.0);
        assert_eq!(report.scenarios[2].yearly_savings, 240_000.0);

        let targets: Vec<f64> = report.milestones.iter().map(|m| m.target).collect();
        assert_eq!(targets, vec![250_000.0]);
        assert_eq!(report.milestones[0].months, 25);
        assert_eq!(report.milestones[0].label, "₹250,000");

        assert_eq!(report.insights[0].kind, InsightKind::Positive);
        assert_eq!(
            report.insights[0].text,
            "You're saving ₹10,000/month - that's ₹120,000 per year!"
        );
    }

    #[test]
    fn test_monthly_outlook_wraps_year() {
        let report = build_projection(
            &history(30_000.0, Some(date(2024, 9, 1))),
            60_000.0,
            date(2024, 11, 5),
            "₹",
        );

        assert_eq!(report.monthly.len(), 12);
        assert_eq!(report.monthly[0].month, "Nov");
        assert!(report.monthly[0].is_current);
        assert_eq!(report.monthly[1].month, "Dec");
        assert_eq!(report.monthly[2].month, "Jan");
        assert!(report.monthly[1..].iter().all(|m| !m.is_current));
        assert_eq!(report.monthly[5].percentage, 50);
        assert_eq!(report.monthly[11].percentage, 100);
        assert_eq!(report.monthly[11].cumulative_savings, report.yearly_savings);
    }

    #[test]
    fn test_no_history() {
        let report = build_projection(&history(0.0, None), 50_000.0, date(2024, 6, 20), "₹");

        assert_eq!(report.daily_avg, 0.0);
        assert_eq!(report.days_tracked, 1);
        assert_eq!(report.savings_rate, 100.0);
        assert_eq!(report.health.label, "Excellent");
        assert_eq!(report.insights.len(), 1);
        // 600,000 a year already passes every target below it; only 1M is left
        assert_eq!(report.milestones.len(), 1);
        assert_eq!(report.milestones[0].months, 20);
    }

    #[test]
    fn test_overspending() {
        let report = build_projection(
            &history(60_000.0, Some(date(2024, 1, 1))),
            50_000.0,
            date(2024, 6, 20),
            "$",
        );

        assert_eq!(report.monthly_savings, -10_000.0);
        assert_eq!(report.health.label, "Needs Attention");
        assert_eq!(report.scenarios[0].colour, "red");
        assert!(report.milestones.is_empty());
        assert!(report.monthly.iter().all(|m| m.percentage == 0));
        assert_eq!(report.insights[0].kind, InsightKind::Warning);
        assert_eq!(report.insights[0].text, "You're overspending by $10,000/month");
    }

    #[test]
    fn test_zero_income_has_zero_rate() {
        let report = build_projection(&history(0.0, None), 0.0, date(2024, 6, 20), "₹");
        assert_eq!(report.savings_rate, 0.0);
        assert_eq!(report.health.label, "Fair");
    }

    #[test]
    fn test_milestones_capped() {
        let found = milestones(1_000.0, 12_000.0, "₹");
        let targets: Vec<f64> = found.iter().map(|m| m.target).collect();
        assert_eq!(targets, vec![25_000.0]);

        let found = milestones(500.0, 6_000.0, "₹");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].months, 20);

        let found = milestones(100.0, 1_200.0, "₹");
        assert!(found.is_empty());

        let found = milestones(5.0, 0.0, "₹");
        assert!(found.is_empty());

        // Four targets are reachable within three years; only the first three are kept
        let found = milestones(5_000.0, 1.0, "₹");
        assert_eq!(found.len(), 3);
        let targets: Vec<f64> = found.iter().map(|m| m.target).collect();
        assert_eq!(targets, vec![10_000.0, 25_000.0, 50_000.0]);
        assert_eq!(found[0].months, 2);
    }

    #[test]
    fn test_projected_month_spend_with_short_history() {
        // 10 days tracked, 3000 spent, 15th of the month
        let report = build_projection(
            &history(3_000.0, Some(date(2024, 6, 5))),
            50_000.0,
            date(2024, 6, 15),
            "₹",
        );
        assert_eq!(report.days_tracked, 10);
        assert_eq!(report.daily_avg, 300.0);
        assert_eq!(report.projected_month_spend, 3_000.0 + 300.0 * 15.0);
    }

    #[tokio::test]
    async fn test_get_projections_from_store() -> Result<()> {
        let (db, profile) = setup_with_profile("alice").await?;
        let settings = Settings::default();
        let today = date(2024, 6, 20);
        create_expense(&db, profile.id, new_expense(900.0, "Food", date(2024, 6, 10))).await?;
        create_expense(&db, profile.id, new_expense(100.0, "Transport", date(2024, 6, 15))).await?;
        // Outside the 30-day window
        create_expense(&db, profile.id, new_expense(5_000.0, "Bills", date(2024, 4, 1))).await?;

        let report = get_projections(&db, &settings, "alice", None, today).await?;

        assert_eq!(report.monthly_income, 50_000.0);
        assert_eq!(report.daily_avg, 1_000.0 / 30.0);
        assert_eq!(report.categories[0].category, "Bills");
        assert_eq!(report.insights[1].text, "Your biggest expense category is Bills (₹5,000)");

        let custom = get_projections(&db, &settings, "alice", Some(80_000.0), today).await?;
        assert_eq!(custom.monthly_income, 80_000.0);
        Ok(())
    }
}
