//! Command handlers - call the tracker and render plain-text output.

use super::AppContext;
use crate::{
    core::{
        achievement::get_achievement_board,
        challenge::{ChallengeEntry, get_challenge_board},
        expense::NewExpense,
        profile::{select_theme, theme_board},
        projection::get_projections,
        report::{format_amount, format_expense_line, format_progress_bar},
        streak::StreakChange,
        tracker::{ProfileSummary, get_dashboard_stats, get_expense_summary, log_expense},
    },
    entities::ChallengeStatus,
    errors::Result,
};
use chrono::NaiveDate;
use std::fmt::Write as _;
use tracing::info;

fn profile_header(summary: &ProfileSummary) -> String {
    format!(
        "{} | Level {} {} | {} XP ({} to next)\n{}\nStreak: {} days (best {}) | Multiplier x{:.2}\n",
        summary.user_key,
        summary.level,
        summary.rank,
        summary.xp,
        summary.xp_to_next_level,
        format_progress_bar(summary.progress_percent, Some(20)),
        summary.current_streak,
        summary.longest_streak,
        summary.streak_multiplier,
    )
}

fn challenge_line(entry: &ChallengeEntry) -> String {
    let definition = &entry.definition;
    format!(
        "{} {} [{}] {} | {}/{} | {} XP",
        definition.icon,
        definition.title,
        definition.category.label(),
        format_progress_bar(entry.progress_percent(), None),
        entry.instance.progress,
        definition.target_value,
        definition.xp_reward,
    )
}

/// `log` - stores an expense and reports every reward it triggered.
pub async fn log(
    ctx: &AppContext,
    amount: f64,
    description: String,
    category: Option<String>,
    date: NaiveDate,
) -> Result<String> {
    let new_expense = NewExpense {
        amount,
        description,
        category,
        date,
    };
    let outcome = log_expense(
        &ctx.db,
        &ctx.settings,
        &ctx.catalogs,
        &ctx.user,
        new_expense,
        ctx.today,
    )
    .await?;
    info!(expense_id = outcome.expense.id, "Log command completed");

    let currency = &ctx.settings.projections.currency_symbol;
    let mut out = format!(
        "Logged {}\n+{} XP\n",
        format_expense_line(&outcome.expense, currency),
        outcome.xp_gained
    );
    match outcome.streak {
        StreakChange::Started => out.push_str("🔥 Streak started!\n"),
        StreakChange::Extended => {
            writeln!(out, "🔥 Streak extended to {} days", outcome.profile.current_streak)?;
        }
        StreakChange::Reset => out.push_str("Streak reset, starting again at 1 day\n"),
        StreakChange::Unchanged => {}
    }
    if outcome.leveled_up() {
        writeln!(out, "⬆️ Level up! Now level {}", outcome.level_after)?;
    }
    for achievement in &outcome.new_achievements {
        writeln!(
            out,
            "{} Achievement unlocked: {} ({})",
            achievement.icon,
            achievement.name,
            achievement.tier.label()
        )?;
    }
    for result in &outcome.challenge_outcomes {
        let verb = if result.status == ChallengeStatus::Completed {
            "completed"
        } else {
            "failed"
        };
        writeln!(
            out,
            "{} Challenge {verb}: {} (+{} XP)",
            result.definition.icon, result.definition.title, result.xp_gained
        )?;
    }
    Ok(out)
}

/// `dashboard` - profile summary and headline numbers.
pub async fn dashboard(ctx: &AppContext) -> Result<String> {
    let stats = get_dashboard_stats(&ctx.db, &ctx.catalogs, &ctx.user, ctx.today).await?;
    let currency = &ctx.settings.projections.currency_symbol;

    let mut out = profile_header(&stats.profile);
    writeln!(
        out,
        "\nExpenses: {} | Total: {} | Last 7 days: {}",
        stats.expense_count,
        format_amount(currency, stats.total_amount),
        format_amount(currency, stats.week_amount)
    )?;
    writeln!(
        out,
        "Achievements: {}/{}",
        stats.achievements_earned, stats.achievements_total
    )?;

    out.push_str("\nActive challenges:\n");
    if stats.active_challenges.is_empty() {
        out.push_str("  (none)\n");
    }
    for entry in &stats.active_challenges {
        writeln!(out, "  {}", challenge_line(entry))?;
    }

    out.push_str("\nRecent expenses:\n");
    for expense in &stats.recent_expenses {
        writeln!(out, "  {}", format_expense_line(expense, currency))?;
    }
    Ok(out)
}

/// `challenges` - current daily and weekly challenges.
pub async fn challenges(ctx: &AppContext) -> Result<String> {
    let board = get_challenge_board(
        &ctx.db,
        &ctx.settings,
        &ctx.catalogs.challenges,
        &ctx.user,
        ctx.today,
    )
    .await?;

    let mut out = String::new();
    for (heading, entries) in [("Daily", &board.daily), ("Weekly", &board.weekly)] {
        writeln!(out, "{heading} challenges:")?;
        for entry in entries {
            writeln!(out, "  {}", challenge_line(entry))?;
        }
    }
    if !board.recently_completed.is_empty() {
        out.push_str("Recently completed:\n");
        for entry in &board.recently_completed {
            writeln!(
                out,
                "  {} {} (+{} XP)",
                entry.definition.icon, entry.definition.title, entry.definition.xp_reward
            )?;
        }
    }
    Ok(out)
}

/// `achievements` - every achievement grouped by tier.
pub async fn achievements(ctx: &AppContext) -> Result<String> {
    let board = get_achievement_board(&ctx.db, &ctx.catalogs.achievements, &ctx.user).await?;

    let mut out = format!(
        "Achievements: {}/{}\n",
        board.earned_count, board.total_count
    );
    for group in &board.tiers {
        writeln!(out, "\n{}", group.tier.label())?;
        for status in &group.achievements {
            let mark = if status.is_earned() { "✅" } else { "  " };
            writeln!(
                out,
                "{mark} {} {} - {} {}",
                status.definition.icon,
                status.definition.name,
                status.definition.description,
                format_progress_bar(status.progress, None)
            )?;
        }
    }
    Ok(out)
}

/// `projections` - savings outlook for the given or configured income.
pub async fn projections(ctx: &AppContext, income: Option<f64>) -> Result<String> {
    let report = get_projections(&ctx.db, &ctx.settings, &ctx.user, income, ctx.today).await?;
    let currency = &ctx.settings.projections.currency_symbol;

    let mut out = format!(
        "Income: {}/month | Spending: {}/month ({}/day)\n",
        format_amount(currency, report.monthly_income),
        format_amount(currency, report.monthly_avg),
        format_amount(currency, report.daily_avg)
    );
    writeln!(
        out,
        "Projected this month: {}",
        format_amount(currency, report.projected_month_spend)
    )?;
    writeln!(
        out,
        "Health: {} ({}/100), savings rate {:.0}%",
        report.health.label, report.health.score, report.savings_rate
    )?;

    out.push_str("\nScenarios:\n");
    for scenario in &report.scenarios {
        writeln!(
            out,
            "  {} {}: {}/month, {}/year",
            scenario.icon,
            scenario.name,
            format_amount(currency, scenario.monthly_savings),
            format_amount(currency, scenario.yearly_savings)
        )?;
    }

    out.push_str("\nNext 12 months:\n");
    for month in &report.monthly {
        writeln!(
            out,
            "  {}{} {} {}",
            month.month,
            if month.is_current { "*" } else { " " },
            format_progress_bar(month.percentage, None),
            format_amount(currency, month.cumulative_savings)
        )?;
    }

    for insight in &report.insights {
        writeln!(out, "{} {}", insight.icon, insight.text)?;
    }
    for milestone in &report.milestones {
        writeln!(out, "🎯 {} in {} months", milestone.label, milestone.months)?;
    }
    Ok(out)
}

/// `expenses` - every expense, newest first.
pub async fn expenses(ctx: &AppContext) -> Result<String> {
    let summary = get_expense_summary(&ctx.db, &ctx.catalogs, &ctx.user).await?;
    let currency = &ctx.settings.projections.currency_symbol;

    let mut out = String::new();
    for expense in &summary.expenses {
        writeln!(out, "{}", format_expense_line(expense, currency))?;
    }
    writeln!(
        out,
        "Total: {} | Daily average: {}",
        format_amount(currency, summary.total_amount),
        format_amount(currency, summary.avg_daily)
    )?;
    for achievement in &summary.new_achievements {
        writeln!(out, "{} Achievement unlocked: {}", achievement.icon, achievement.name)?;
    }
    Ok(out)
}

/// `themes` - lists themes, or selects one first.
pub async fn themes(ctx: &AppContext, select: Option<&str>) -> Result<String> {
    let mut out = String::new();
    if let Some(theme_id) = select {
        let profile = select_theme(&ctx.db, &ctx.user, theme_id).await?;
        writeln!(out, "Theme set to {}", profile.theme)?;
    }

    for status in theme_board(&ctx.db, &ctx.user).await? {
        let state = match (status.selected, status.unlocked) {
            (true, _) => "selected",
            (false, true) => "unlocked",
            (false, false) => "locked",
        };
        writeln!(
            out,
            "{} {} ({}) - {state}",
            status.theme.icon, status.theme.name, status.theme.id
        )?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::settings::Settings,
        core::tracker::Catalogs,
        errors::Error,
        test_utils::{date, setup_test_db},
    };

    async fn context() -> Result<AppContext> {
        Ok(AppContext {
            db: setup_test_db().await?,
            settings: Settings::default(),
            catalogs: Catalogs::standard(),
            user: "alice".to_string(),
            today: date(2024, 5, 15),
        })
    }

    #[tokio::test]
    async fn test_log_then_dashboard() -> Result<()> {
        let ctx = context().await?;

        let logged = log(&ctx, 42.5, "Lunch".to_string(), Some("Transport".to_string()), ctx.today).await?;
        assert!(logged.contains("+10 XP"));
        assert!(logged.contains("Streak started"));
        assert!(logged.contains("First Steps"));

        let board = dashboard(&ctx).await?;
        assert!(board.contains("Level 1 Budget Beginner"));
        assert!(board.contains("Achievements: 1/13"));
        assert!(board.contains("Lunch"));
        Ok(())
    }

    #[tokio::test]
    async fn test_locked_theme_is_reported() -> Result<()> {
        let ctx = context().await?;

        let result = themes(&ctx, Some("forest")).await;
        assert!(matches!(result, Err(Error::ThemeLocked { theme: _ })));

        let listing = themes(&ctx, None).await?;
        assert!(listing.contains("Dark Mode (dark) - selected"));
        assert!(listing.contains("Forest Green (forest) - locked"));
        Ok(())
    }

    #[tokio::test]
    async fn test_challenge_output_lists_each_period() -> Result<()> {
        let ctx = context().await?;

        let logged = log(&ctx, 0.75, "Coffee".to_string(), Some("Food".to_string()), ctx.today).await?;
        assert!(logged.contains("🍽️ Challenge failed: No Dining Out Today (+0 XP)"));

        let text = challenges(&ctx).await?;
        assert!(text.starts_with("Daily challenges:\n"));
        assert!(text.contains("Weekly challenges:\n"));
        assert!(text.contains("💰 Minimalist Monday [Budget]"));
        assert!(text.contains("| 1/500 |"));
        assert!(!text.contains("No Dining Out Today"));
        Ok(())
    }

    #[tokio::test]
    async fn test_projection_output() -> Result<()> {
        let ctx = context().await?;
        let text = projections(&ctx, Some(60_000.0)).await?;
        assert!(text.contains("Income: ₹60,000/month"));
        assert!(text.contains("Current Path"));
        Ok(())
    }
}
