//! Command-line interface - argument parsing, shared context and dispatch.
//!
//! Each subcommand maps to one handler in [`commands`]. Handlers return the
//! text to print so they can be exercised without a terminal.

pub mod commands;

use crate::{
    config::settings::Settings,
    core::tracker::Catalogs,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Gamified expense tracker.
#[derive(Debug, Parser)]
#[command(name = "expense-quest", version, about)]
pub struct Cli {
    /// Profile to act on
    #[arg(long, global = true, default_value = "default")]
    pub user: String,

    /// Path to the settings file
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log a new expense
    Log {
        /// Amount spent
        amount: f64,
        /// What the money was spent on
        description: String,
        /// Spending category
        #[arg(long, short)]
        category: Option<String>,
        /// Day of the expense (YYYY-MM-DD), today when omitted
        #[arg(long)]
        date: Option<String>,
    },
    /// Show level, streak and headline numbers
    Dashboard,
    /// Show current daily and weekly challenges
    Challenges,
    /// Show every achievement by tier
    Achievements,
    /// Project savings from recent spending
    Projections {
        /// Monthly income, the configured default when omitted
        #[arg(long)]
        income: Option<f64>,
    },
    /// List every expense
    Expenses,
    /// List themes, or switch to one
    Themes {
        /// Theme to switch to
        #[arg(long)]
        select: Option<String>,
    },
}

/// Everything a command handler needs.
#[derive(Debug)]
pub struct AppContext {
    /// Open database connection
    pub db: DatabaseConnection,
    /// Loaded settings
    pub settings: Settings,
    /// Achievement and challenge catalogs
    pub catalogs: Catalogs,
    /// Profile key from `--user`
    pub user: String,
    /// Date used as "today" by every rule
    pub today: NaiveDate,
}

/// Parses an optional `YYYY-MM-DD` date, defaulting to `today`.
pub fn parse_date(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match raw {
        None => Ok(today),
        Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|e| {
            Error::Validation {
                message: format!("Invalid date '{text}': {e}"),
            }
        }),
    }
}

/// Runs one subcommand and returns its output.
#[instrument(skip(ctx, command), fields(user = %ctx.user))]
pub async fn dispatch(ctx: &AppContext, command: Commands) -> Result<String> {
    debug!(?command, "Dispatching command");
    match command {
        Commands::Log {
            amount,
            description,
            category,
            date,
        } => {
            let date = parse_date(date.as_deref(), ctx.today)?;
            commands::log(ctx, amount, description, category, date).await
        }
        Commands::Dashboard => commands::dashboard(ctx).await,
        Commands::Challenges => commands::challenges(ctx).await,
        Commands::Achievements => commands::achievements(ctx).await,
        Commands::Projections { income } => commands::projections(ctx, income).await,
        Commands::Expenses => commands::expenses(ctx).await,
        Commands::Themes { select } => commands::themes(ctx, select.as_deref()).await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::test_utils::date;

    #[test]
    fn test_parse_log_command() {
        let cli = Cli::try_parse_from([
            "expense-quest",
            "--user",
            "alice",
            "log",
            "120.5",
            "Lunch",
            "--category",
            "Food",
            "--date",
            "2024-05-14",
        ])
        .unwrap();

        assert_eq!(cli.user, "alice");
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        match cli.command {
            Commands::Log {
                amount,
                description,
                category,
                date,
            } => {
                assert!((amount - 120.5).abs() < f64::EPSILON);
                assert_eq!(description, "Lunch");
                assert_eq!(category.as_deref(), Some("Food"));
                assert_eq!(date.as_deref(), Some("2024-05-14"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_options_default() {
        let cli = Cli::try_parse_from(["expense-quest", "dashboard"]).unwrap();
        assert_eq!(cli.user, "default");
        assert!(matches!(cli.command, Commands::Dashboard));

        let cli = Cli::try_parse_from(["expense-quest", "themes", "--select", "neon", "--user", "bob"]).unwrap();
        assert_eq!(cli.user, "bob");
        assert!(matches!(cli.command, Commands::Themes { select: Some(_) }));
    }

    #[test]
    fn test_parse_date() {
        let today = date(2024, 5, 15);
        assert_eq!(parse_date(None, today).unwrap(), today);
        assert_eq!(parse_date(Some("2024-02-29"), today).unwrap(), date(2024, 2, 29));
        assert!(matches!(
            parse_date(Some("15/05/2024"), today),
            Err(Error::Validation { message: _ })
        ));
    }
}
