//! Database configuration module for `ExpenseQuest`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. The uniqueness rules that span more than
//! one column (one earned row per achievement, one instance per challenge and period) are
//! added as separate unique indexes.

use crate::entities::{
    ChallengeInstance, EarnedAchievement, Expense, Profile, challenge_instance,
    earned_achievement, expense,
};
use crate::errors::{Error, Result};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/expense_quest.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Directory holding the database file of a file-backed `SQLite` URL.
fn sqlite_file_parent(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);

    if let Some(parent) = sqlite_file_parent(&database_url) {
        std::fs::create_dir_all(parent).map_err(|e| Error::Config {
            message: format!("Cannot create database directory {}: {e}", parent.display()),
        })?;
    }
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all necessary tables and indexes if they do not exist yet.
///
/// Safe to call on every start-up.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut profile_table = schema.create_table_from_entity(Profile);
    let mut expense_table = schema.create_table_from_entity(Expense);
    let mut earned_table = schema.create_table_from_entity(EarnedAchievement);
    let mut instance_table = schema.create_table_from_entity(ChallengeInstance);

    for table in [
        &mut profile_table,
        &mut expense_table,
        &mut earned_table,
        &mut instance_table,
    ] {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    let expense_lookup = Index::create()
        .name("idx_expenses_profile_date")
        .table(Expense)
        .col(expense::Column::ProfileId)
        .col(expense::Column::Date)
        .if_not_exists()
        .to_owned();

    let unique_earned = Index::create()
        .name("idx_unique_earned_achievement")
        .table(EarnedAchievement)
        .col(earned_achievement::Column::ProfileId)
        .col(earned_achievement::Column::AchievementKey)
        .unique()
        .if_not_exists()
        .to_owned();

    let unique_instance = Index::create()
        .name("idx_unique_challenge_period")
        .table(ChallengeInstance)
        .col(challenge_instance::Column::ProfileId)
        .col(challenge_instance::Column::ChallengeKey)
        .col(challenge_instance::Column::PeriodStart)
        .unique()
        .if_not_exists()
        .to_owned();

    db.execute(builder.build(&expense_lookup)).await?;
    db.execute(builder.build(&unique_earned)).await?;
    db.execute(builder.build(&unique_instance)).await?;

    info!("Database tables ensured.");
    Ok(())
}
