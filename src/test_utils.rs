//! Shared test utilities for `ExpenseQuest`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{expense::NewExpense, profile::get_or_create_profile},
    entities::profile,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Sets up a test database with one freshly created profile.
pub async fn setup_with_profile(user_key: &str) -> Result<(DatabaseConnection, profile::Model)> {
    let db = setup_test_db().await?;
    let profile = get_or_create_profile(&db, user_key).await?;
    Ok((db, profile))
}

/// Builds a date, panicking on invalid input. Tests only.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Builds an expense with a fixed description.
pub fn new_expense(amount: f64, category: &str, date: NaiveDate) -> NewExpense {
    NewExpense {
        amount,
        description: "Test expense".to_string(),
        category: Some(category.to_string()),
        date,
    }
}

/// A profile model that was never stored, for the pure rule tests.
///
/// # Defaults
/// * `xp`: 0, `level`: 1
/// * `streak_multiplier`: 1.0 with no activity yet
/// * `unlocked_themes`: only `dark`
pub fn sample_profile() -> profile::Model {
    profile::Model {
        id: 1,
        user_key: "tester".to_string(),
        xp: 0,
        level: 1,
        current_streak: 0,
        longest_streak: 0,
        last_activity_date: None,
        streak_multiplier: 1.0,
        theme: "dark".to_string(),
        unlocked_themes: r#"["dark"]"#.to_string(),
        unlocked_insights: "[]".to_string(),
        challenges_completed: 0,
        created_at: chrono::Utc::now(),
    }
}
