//! Unified error type for the tracker.
//!
//! Every fallible operation returns [`Result`]. Persistence failures are
//! wrapped unchanged so callers can decide how to surface them.

use thiserror::Error;

/// All errors produced by the gamification engine and its stores.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Expense amount is not a positive, finite, storable value
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Malformed input rejected before anything is persisted
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A stored row references an achievement missing from the catalog
    #[error("Achievement not found in catalog: {key}")]
    AchievementNotFound {
        /// Catalog key that could not be resolved
        key: String,
    },

    /// A stored row references a challenge missing from the catalog
    #[error("Challenge not found in catalog: {key}")]
    ChallengeNotFound {
        /// Catalog key that could not be resolved
        key: String,
    },

    /// Theme has not been unlocked by the profile yet
    #[error("Theme '{theme}' is locked")]
    ThemeLocked {
        /// Requested theme identifier
        theme: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Reward sets are stored as JSON arrays
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing command output failed
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
