/// Achievement catalog, evaluator and board
pub mod achievement;

/// Challenge catalog and per-period lifecycle
pub mod challenge;

/// Expense validation, storage and aggregates
pub mod expense;

/// XP thresholds, levels and level rewards
pub mod leveling;

/// Profile lookup, persistence and themes
pub mod profile;

/// Spending averages, savings scenarios and health
pub mod projection;

/// Display formatting helpers
pub mod report;

/// Daily streak and multiplier rules
pub mod streak;

/// Front-end facing operations that combine the rules above
pub mod tracker;
