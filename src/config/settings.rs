//! Gameplay settings loading from config.toml
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! Only a file that exists but cannot be parsed is an error.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// XP rewards for logging activity
    pub rewards: RewardSettings,
    /// Challenge assignment policy
    pub challenges: ChallengeSettings,
    /// Defaults for the projection report
    pub projections: ProjectionSettings,
}

/// XP granted for logging activity
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RewardSettings {
    /// Base XP for each logged expense, before the streak multiplier
    pub expense_xp: i64,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self { expense_xp: 10 }
    }
}

/// How many challenges of each kind a profile is assigned per period
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChallengeSettings {
    /// Daily challenges assigned each day
    pub daily_slots: usize,
    /// Weekly challenges assigned each week
    pub weekly_slots: usize,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            daily_slots: 2,
            weekly_slots: 2,
        }
    }
}

/// Defaults used by projections and savings challenges
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectionSettings {
    /// Monthly income assumed when the caller does not provide one
    pub default_monthly_income: f64,
    /// Currency symbol prefixed to amounts in insight text
    pub currency_symbol: String,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            default_monthly_income: 50_000.0,
            currency_symbol: "₹".to_string(),
        }
    }
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    debug!("Loading settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses settings from TOML text.
pub fn parse_config(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from `path`, falling back to defaults when the file does not exist.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        load_config(path_ref)
    } else {
        info!(
            "No config file at {}, using default settings",
            path_ref.display()
        );
        Ok(Settings::default())
    }
}
