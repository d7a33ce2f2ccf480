//! Profile entity - Gamification state for a single user.
//!
//! Holds XP, level, streak counters, the streak multiplier and the rewards
//! unlocked so far. Reward sets are stored as JSON arrays of identifiers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Profile database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Unique identifier for the profile
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Caller-supplied key identifying the user this profile belongs to
    #[sea_orm(unique)]
    pub user_key: String,
    /// Total experience points earned
    pub xp: i64,
    /// Current level, always derived from `xp`
    pub level: i32,
    /// Consecutive days with at least one logged expense
    pub current_streak: i32,
    /// Best streak ever reached
    pub longest_streak: i32,
    /// Day of the last streak-counting activity
    pub last_activity_date: Option<Date>,
    /// XP multiplier derived from the streak, between 1.0 and 2.5
    pub streak_multiplier: f64,
    /// Currently selected theme identifier
    pub theme: String,
    /// JSON array of unlocked theme identifiers
    pub unlocked_themes: String,
    /// JSON array of unlocked insight identifiers
    pub unlocked_insights: String,
    /// Number of challenges completed over the profile's lifetime
    pub challenges_completed: i32,
    /// When the profile was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Decodes the unlocked theme identifiers.
    pub fn themes(&self) -> Result<BTreeSet<String>, serde_json::Error> {
        decode_set(&self.unlocked_themes)
    }

    /// Decodes the unlocked insight identifiers.
    pub fn insights(&self) -> Result<BTreeSet<String>, serde_json::Error> {
        decode_set(&self.unlocked_insights)
    }
}

/// Decodes a stored reward set; an empty column is treated as an empty set.
pub fn decode_set(raw: &str) -> Result<BTreeSet<String>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    serde_json::from_str(raw)
}

/// Encodes a reward set for storage.
pub fn encode_set(set: &BTreeSet<String>) -> Result<String, serde_json::Error> {
    serde_json::to_string(set)
}

/// Defines relationships between Profile and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One profile has many expenses
    #[sea_orm(has_many = "super::expense::Entity")]
    Expenses,
    /// One profile has many earned achievements
    #[sea_orm(has_many = "super::earned_achievement::Entity")]
    EarnedAchievements,
    /// One profile has many challenge instances
    #[sea_orm(has_many = "super::challenge_instance::Entity")]
    ChallengeInstances,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::earned_achievement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EarnedAchievements.def()
    }
}

impl Related<super::challenge_instance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChallengeInstances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
