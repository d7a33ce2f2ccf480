//! Challenge instance entity - A profile's attempt at a challenge for one period.
//!
//! Each instance is scored against a single period (a day for daily challenges,
//! a Monday-start week for weekly ones) identified by `period_start`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a challenge instance. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ChallengeStatus {
    /// Still being scored in its period
    #[sea_orm(string_value = "active")]
    Active,
    /// Target reached (or limit respected until the period ended)
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Limit exceeded, or the period ended without reaching the target
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// How long a challenge instance runs before it rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ChallengeKind {
    /// Scored against a single calendar day
    #[sea_orm(string_value = "daily")]
    Daily,
    /// Scored against a Monday-start week
    #[sea_orm(string_value = "weekly")]
    Weekly,
}

/// Challenge instance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "challenge_instances")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Profile taking part in the challenge
    pub profile_id: i64,
    /// Key of the challenge in the catalog
    pub challenge_key: String,
    /// Daily or weekly, copied from the definition for period lookups
    pub kind: ChallengeKind,
    /// First day of the period this instance is scored against
    pub period_start: Date,
    /// Current lifecycle state
    pub status: ChallengeStatus,
    /// Last recomputed progress value
    pub progress: i64,
    /// When the instance was assigned
    pub started_at: DateTimeUtc,
    /// When the instance reached a terminal state
    pub completed_at: Option<DateTimeUtc>,
}

/// Defines relationships between ChallengeInstance and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each challenge instance belongs to one profile
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::ProfileId",
        to = "super::profile::Column::Id"
    )]
    Profile,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
