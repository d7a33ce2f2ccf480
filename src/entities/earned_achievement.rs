//! Earned achievement entity - Links a profile to an achievement it unlocked.
//!
//! At most one row exists per (`profile_id`, `achievement_key`); rows are never deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Earned achievement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "earned_achievements")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Profile that earned the achievement
    pub profile_id: i64,
    /// Key of the achievement in the catalog
    pub achievement_key: String,
    /// When the achievement was earned
    pub earned_at: DateTimeUtc,
}

/// Defines relationships between EarnedAchievement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each earned achievement belongs to one profile
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
