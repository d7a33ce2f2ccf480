//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the tables behind the profile, expense, earned
//! achievement and challenge instance stores. Achievement and challenge
//! definitions are static catalogs and have no table.

pub mod challenge_instance;
pub mod earned_achievement;
pub mod expense;
pub mod profile;

// Re-export specific types to avoid conflicts
pub use challenge_instance::{
    ChallengeStatus, Column as ChallengeInstanceColumn, Entity as ChallengeInstance,
    Model as ChallengeInstanceModel,
};
pub use earned_achievement::{
    Column as EarnedAchievementColumn, Entity as EarnedAchievement,
    Model as EarnedAchievementModel,
};
pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};
pub use profile::{Column as ProfileColumn, Entity as Profile, Model as ProfileModel};
