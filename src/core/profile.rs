//! Profile business logic - lookup, persistence and theme selection.
//!
//! Every profile is addressed by an explicit user key; there is no implicit
//! shared profile.

use crate::{
    entities::{Profile, profile},
    errors::{Error, Result},
};
use sea_orm::{ActiveModelTrait, Set, prelude::*};
use tracing::{info, instrument};

/// Theme every profile starts with; it can never be locked.
pub const DEFAULT_THEME: &str = "dark";

/// A selectable colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Identifier stored on the profile
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Emoji shown next to the name
    pub icon: &'static str,
}

/// All themes, in display order.
pub const THEMES: [Theme; 5] = [
    Theme {
        id: "dark",
        name: "Dark Mode",
        icon: "🌙",
    },
    Theme {
        id: "light",
        name: "Light Mode",
        icon: "☀️",
    },
    Theme {
        id: "neon",
        name: "Neon Glow",
        icon: "💜",
    },
    Theme {
        id: "midnight",
        name: "Midnight Blue",
        icon: "🌌",
    },
    Theme {
        id: "forest",
        name: "Forest Green",
        icon: "🌲",
    },
];

/// A theme together with whether the profile may select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeStatus {
    /// The theme
    pub theme: Theme,
    /// Whether the profile has unlocked it
    pub unlocked: bool,
    /// Whether it is the profile's current theme
    pub selected: bool,
}

/// Finds a profile by user key.
pub async fn get_profile<C>(db: &C, user_key: &str) -> Result<Option<profile::Model>>
where
    C: ConnectionTrait,
{
    Profile::find()
        .filter(profile::Column::UserKey.eq(user_key))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the profile for `user_key`, creating a fresh one on first use.
///
/// New profiles start at level 1 with no XP, no streak, a 1.0 multiplier and
/// only the default theme unlocked.
#[instrument(skip(db))]
pub async fn get_or_create_profile<C>(db: &C, user_key: &str) -> Result<profile::Model>
where
    C: ConnectionTrait,
{
    let user_key = user_key.trim();
    if user_key.is_empty() {
        return Err(Error::Validation {
            message: "User key cannot be empty".to_string(),
        });
    }

    if let Some(existing) = get_profile(db, user_key).await? {
        return Ok(existing);
    }

    let themes: std::collections::BTreeSet<String> = [DEFAULT_THEME.to_string()].into();
    let created = profile::ActiveModel {
        user_key: Set(user_key.to_string()),
        xp: Set(0),
        level: Set(1),
        current_streak: Set(0),
        longest_streak: Set(0),
        last_activity_date: Set(None),
        streak_multiplier: Set(1.0),
        theme: Set(DEFAULT_THEME.to_string()),
        unlocked_themes: Set(profile::encode_set(&themes)?),
        unlocked_insights: Set("[]".to_string()),
        challenges_completed: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(profile_id = created.id, "Created new profile");
    Ok(created)
}

/// Writes every field of the profile back to the database.
pub async fn save_profile<C>(db: &C, profile: &profile::Model) -> Result<profile::Model>
where
    C: ConnectionTrait,
{
    profile::ActiveModel::from(profile.clone())
        .reset_all()
        .update(db)
        .await
        .map_err(Into::into)
}

/// Lists every theme with its lock state for the profile.
pub async fn theme_board<C>(db: &C, user_key: &str) -> Result<Vec<ThemeStatus>>
where
    C: ConnectionTrait,
{
    let profile = get_or_create_profile(db, user_key).await?;
    let unlocked = profile.themes()?;

    Ok(THEMES
        .iter()
        .map(|theme| ThemeStatus {
            theme: *theme,
            unlocked: theme.id == DEFAULT_THEME || unlocked.contains(theme.id),
            selected: profile.theme == theme.id,
        })
        .collect())
}

/// Switches the profile to `theme_id` if it exists and has been unlocked.
#[instrument(skip(db))]
pub async fn select_theme<C>(db: &C, user_key: &str, theme_id: &str) -> Result<profile::Model>
where
    C: ConnectionTrait,
{
    if !THEMES.iter().any(|t| t.id == theme_id) {
        return Err(Error::Validation {
            message: format!("Unknown theme '{theme_id}'"),
        });
    }

    let mut profile = get_or_create_profile(db, user_key).await?;
    if theme_id != DEFAULT_THEME && !profile.themes()?.contains(theme_id) {
        return Err(Error::ThemeLocked {
            theme: theme_id.to_string(),
        });
    }

    profile.theme = theme_id.to_string();
    save_profile(db, &profile).await
}
