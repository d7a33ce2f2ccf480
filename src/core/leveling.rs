//! Leveling rules - XP thresholds, level derivation and level-up rewards.
//!
//! Levels follow triangular scaling: reaching level `n + 1` requires
//! `100 * (1 + 2 + ... + n)` cumulative XP, so every level costs 100 XP more
//! than the one before it. All functions here are pure; persisting the
//! profile is left to the caller.

use crate::{
    entities::profile::{self, decode_set, encode_set},
    errors::Result,
};
use tracing::info;

/// XP step between consecutive levels.
pub const XP_PER_LEVEL_STEP: i64 = 100;

/// Highest multiplier a streak can reach.
pub const MAX_STREAK_MULTIPLIER: f64 = 2.5;

/// Theme and insight unlocked when a profile reaches a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelReward {
    /// Level that grants the reward
    pub level: i32,
    /// Theme identifier added to `unlocked_themes`
    pub theme: &'static str,
    /// Insight identifier added to `unlocked_insights`
    pub insight: &'static str,
}

/// Rewards granted on reaching levels 2 through 5.
pub const LEVEL_REWARDS: [LevelReward; 4] = [
    LevelReward {
        level: 2,
        theme: "light",
        insight: "weekly_summary",
    },
    LevelReward {
        level: 3,
        theme: "neon",
        insight: "category_breakdown",
    },
    LevelReward {
        level: 4,
        theme: "midnight",
        insight: "spending_forecast",
    },
    LevelReward {
        level: 5,
        theme: "forest",
        insight: "savings_tips",
    },
];

const RANK_TITLES: [&str; 10] = [
    "Budget Beginner",
    "Penny Tracker",
    "Money Manager",
    "Finance Wizard",
    "Expense Master",
    "Budget Guru",
    "Wealth Warrior",
    "Fortune Keeper",
    "Money Legend",
    "Financial Titan",
];

/// Cumulative XP required to advance past `level`.
///
/// `xp_threshold(0)` is 0, `xp_threshold(1)` is 100, `xp_threshold(2)` is 300.
#[must_use]
pub fn xp_threshold(level: i32) -> i64 {
    if level <= 0 {
        return 0;
    }
    let level = i64::from(level);
    XP_PER_LEVEL_STEP * level * (level + 1) / 2
}

/// Smallest level `L >= 1` such that `xp < xp_threshold(L)`.
#[must_use]
pub fn level_for_xp(xp: i64) -> i32 {
    let mut level = 1;
    while xp >= xp_threshold(level) {
        level += 1;
    }
    level
}

/// Progress through the current level as a whole percentage in `[0, 100]`.
#[must_use]
pub fn progress_percentage(xp: i64, level: i32) -> u32 {
    let floor = xp_threshold(level - 1);
    let span = xp_threshold(level) - floor;
    if span <= 0 {
        return 0;
    }
    let percent = ((xp - floor) * 100 / span).clamp(0, 100);
    u32::try_from(percent).unwrap_or(0)
}

/// XP still needed before the profile reaches its next level.
#[must_use]
pub fn xp_to_next_level(profile: &profile::Model) -> i64 {
    (xp_threshold(profile.level) - profile.xp).max(0)
}

/// Display title for a level. Levels above 10 keep the top title.
#[must_use]
pub fn rank_title(level: i32) -> &'static str {
    let index = usize::try_from(level.clamp(1, 10) - 1).unwrap_or(0);
    RANK_TITLES[index]
}

/// Applies the streak multiplier to a base amount, rounding down.
#[must_use]
pub fn effective_xp(base: i64, multiplier: f64) -> i64 {
    // Cast safety: base XP values are small reward constants, far below 2^52.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let gained = (base as f64 * multiplier).floor() as i64;
    gained
}

/// Awards XP to a profile and levels it up as many times as the new total allows.
///
/// The effective gain is `floor(base * streak_multiplier)`. Each level gained
/// unlocks that level's rewards. Returns the effective gain.
pub fn add_xp(profile: &mut profile::Model, base: i64) -> Result<i64> {
    let gained = effective_xp(base, profile.streak_multiplier);
    profile.xp += gained;

    while profile.xp >= xp_threshold(profile.level) {
        profile.level += 1;
        info!(
            user = %profile.user_key,
            level = profile.level,
            "Profile reached a new level"
        );
        unlock_rewards(profile)?;
    }

    Ok(gained)
}

/// Unlocks the theme and insight tied to the profile's current level.
///
/// Unlocking is a set union, so calling this repeatedly for the same level
/// changes nothing. Returns whether anything new was unlocked.
pub fn unlock_rewards(profile: &mut profile::Model) -> Result<bool> {
    let Some(reward) = LEVEL_REWARDS.iter().find(|r| r.level == profile.level) else {
        return Ok(false);
    };

    let mut themes = decode_set(&profile.unlocked_themes)?;
    let mut insights = decode_set(&profile.unlocked_insights)?;
    let new_theme = themes.insert(reward.theme.to_string());
    let new_insight = insights.insert(reward.insight.to_string());

    if new_theme {
        profile.unlocked_themes = encode_set(&themes)?;
    }
    if new_insight {
        profile.unlocked_insights = encode_set(&insights)?;
    }

    Ok(new_theme || new_insight)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::sample_profile;

    #[test]
    fn test_xp_threshold_values() {
        assert_eq!(xp_threshold(0), 0);
        assert_eq!(xp_threshold(1), 100);
        assert_eq!(xp_threshold(2), 300);
        assert_eq!(xp_threshold(3), 600);
        assert_eq!(xp_threshold(10), 5500);
    }

    #[test]
    fn test_xp_threshold_strictly_increasing() {
        for level in 0..200 {
            assert!(xp_threshold(level + 1) > xp_threshold(level));
        }
    }

    #[test]
    fn test_level_for_xp_boundaries() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(299), 2);
        assert_eq!(level_for_xp(300), 3);
        assert_eq!(level_for_xp(5500), 11);
    }

    #[test]
    fn test_level_for_xp_monotonic() {
        let mut previous = level_for_xp(0);
        for xp in (0..20_000).step_by(7) {
            let level = level_for_xp(xp);
            assert!(level >= previous);
            assert!(xp < xp_threshold(level));
            previous = level;
        }
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(progress_percentage(0, 1), 0);
        assert_eq!(progress_percentage(50, 1), 50);
        // Level 2 spans 100..300
        assert_eq!(progress_percentage(200, 2), 50);
        assert_eq!(progress_percentage(299, 2), 99);
        // Out-of-range inputs are clamped
        assert_eq!(progress_percentage(1_000, 2), 100);
        assert_eq!(progress_percentage(0, 3), 0);
    }

    #[test]
    fn test_add_xp_applies_multiplier() {
        let mut profile = sample_profile();
        profile.streak_multiplier = 2.0;

        let gained = add_xp(&mut profile, 100).unwrap();

        assert_eq!(gained, 200);
        assert_eq!(profile.xp, 200);
        assert_eq!(profile.level, 2);
    }

    #[test]
    fn test_add_xp_floors_fractional_gain() {
        let mut profile = sample_profile();
        profile.streak_multiplier = 1.25;

        assert_eq!(add_xp(&mut profile, 10).unwrap(), 12);
        assert_eq!(profile.xp, 12);
    }

    #[test]
    fn test_add_xp_crosses_several_levels() {
        let mut profile = sample_profile();

        add_xp(&mut profile, 250).unwrap();
        assert_eq!(profile.level, 2);

        add_xp(&mut profile, 400).unwrap();
        assert_eq!(profile.xp, 650);
        assert_eq!(profile.level, level_for_xp(650));
        assert_eq!(profile.level, 4);

        let themes = profile.themes().unwrap();
        assert!(themes.contains("light"));
        assert!(themes.contains("neon"));
        assert!(themes.contains("midnight"));
        assert!(!themes.contains("forest"));
        assert!(profile.insights().unwrap().contains("spending_forecast"));
    }

    #[test]
    fn test_unlock_rewards_is_idempotent() {
        let mut profile = sample_profile();
        profile.level = 3;

        assert!(unlock_rewards(&mut profile).unwrap());
        let themes_once = profile.unlocked_themes.clone();
        assert!(!unlock_rewards(&mut profile).unwrap());
        assert_eq!(profile.unlocked_themes, themes_once);
    }

    #[test]
    fn test_unlock_rewards_without_table_entry() {
        let mut profile = sample_profile();
        profile.level = 9;
        assert!(!unlock_rewards(&mut profile).unwrap());
    }

    #[test]
    fn test_rank_titles() {
        assert_eq!(rank_title(1), "Budget Beginner");
        assert_eq!(rank_title(5), "Expense Master");
        assert_eq!(rank_title(10), "Financial Titan");
        assert_eq!(rank_title(42), "Financial Titan");
    }

    #[test]
    fn test_xp_to_next_level() {
        let mut profile = sample_profile();
        profile.xp = 120;
        profile.level = 2;
        assert_eq!(xp_to_next_level(&profile), 180);
    }
}
