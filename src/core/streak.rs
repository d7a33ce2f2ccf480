//! Streak rules - consecutive-day tracking and the XP multiplier.

use crate::{core::leveling::MAX_STREAK_MULTIPLIER, entities::profile};
use chrono::NaiveDate;
use tracing::debug;

/// Transition applied by [`update_streak`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First activity ever recorded
    Started,
    /// Activity was already counted today
    Unchanged,
    /// Activity yesterday, streak grew by one
    Extended,
    /// Gap of more than one day, streak and multiplier reset
    Reset,
}

/// Multiplier for a streak length: +0.25 every 7 days, capped at 2.5.
#[must_use]
pub fn multiplier_for_streak(streak: i32) -> f64 {
    (1.0 + f64::from(streak.max(0) / 7) * 0.25).min(MAX_STREAK_MULTIPLIER)
}

/// Updates the profile's streak for activity on `today`.
///
/// Must run once per qualifying activity and before XP is awarded, since the
/// award reads the multiplier set here.
pub fn update_streak(profile: &mut profile::Model, today: NaiveDate) -> StreakChange {
    let change = match profile.last_activity_date {
        None => {
            profile.current_streak = 1;
            StreakChange::Started
        }
        Some(last) if last == today => return StreakChange::Unchanged,
        Some(last) if today.pred_opt() == Some(last) => {
            profile.current_streak += 1;
            profile.streak_multiplier = multiplier_for_streak(profile.current_streak);
            StreakChange::Extended
        }
        Some(_) => {
            profile.current_streak = 1;
            profile.streak_multiplier = 1.0;
            StreakChange::Reset
        }
    };

    profile.longest_streak = profile.longest_streak.max(profile.current_streak);
    profile.last_activity_date = Some(today);
    debug!(
        streak = profile.current_streak,
        multiplier = profile.streak_multiplier,
        ?change,
        "Streak updated"
    );
    change
}
