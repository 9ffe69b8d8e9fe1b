use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The live view model.  Persisted key-by-key; see `hydrate_store::keys`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerState {
    pub daily_goal: f64,
    /// Never decreases except on rollover or reset.
    pub current_intake: f64,
    /// Sticky: once set it stays set until rollover or reset.
    pub goal_reached: bool,
    /// Calendar-day key of the last rollover, e.g. `Mon Oct 19 2026`.
    pub last_reset_date: String,
    pub last_drink: Option<DateTime<Utc>>,
    pub is_onboarded: bool,
}

impl TrackerState {
    /// Completion in `[0, 100]`; zero when no goal is set.
    pub fn percent_complete(&self) -> f64 {
        percent_complete(self.current_intake, self.daily_goal)
    }

    pub fn remaining(&self) -> f64 {
        (self.daily_goal - self.current_intake).max(0.0)
    }
}

pub(crate) fn percent_complete(intake: f64, goal: f64) -> f64 {
    if goal > 0.0 {
        (intake / goal * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Calendar-day key for `now` in the tracker's timezone.
pub fn date_key(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%a %b %d %Y").to_string()
}

/// Round to whole milliliters so repeated small additions land exactly on
/// the goal instead of a hair below it.
pub(crate) fn round_liters(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
