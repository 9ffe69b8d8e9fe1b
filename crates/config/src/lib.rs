use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

// ── Tracker config ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Liters added by the "+200ml" button and the matching notification action.
    pub standard_increment_liters: f64,
    /// Goal pre-filled in the setup step.
    pub default_goal_liters: f64,
    /// Upper bound (inclusive) accepted by setup.  The lower bound is always
    /// exclusive zero.
    pub max_goal_liters: f64,
    /// IANA timezone name (e.g. `"America/New_York"`).  Used to decide which
    /// calendar day is "today" for the daily rollover.  Falls back to UTC when
    /// the name is unrecognised.
    pub timezone: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            standard_increment_liters: 0.2,
            default_goal_liters: 2.5,
            max_goal_liters: 10.0,
            timezone: "UTC".to_string(),
        }
    }
}

// ── Reminder config ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Minutes without a drink before the smart reminder fires.
    pub inactivity_minutes: u64,
    /// How often the foreground loop reconciles storage and re-evaluates the
    /// smart reminder while the app is active.
    pub poll_interval_minutes: u64,
    /// Schedule the fixed time-of-day educational reminders on setup.
    pub daily_reminders_enabled: bool,
    /// Local `HH:MM` times for the daily reminders.
    pub daily_times: Vec<String>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            inactivity_minutes: 60,
            poll_interval_minutes: 5,
            daily_reminders_enabled: true,
            daily_times: vec![
                "08:00".to_string(),
                "10:30".to_string(),
                "12:00".to_string(),
                "15:00".to_string(),
                "18:00".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the key-value store.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: ".hydrate/store.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    /// JSONL file the desktop notifier appends every schedule/cancel to.
    pub outbox_path: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            outbox_path: ".hydrate/notifications.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub tracker: TrackerConfig,
    pub reminders: ReminderConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationsConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(value) = env::var("HYDRATE_TIMEZONE") {
            if !value.is_empty() {
                config.tracker.timezone = value;
            }
        }

        if let Ok(value) = env::var("HYDRATE_STORE_PATH") {
            if !value.is_empty() {
                config.storage.path = value;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Configured timezone, or UTC when the name does not parse.
    pub fn timezone(&self) -> Tz {
        self.tracker.timezone.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!(
                timezone = %self.tracker.timezone,
                "unrecognised timezone, falling back to UTC"
            );
            Tz::UTC
        })
    }

    pub fn inactivity_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reminders.inactivity_minutes as i64)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.reminders.poll_interval_minutes.max(1) * 60)
    }

    /// Daily reminder times in ascending order.  Malformed entries are skipped.
    pub fn parsed_daily_times(&self) -> Vec<NaiveTime> {
        let mut times = self
            .reminders
            .daily_times
            .iter()
            .filter_map(|raw| match NaiveTime::parse_from_str(raw.trim(), "%H:%M") {
                Ok(time) => Some(time),
                Err(err) => {
                    tracing::warn!(value = %raw, error = %err, "skipping malformed daily reminder time");
                    None
                }
            })
            .collect::<Vec<_>>();
        times.sort();
        times.dedup();
        times
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use std::fs;
    use tempfile::TempDir;

    // ── Business-rule defaults ────────────────────────────────────────────
    // The reminder window and goal bounds are product rules; changing them
    // should be a deliberate decision.

    #[test]
    fn business_rule_defaults() {
        let cfg = AppConfig::default();
        assert!((cfg.tracker.standard_increment_liters - 0.2).abs() < f64::EPSILON);
        assert!((cfg.tracker.max_goal_liters - 10.0).abs() < f64::EPSILON);
        assert_eq!(cfg.reminders.inactivity_minutes, 60);
        assert_eq!(cfg.reminders.poll_interval_minutes, 5);
        assert_eq!(cfg.inactivity_window(), chrono::Duration::hours(1));
        assert_eq!(cfg.poll_interval(), Duration::from_secs(300));
    }

    #[test]
    fn cosmetic_defaults() {
        let cfg = AppConfig::default();
        assert!((cfg.tracker.default_goal_liters - 2.5).abs() < f64::EPSILON);
        assert_eq!(cfg.tracker.timezone, "UTC");
        assert_eq!(cfg.storage.path, ".hydrate/store.json");
        assert!(cfg.notifications.enabled);
        assert_eq!(cfg.telemetry.log_level, "info");
        assert_eq!(cfg.reminders.daily_times.len(), 5);
    }

    // ── load_from ──────────────────────────────────────────────────────────

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(cfg.reminders.inactivity_minutes, 60);
    }

    #[test]
    fn load_from_partial_toml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(
            &path,
            r#"
[reminders]
inactivity_minutes = 45
daily_reminders_enabled = false
"#,
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.reminders.inactivity_minutes, 45);
        assert!(!cfg.reminders.daily_reminders_enabled);
        assert_eq!(cfg.reminders.poll_interval_minutes, 5);
        assert!((cfg.tracker.standard_increment_liters - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn load_from_invalid_toml_returns_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/hydrate.toml");

        let mut cfg = AppConfig::default();
        cfg.tracker.timezone = "Europe/Berlin".to_string();
        cfg.reminders.daily_times = vec!["09:15".to_string()];
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.reminders.daily_times, vec!["09:15".to_string()]);
        assert_eq!(loaded.timezone(), chrono_tz::Europe::Berlin);
    }

    // ── Derived values ─────────────────────────────────────────────────────

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let mut cfg = AppConfig::default();
        cfg.tracker.timezone = "Mars/Olympus_Mons".to_string();
        assert_eq!(cfg.timezone(), Tz::UTC);
    }

    #[test]
    fn daily_times_are_sorted_and_malformed_entries_skipped() {
        let mut cfg = AppConfig::default();
        cfg.reminders.daily_times = vec![
            "18:00".to_string(),
            "not-a-time".to_string(),
            "08:00".to_string(),
            "25:00".to_string(),
        ];
        let times = cfg.parsed_daily_times();
        assert_eq!(times.len(), 2);
        assert_eq!(times[0].hour(), 8);
        assert_eq!(times[1].hour(), 18);
    }

    #[test]
    fn zero_poll_interval_is_clamped_to_one_minute() {
        let mut cfg = AppConfig::default();
        cfg.reminders.poll_interval_minutes = 0;
        assert_eq!(cfg.poll_interval(), Duration::from_secs(60));
    }

    // ── Env var overrides ──────────────────────────────────────────────────

    #[test]
    fn env_store_path_overrides_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("env.toml");
        fs::write(
            &path,
            r#"
[storage]
path = "from-file.json"
"#,
        )
        .unwrap();

        // SAFETY: test is single-threaded for this env var.
        unsafe { env::set_var("HYDRATE_STORE_PATH", "from-env.json") };
        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.storage.path, "from-env.json");
        unsafe { env::remove_var("HYDRATE_STORE_PATH") };
    }
}
