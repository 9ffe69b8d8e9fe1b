//! Persisted key names and their string encodings.

use thiserror::Error;

pub const DAILY_GOAL: &str = "dailyGoal";
pub const CURRENT_INTAKE: &str = "currentIntake";
pub const LAST_RESET_DATE: &str = "lastResetDate";
/// Absent until the first goal is saved, then `"false"`.
pub const IS_FIRST_LAUNCH: &str = "isFirstLaunch";
pub const GOAL_REACHED: &str = "goalReached";
pub const LAST_WATER_INTAKE_TIME: &str = "lastWaterIntakeTime";
/// Advisory only; nothing reads it back for decisions.
pub const LAST_UPDATED_TIMESTAMP: &str = "lastUpdatedTimestamp";

pub const ALL: &[&str] = &[
    DAILY_GOAL,
    CURRENT_INTAKE,
    LAST_RESET_DATE,
    GOAL_REACHED,
    IS_FIRST_LAUNCH,
    LAST_WATER_INTAKE_TIME,
    LAST_UPDATED_TIMESTAMP,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("value for '{key}' is not a number: {raw:?}")]
    InvalidNumber { key: String, raw: String },

    #[error("value for '{key}' is not a boolean: {raw:?}")]
    InvalidBool { key: String, raw: String },
}

pub fn parse_f64(key: &str, raw: &str) -> Result<f64, StoreError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| StoreError::InvalidNumber {
            key: key.to_string(),
            raw: raw.to_string(),
        })
}

pub fn parse_millis(key: &str, raw: &str) -> Result<i64, StoreError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| StoreError::InvalidNumber {
            key: key.to_string(),
            raw: raw.to_string(),
        })
}

pub fn parse_bool(key: &str, raw: &str) -> Result<bool, StoreError> {
    match raw.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(StoreError::InvalidBool {
            key: key.to_string(),
            raw: raw.to_string(),
        }),
    }
}

pub fn encode_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
