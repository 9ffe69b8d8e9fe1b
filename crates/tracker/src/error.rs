use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TrackerError {
    #[error("Please enter a goal between 0.1 and {max} liters (got {value})")]
    InvalidGoal { value: f64, max: f64 },

    #[error("no daily goal has been set yet; run setup first")]
    NotOnboarded,

    #[error("a daily goal is already set; reset to choose a new one")]
    AlreadyOnboarded,
}
