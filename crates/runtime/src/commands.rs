use tokio::sync::oneshot;

use hydrate_tracker::{IntakeOutcome, TrackerError, TrackerState};

pub type Reply<T> = oneshot::Sender<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Foreground,
    Background,
}

#[derive(Debug)]
pub enum RuntimeCommand {
    /// `None` adds the configured standard increment.
    AddWater {
        amount: Option<f64>,
        reply: Reply<Result<IntakeOutcome, TrackerError>>,
    },
    SetGoal {
        goal: f64,
        reply: Reply<Result<(), TrackerError>>,
    },
    NotificationAction {
        action_id: String,
        reply: Reply<Result<Option<IntakeOutcome>, TrackerError>>,
    },
    Lifecycle(Lifecycle),
    Status(Reply<TrackerState>),
    Reset(Reply<()>),
}
