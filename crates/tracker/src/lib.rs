//! Hydration tracking core: intake bookkeeping, the inactivity reminder, the
//! sticky status notification, and reconciliation of state written while no
//! UI was running.
//!
//! Every entry point (UI button, notification action, foreground poll) goes
//! through [`HydrationApp`], which owns the live [`TrackerState`] and funnels
//! mutations through [`IntakeTracker`].

pub mod app;
pub mod clock;
pub mod daily;
pub mod error;
pub mod facts;
pub mod publisher;
pub mod reconciler;
pub mod scheduler;
pub mod state;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{AppEvent, ForegroundPass, HydrationApp};
pub use clock::{Clock, ManualClock, SystemClock};
pub use daily::DailyReminders;
pub use error::TrackerError;
pub use publisher::{StatusPublisher, render_status};
pub use reconciler::{Reconciler, Reconciliation};
pub use scheduler::{ReminderScheduler, ReminderSlot};
pub use state::{TrackerState, date_key};
pub use tracker::{IntakeOutcome, IntakeTracker};
