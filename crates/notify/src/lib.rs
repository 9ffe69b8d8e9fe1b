//! Host notification service abstraction.
//!
//! Backends decide how a notification actually reaches the user; the tracker
//! only ever talks to the [`Notifier`] trait.

pub mod outbox;
pub mod recording;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

pub use outbox::OutboxNotifier;
pub use recording::RecordingNotifier;
pub use types::{
    ACTION_ADD_STANDARD, ACTION_DISMISS, ActionCategory, NotificationAction, NotificationContent,
    NotificationKind, NotificationRequest, PERSISTENT_STATUS_ID, PermissionStatus,
    REMINDER_CATEGORY_ID, SMART_REMINDER_ID, STATUS_CATEGORY_ID, ScheduledNotification, Trigger,
};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the id the request was filed under (the caller's id, or a
    /// generated one).
    async fn schedule(&self, request: NotificationRequest) -> Result<String>;

    /// Cancelling an id that is not outstanding is not an error.
    async fn cancel(&self, id: &str) -> Result<()>;

    async fn cancel_all(&self) -> Result<()>;

    async fn set_category(&self, category: ActionCategory) -> Result<()>;

    async fn permission_status(&self) -> Result<PermissionStatus>;

    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Requests still pending or still on screen.
    async fn outstanding(&self) -> Result<Vec<ScheduledNotification>>;
}
