use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sticky status notification mirroring tracker state.  Always re-created,
/// never updated in place.
pub const PERSISTENT_STATUS_ID: &str = "persistent-status";
/// The single outstanding inactivity reminder.
pub const SMART_REMINDER_ID: &str = "smart-reminder";

pub const STATUS_CATEGORY_ID: &str = "persistent-status-actions";
pub const REMINDER_CATEGORY_ID: &str = "water-reminder-actions";

pub const ACTION_ADD_STANDARD: &str = "add-200ml";
pub const ACTION_DISMISS: &str = "dismiss";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PersistentStatus,
    SmartReminder,
    DailyReminder,
    Achievement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub sound: bool,
    /// Non-dismissible by the user.
    pub sticky: bool,
    /// Action category shown as buttons, if any.
    pub category: Option<String>,
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    Immediate,
    After { seconds: u64 },
    /// Repeats every day at the given local time.
    Daily { hour: u32, minute: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Caller-supplied id.  Scheduling with an id that is already outstanding
    /// replaces the earlier request.
    pub id: Option<String>,
    pub content: NotificationContent,
    pub trigger: Trigger,
}

impl NotificationRequest {
    pub fn new(content: NotificationContent, trigger: Trigger) -> Self {
        Self {
            id: None,
            content,
            trigger,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Shown once and gone: nothing remains outstanding after delivery.
    pub fn is_transient(&self) -> bool {
        matches!(self.trigger, Trigger::Immediate) && !self.content.sticky
    }
}

/// A request the notifier accepted, with the id it was filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub id: String,
    pub request: NotificationRequest,
    pub scheduled_at: DateTime<Utc>,
}

impl ScheduledNotification {
    /// When a one-shot request is due.  `None` for repeating triggers.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        match self.request.trigger {
            Trigger::Immediate => Some(self.scheduled_at),
            Trigger::After { seconds } => {
                Some(self.scheduled_at + chrono::Duration::seconds(seconds as i64))
            }
            Trigger::Daily { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub title: String,
    pub destructive: bool,
    pub opens_app: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCategory {
    pub id: String,
    pub actions: Vec<NotificationAction>,
}

impl ActionCategory {
    fn hydration(id: &str) -> Self {
        Self {
            id: id.to_string(),
            actions: vec![
                NotificationAction {
                    id: ACTION_ADD_STANDARD.to_string(),
                    title: "+200ml".to_string(),
                    destructive: false,
                    opens_app: false,
                },
                NotificationAction {
                    id: ACTION_DISMISS.to_string(),
                    title: "Dismiss".to_string(),
                    destructive: true,
                    opens_app: false,
                },
            ],
        }
    }

    pub fn status_actions() -> Self {
        Self::hydration(STATUS_CATEGORY_ID)
    }

    pub fn reminder_actions() -> Self {
        Self::hydration(REMINDER_CATEGORY_ID)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}
