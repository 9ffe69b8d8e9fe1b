//! In-memory notifier that records everything it is asked to do.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::Notifier;
use crate::types::{
    ActionCategory, NotificationKind, NotificationRequest, PermissionStatus, ScheduledNotification,
};

#[derive(Debug)]
struct Inner {
    outstanding: BTreeMap<String, ScheduledNotification>,
    delivered: Vec<ScheduledNotification>,
    categories: BTreeMap<String, ActionCategory>,
    cancelled: Vec<String>,
    permission: PermissionStatus,
    grant_on_request: bool,
    failing: bool,
}

#[derive(Debug)]
pub struct RecordingNotifier {
    inner: Mutex<Inner>,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::with_permission(PermissionStatus::Granted, true)
    }
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permission starts at `permission`; a request flips it to granted only
    /// when `grant_on_request` is set.
    pub fn with_permission(permission: PermissionStatus, grant_on_request: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                outstanding: BTreeMap::new(),
                delivered: Vec::new(),
                categories: BTreeMap::new(),
                cancelled: Vec::new(),
                permission,
                grant_on_request,
                failing: false,
            }),
        }
    }

    pub fn denied() -> Self {
        Self::with_permission(PermissionStatus::Denied, false)
    }

    /// Make every subsequent call fail, as a platform error would.
    pub async fn set_failing(&self, failing: bool) {
        self.inner.lock().await.failing = failing;
    }

    /// Everything shown immediately, in order.
    pub async fn delivered(&self) -> Vec<ScheduledNotification> {
        self.inner.lock().await.delivered.clone()
    }

    pub async fn delivered_of(&self, kind: NotificationKind) -> Vec<ScheduledNotification> {
        self.inner
            .lock()
            .await
            .delivered
            .iter()
            .filter(|n| n.request.content.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn outstanding_of(&self, kind: NotificationKind) -> Vec<ScheduledNotification> {
        self.inner
            .lock()
            .await
            .outstanding
            .values()
            .filter(|n| n.request.content.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<ScheduledNotification> {
        self.inner.lock().await.outstanding.get(id).cloned()
    }

    pub async fn category(&self, id: &str) -> Option<ActionCategory> {
        self.inner.lock().await.categories.get(id).cloned()
    }

    /// Ids passed to `cancel`, in order.
    pub async fn cancelled(&self) -> Vec<String> {
        self.inner.lock().await.cancelled.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn schedule(&self, request: NotificationRequest) -> Result<String> {
        let mut inner = self.inner.lock().await;
        if inner.failing {
            bail!("notification service unavailable");
        }
        if inner.permission != PermissionStatus::Granted {
            bail!("notification permission not granted");
        }

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let scheduled = ScheduledNotification {
            id: id.clone(),
            request,
            scheduled_at: Utc::now(),
        };

        if matches!(scheduled.request.trigger, crate::Trigger::Immediate) {
            inner.delivered.push(scheduled.clone());
        }
        if scheduled.request.is_transient() {
            inner.outstanding.remove(&id);
        } else {
            inner.outstanding.insert(id.clone(), scheduled);
        }
        Ok(id)
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.failing {
            bail!("notification service unavailable");
        }
        inner.outstanding.remove(id);
        inner.cancelled.push(id.to_string());
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.failing {
            bail!("notification service unavailable");
        }
        inner.outstanding.clear();
        Ok(())
    }

    async fn set_category(&self, category: ActionCategory) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.failing {
            bail!("notification service unavailable");
        }
        inner.categories.insert(category.id.clone(), category);
        Ok(())
    }

    async fn permission_status(&self) -> Result<PermissionStatus> {
        Ok(self.inner.lock().await.permission)
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        let mut inner = self.inner.lock().await;
        if inner.grant_on_request {
            inner.permission = PermissionStatus::Granted;
        } else if inner.permission == PermissionStatus::Undetermined {
            inner.permission = PermissionStatus::Denied;
        }
        Ok(inner.permission)
    }

    async fn outstanding(&self) -> Result<Vec<ScheduledNotification>> {
        Ok(self.inner.lock().await.outstanding.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NotificationContent, Trigger};

    fn request(kind: NotificationKind, sticky: bool, trigger: Trigger) -> NotificationRequest {
        NotificationRequest::new(
            NotificationContent {
                title: "title".to_string(),
                body: "body".to_string(),
                sound: !sticky,
                sticky,
                category: None,
                kind,
            },
            trigger,
        )
    }

    #[tokio::test]
    async fn same_id_replaces_outstanding_request() {
        let notifier = RecordingNotifier::new();
        let first = request(NotificationKind::SmartReminder, false, Trigger::After { seconds: 3600 })
            .with_id("smart-reminder");
        let second = request(NotificationKind::SmartReminder, false, Trigger::After { seconds: 60 })
            .with_id("smart-reminder");

        notifier.schedule(first).await.unwrap();
        notifier.schedule(second).await.unwrap();

        let pending = notifier.outstanding_of(NotificationKind::SmartReminder).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.trigger, Trigger::After { seconds: 60 });
    }

    #[tokio::test]
    async fn transient_requests_are_delivered_not_kept() {
        let notifier = RecordingNotifier::new();
        let id = notifier
            .schedule(request(NotificationKind::Achievement, false, Trigger::Immediate))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&id).is_ok());
        assert!(notifier.outstanding().await.unwrap().is_empty());
        assert_eq!(notifier.delivered_of(NotificationKind::Achievement).await.len(), 1);
    }

    #[tokio::test]
    async fn sticky_immediate_stays_outstanding_until_cancelled() {
        let notifier = RecordingNotifier::new();
        notifier
            .schedule(
                request(NotificationKind::PersistentStatus, true, Trigger::Immediate)
                    .with_id("persistent-status"),
            )
            .await
            .unwrap();
        assert!(notifier.get("persistent-status").await.is_some());

        notifier.cancel("persistent-status").await.unwrap();
        assert!(notifier.get("persistent-status").await.is_none());
        assert_eq!(notifier.cancelled().await, vec!["persistent-status".to_string()]);
    }

    #[tokio::test]
    async fn denied_permission_rejects_schedules() {
        let notifier = RecordingNotifier::denied();
        assert_eq!(
            notifier.request_permission().await.unwrap(),
            PermissionStatus::Denied
        );
        let result = notifier
            .schedule(request(NotificationKind::Achievement, false, Trigger::Immediate))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn undetermined_permission_can_be_granted() {
        let notifier = RecordingNotifier::with_permission(PermissionStatus::Undetermined, true);
        assert_eq!(
            notifier.request_permission().await.unwrap(),
            PermissionStatus::Granted
        );
    }

    #[tokio::test]
    async fn failing_notifier_errors_everywhere() {
        let notifier = RecordingNotifier::new();
        notifier.set_failing(true).await;
        assert!(notifier.cancel("x").await.is_err());
        assert!(notifier.cancel_all().await.is_err());
        assert!(
            notifier
                .set_category(ActionCategory::status_actions())
                .await
                .is_err()
        );
    }
}
