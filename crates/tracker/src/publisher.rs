//! Sticky status notification.

use std::sync::Arc;

use tracing::{debug, warn};

use hydrate_notify::{
    ActionCategory, NotificationContent, NotificationKind, NotificationRequest, Notifier,
    PERSISTENT_STATUS_ID, STATUS_CATEGORY_ID, Trigger,
};

use crate::state::percent_complete;

/// Render the status notification for the given progress.  Action buttons are
/// attached only while the goal is still open.
pub fn render_status(intake: f64, goal: f64, goal_reached: bool) -> NotificationContent {
    let remaining = (goal - intake).max(0.0);
    let percent = percent_complete(intake, goal);
    let body = if goal_reached {
        "🎉 Goal achieved! Great job staying hydrated!".to_string()
    } else {
        format!("Remaining: {remaining:.1}L ({percent:.0}% complete)")
    };

    NotificationContent {
        title: format!("💧 {intake:.1}L / {goal}L"),
        body,
        sound: false,
        sticky: true,
        category: (!goal_reached).then(|| STATUS_CATEGORY_ID.to_string()),
        kind: NotificationKind::PersistentStatus,
    }
}

pub struct StatusPublisher {
    notifier: Arc<dyn Notifier>,
}

impl StatusPublisher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Re-create the status notification.  Returns `false` if the host
    /// refused it; the failure is logged and otherwise ignored.
    pub async fn publish(&self, intake: f64, goal: f64, goal_reached: bool) -> bool {
        if let Err(err) = self.notifier.cancel(PERSISTENT_STATUS_ID).await {
            warn!(?err, "failed to cancel previous status notification");
        }

        if !goal_reached {
            if let Err(err) = self
                .notifier
                .set_category(ActionCategory::status_actions())
                .await
            {
                warn!(?err, "failed to register status actions");
            }
        }

        let request = NotificationRequest::new(
            render_status(intake, goal, goal_reached),
            Trigger::Immediate,
        )
        .with_id(PERSISTENT_STATUS_ID);

        match self.notifier.schedule(request).await {
            Ok(_) => {
                debug!(intake, goal, goal_reached, "status notification published");
                true
            }
            Err(err) => {
                warn!(?err, "failed to publish status notification");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hydrate_notify::RecordingNotifier;

    use super::*;

    #[test]
    fn open_goal_shows_remaining_and_actions() {
        let content = render_status(1.0, 2.5, false);
        assert_eq!(content.title, "💧 1.0L / 2.5L");
        assert_eq!(content.body, "Remaining: 1.5L (40% complete)");
        assert_eq!(content.category.as_deref(), Some(STATUS_CATEGORY_ID));
        assert!(content.sticky);
        assert!(!content.sound);
    }

    #[test]
    fn reached_goal_drops_actions() {
        let content = render_status(2.2, 2.0, true);
        assert_eq!(content.title, "💧 2.2L / 2L");
        assert!(content.body.contains("Goal achieved"));
        assert_eq!(content.category, None);
    }

    #[test]
    fn zero_goal_renders_zero_percent() {
        let content = render_status(0.0, 0.0, false);
        assert_eq!(content.body, "Remaining: 0.0L (0% complete)");
    }

    #[tokio::test]
    async fn republishing_keeps_a_single_status() {
        let notifier = Arc::new(RecordingNotifier::new());
        let publisher = StatusPublisher::new(notifier.clone());

        assert!(publisher.publish(0.2, 2.0, false).await);
        assert!(publisher.publish(0.4, 2.0, false).await);

        let outstanding = notifier.outstanding_of(NotificationKind::PersistentStatus).await;
        assert_eq!(outstanding.len(), 1);
        assert_eq!(outstanding[0].id, PERSISTENT_STATUS_ID);
        assert_eq!(outstanding[0].request.content.title, "💧 0.4L / 2L");
        assert!(notifier.category(STATUS_CATEGORY_ID).await.is_some());
        assert_eq!(
            notifier.cancelled().await,
            vec![PERSISTENT_STATUS_ID.to_string(), PERSISTENT_STATUS_ID.to_string()]
        );
    }

    #[tokio::test]
    async fn denied_permission_is_swallowed() {
        let notifier = Arc::new(RecordingNotifier::denied());
        let publisher = StatusPublisher::new(notifier.clone());
        assert!(!publisher.publish(0.2, 2.0, false).await);
        assert!(notifier.outstanding().await.unwrap().is_empty());
    }
}
