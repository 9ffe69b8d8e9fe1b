//! Inactivity reminder.
//!
//! One logical slot, filed under [`SMART_REMINDER_ID`].  Every change is
//! cancel-then-create under that id, so at most one reminder is ever
//! outstanding.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use hydrate_notify::{
    ActionCategory, NotificationContent, NotificationKind, NotificationRequest, Notifier,
    REMINDER_CATEGORY_ID, SMART_REMINDER_ID, Trigger,
};

use crate::facts::random_fact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderSlot {
    /// Nothing pending: goal reached, not onboarded, or scheduling failed.
    Idle,
    /// One reminder due at the given instant.
    PendingAt(DateTime<Utc>),
    /// A reminder was just shown; the next evaluation decides what follows.
    FiredAwaitingNext,
}

pub struct ReminderScheduler {
    notifier: Arc<dyn Notifier>,
    window: Duration,
    slot: ReminderSlot,
    category_registered: bool,
}

impl ReminderScheduler {
    pub fn new(notifier: Arc<dyn Notifier>, window: Duration) -> Self {
        Self {
            notifier,
            window,
            slot: ReminderSlot::Idle,
            category_registered: false,
        }
    }

    pub fn slot(&self) -> ReminderSlot {
        self.slot
    }

    /// Decide from the last drink whether to remind now, later, or not at all.
    pub async fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        last_drink: Option<DateTime<Utc>>,
        goal_reached: bool,
    ) -> ReminderSlot {
        if goal_reached {
            self.cancel().await;
            return self.slot;
        }

        let Some(last_drink) = last_drink else {
            debug!("no drink recorded yet, reminding after a full window");
            let trigger = Trigger::After {
                seconds: whole_seconds(self.window),
            };
            self.slot = self
                .replace(trigger, ReminderSlot::PendingAt(now + self.window))
                .await;
            return self.slot;
        };

        // A drink stamped in the future (clock skew) counts as "just now".
        let last_drink = last_drink.min(now);
        let elapsed = now - last_drink;
        if elapsed >= self.window {
            info!(
                inactive_minutes = elapsed.num_minutes(),
                "inactivity window exceeded, reminding now"
            );
            self.slot = self.replace(Trigger::Immediate, ReminderSlot::FiredAwaitingNext).await;
        } else {
            let remaining = self.window - elapsed;
            debug!(
                remaining_minutes = remaining.num_minutes(),
                "deferring reminder until the window closes"
            );
            self.slot = self
                .replace(
                    Trigger::After { seconds: whole_seconds(remaining) },
                    ReminderSlot::PendingAt(last_drink + self.window),
                )
                .await;
        }
        self.slot
    }

    /// Cancel any pending reminder and go idle.
    pub async fn cancel(&mut self) {
        if let Err(err) = self.notifier.cancel(SMART_REMINDER_ID).await {
            warn!(?err, "failed to cancel smart reminder");
        }
        self.slot = ReminderSlot::Idle;
    }

    /// Go idle without touching the notifier, for when everything was
    /// already cancelled wholesale.
    pub fn forget(&mut self) {
        self.slot = ReminderSlot::Idle;
    }

    async fn replace(&mut self, trigger: Trigger, on_success: ReminderSlot) -> ReminderSlot {
        if !self.category_registered {
            match self.notifier.set_category(ActionCategory::reminder_actions()).await {
                Ok(()) => self.category_registered = true,
                Err(err) => warn!(?err, "failed to register reminder actions"),
            }
        }

        if let Err(err) = self.notifier.cancel(SMART_REMINDER_ID).await {
            warn!(?err, "failed to cancel previous smart reminder");
        }
        let request = NotificationRequest::new(reminder_content(), trigger).with_id(SMART_REMINDER_ID);
        match self.notifier.schedule(request).await {
            Ok(_) => on_success,
            Err(err) => {
                warn!(?err, "failed to schedule smart reminder");
                ReminderSlot::Idle
            }
        }
    }
}

fn reminder_content() -> NotificationContent {
    NotificationContent {
        title: "💧 Time to Hydrate!".to_string(),
        body: random_fact().to_string(),
        sound: true,
        sticky: false,
        category: Some(REMINDER_CATEGORY_ID.to_string()),
        kind: NotificationKind::SmartReminder,
    }
}

fn whole_seconds(duration: Duration) -> u64 {
    let millis = duration.num_milliseconds().max(0) as f64;
    ((millis / 1000.0).round() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hydrate_notify::{NotificationKind, RecordingNotifier, SMART_REMINDER_ID, Trigger};

    use super::*;
    use crate::testing::morning;

    fn scheduler() -> (Arc<RecordingNotifier>, ReminderScheduler) {
        let notifier = Arc::new(RecordingNotifier::new());
        let scheduler = ReminderScheduler::new(notifier.clone(), Duration::hours(1));
        (notifier, scheduler)
    }

    #[tokio::test]
    async fn seventy_minutes_idle_fires_now() {
        let (notifier, mut scheduler) = scheduler();
        let now = morning();

        let slot = scheduler
            .evaluate(now, Some(now - Duration::minutes(70)), false)
            .await;

        assert_eq!(slot, ReminderSlot::FiredAwaitingNext);
        assert_eq!(notifier.delivered_of(NotificationKind::SmartReminder).await.len(), 1);
        assert!(notifier.outstanding_of(NotificationKind::SmartReminder).await.is_empty());
    }

    #[tokio::test]
    async fn ten_minutes_idle_schedules_fifty_minutes_out() {
        let (notifier, mut scheduler) = scheduler();
        let now = morning();
        let last = now - Duration::minutes(10);

        scheduler.evaluate(now - Duration::minutes(30), None, false).await;
        let slot = scheduler.evaluate(now, Some(last), false).await;

        assert_eq!(slot, ReminderSlot::PendingAt(last + Duration::hours(1)));
        let pending = notifier.outstanding_of(NotificationKind::SmartReminder).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, SMART_REMINDER_ID);
        assert_eq!(pending[0].request.trigger, Trigger::After { seconds: 50 * 60 });
        assert!(notifier.delivered().await.is_empty());
    }

    #[tokio::test]
    async fn no_drink_yet_waits_a_full_window() {
        let (notifier, mut scheduler) = scheduler();
        let slot = scheduler.evaluate(morning(), None, false).await;

        assert_eq!(slot, ReminderSlot::PendingAt(morning() + Duration::hours(1)));
        let pending = notifier.get(SMART_REMINDER_ID).await.unwrap();
        assert_eq!(pending.request.trigger, Trigger::After { seconds: 3600 });
        assert_eq!(
            pending.request.content.category.as_deref(),
            Some(REMINDER_CATEGORY_ID)
        );
        assert!(notifier.category(REMINDER_CATEGORY_ID).await.is_some());
    }

    #[tokio::test]
    async fn goal_reached_cancels_and_idles() {
        let (notifier, mut scheduler) = scheduler();
        scheduler.evaluate(morning(), None, false).await;

        let slot = scheduler.evaluate(morning(), Some(morning()), true).await;
        assert_eq!(slot, ReminderSlot::Idle);
        assert!(notifier.outstanding().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn at_most_one_reminder_across_any_sequence() {
        let (notifier, mut scheduler) = scheduler();
        let start = morning();
        let drinks = [None, Some(0), Some(5), Some(-90), None, Some(20), Some(-61)];

        for (step, offset) in drinks.iter().enumerate() {
            let now = start + Duration::minutes(step as i64 * 7);
            let last = offset.map(|m| now + Duration::minutes(m.min(0)));
            scheduler.evaluate(now, last, false).await;
            assert!(notifier.outstanding_of(NotificationKind::SmartReminder).await.len() <= 1);
        }
    }

    #[tokio::test]
    async fn future_drink_time_counts_as_just_now() {
        let (notifier, mut scheduler) = scheduler();
        let now = morning();
        scheduler
            .evaluate(now, Some(now + Duration::minutes(3)), false)
            .await;
        let pending = notifier.get(SMART_REMINDER_ID).await.unwrap();
        assert_eq!(pending.request.trigger, Trigger::After { seconds: 3600 });
    }

    #[tokio::test]
    async fn scheduling_failure_leaves_slot_idle() {
        let (notifier, mut scheduler) = scheduler();
        notifier.set_failing(true).await;
        let slot = scheduler.evaluate(morning(), None, false).await;
        assert_eq!(slot, ReminderSlot::Idle);
    }

    #[test]
    fn whole_seconds_rounds_and_never_hits_zero() {
        assert_eq!(whole_seconds(Duration::milliseconds(1_499)), 1);
        assert_eq!(whole_seconds(Duration::milliseconds(2_500)), 3);
        assert_eq!(whole_seconds(Duration::zero()), 1);
    }
}
