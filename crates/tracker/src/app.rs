//! Single entry point for every mutation: UI taps, notification actions, and
//! the foreground poll all land here so the tracker, the reminder slot and
//! the status notification move together.

use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use hydrate_config::AppConfig;
use hydrate_notify::{
    ACTION_ADD_STANDARD, ACTION_DISMISS, NotificationContent, NotificationKind,
    NotificationRequest, Notifier, PermissionStatus, Trigger,
};
use hydrate_store::keys;
use hydrate_store::{KvStore, parse_bool, parse_millis};

use crate::clock::Clock;
use crate::daily::DailyReminders;
use crate::error::TrackerError;
use crate::publisher::StatusPublisher;
use crate::reconciler::{Reconciler, Reconciliation};
use crate::scheduler::{ReminderScheduler, ReminderSlot};
use crate::state::{TrackerState, date_key};
use crate::tracker::{IntakeOutcome, IntakeTracker};

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    StateChanged(TrackerState),
    GoalReached,
    ReminderFired,
    /// Emitted at most once per process, the first time permission is refused.
    PermissionDenied,
    Reset,
}

/// What a foreground transition or poll tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForegroundPass {
    pub reconciled: Reconciliation,
    pub rolled_over: bool,
    pub reminder: ReminderSlot,
}

pub struct HydrationApp {
    store: Arc<dyn KvStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    increment: f64,
    daily_enabled: bool,
    tracker: IntakeTracker,
    scheduler: ReminderScheduler,
    publisher: StatusPublisher,
    reconciler: Reconciler,
    daily: DailyReminders,
    state: TrackerState,
    loaded: bool,
    permission_prompted: bool,
    events: Vec<AppEvent>,
}

impl HydrationApp {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn KvStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tracker: IntakeTracker::new(store.clone(), config.tracker.max_goal_liters),
            scheduler: ReminderScheduler::new(notifier.clone(), config.inactivity_window()),
            publisher: StatusPublisher::new(notifier.clone()),
            reconciler: Reconciler::new(),
            daily: DailyReminders::new(notifier.clone(), config.parsed_daily_times()),
            tz: config.timezone(),
            increment: config.tracker.standard_increment_liters,
            daily_enabled: config.reminders.daily_reminders_enabled,
            store,
            notifier,
            clock,
            state: TrackerState::default(),
            loaded: false,
            permission_prompted: false,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn reminder_slot(&self) -> ReminderSlot {
        self.scheduler.slot()
    }

    pub fn today_key(&self) -> String {
        date_key(self.clock.now(), self.tz)
    }

    pub fn drain_events(&mut self) -> Vec<AppEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read persisted state into the view and roll the day over if needed.
    pub async fn load(&mut self) -> &TrackerState {
        self.state = self.tracker.load().await;
        self.loaded = true;
        self.reconciler
            .record_write(self.state.current_intake, self.state.goal_reached);
        if !self.check_daily_rollover().await {
            self.events.push(AppEvent::StateChanged(self.state.clone()));
        }
        &self.state
    }

    async fn ensure_loaded(&mut self) {
        if !self.loaded {
            self.load().await;
        }
    }

    /// Check, then request, notification permission.  Tracking works either
    /// way; a refusal is surfaced once.
    pub async fn ensure_permission(&mut self) -> bool {
        let status = match self.notifier.permission_status().await {
            Ok(status) => status,
            Err(err) => {
                warn!(?err, "could not query notification permission");
                PermissionStatus::Undetermined
            }
        };
        if status == PermissionStatus::Granted {
            return true;
        }

        let status = match self.notifier.request_permission().await {
            Ok(status) => status,
            Err(err) => {
                warn!(?err, "notification permission request failed");
                PermissionStatus::Denied
            }
        };
        if status == PermissionStatus::Granted {
            return true;
        }

        if !self.permission_prompted {
            self.permission_prompted = true;
            info!("notification permission denied; reminders disabled");
            self.events.push(AppEvent::PermissionDenied);
        }
        false
    }

    /// Save the daily goal and start reminding.  Rejected goals change nothing.
    pub async fn set_goal(&mut self, goal: f64) -> Result<(), TrackerError> {
        self.tracker.validate_goal(goal)?;
        self.ensure_loaded().await;
        self.tracker.set_goal(&mut self.state, goal).await?;
        self.check_daily_rollover().await;

        if self.ensure_permission().await && self.daily_enabled {
            if let Err(err) = self.notifier.cancel_all().await {
                warn!(?err, "failed to clear notifications before scheduling");
            }
            self.scheduler.forget();
            self.daily.schedule_all().await;
        }

        self.publish_status().await;
        self.evaluate_reminder().await;
        self.events.push(AppEvent::StateChanged(self.state.clone()));
        Ok(())
    }

    pub async fn add_standard(&mut self) -> Result<IntakeOutcome, TrackerError> {
        self.add_water(self.increment).await
    }

    /// The one "add water" path shared by the UI and notification actions.
    pub async fn add_water(&mut self, amount: f64) -> Result<IntakeOutcome, TrackerError> {
        self.ensure_loaded().await;
        if !self.state.is_onboarded {
            return Err(TrackerError::NotOnboarded);
        }
        self.check_daily_rollover().await;

        let now = self.clock.now();
        let outcome = self.tracker.add_intake(&mut self.state, amount, now).await;
        if !outcome.applied {
            return Ok(outcome);
        }
        self.reconciler
            .record_write(self.state.current_intake, self.state.goal_reached);

        if outcome.just_reached_goal {
            self.scheduler.evaluate(now, Some(now), true).await;
            self.announce_goal().await;
            self.daily.cancel_all().await;
            self.events.push(AppEvent::GoalReached);
        } else {
            self.scheduler.evaluate(now, Some(now), false).await;
        }

        self.publish_status().await;
        self.events.push(AppEvent::StateChanged(self.state.clone()));
        Ok(outcome)
    }

    /// Handle a button pressed on a notification.  Unknown actions are
    /// ignored.
    pub async fn handle_action(&mut self, action_id: &str) -> Result<Option<IntakeOutcome>, TrackerError> {
        match action_id {
            ACTION_ADD_STANDARD => {
                info!("adding standard increment from notification");
                self.add_standard().await.map(Some)
            }
            ACTION_DISMISS => {
                debug!("notification dismissed");
                Ok(None)
            }
            other => {
                warn!(action = other, "ignoring unknown notification action");
                Ok(None)
            }
        }
    }

    /// Reset progress if the calendar day changed since the last rollover.
    pub async fn check_daily_rollover(&mut self) -> bool {
        if !self.state.is_onboarded {
            return false;
        }
        let today = self.today_key();
        if !self.tracker.check_daily_rollover(&mut self.state, &today).await {
            return false;
        }

        self.scheduler.cancel().await;
        self.reconciler.record_write(0.0, false);
        self.publish_status().await;
        self.events.push(AppEvent::StateChanged(self.state.clone()));
        true
    }

    /// Re-evaluate the inactivity reminder against persisted drink time and
    /// goal flag.
    pub async fn evaluate_reminder(&mut self) -> ReminderSlot {
        if !self.state.is_onboarded {
            self.scheduler.cancel().await;
            return self.scheduler.slot();
        }

        let last_drink = match self.store.get(keys::LAST_WATER_INTAKE_TIME).await {
            Ok(Some(raw)) => match parse_millis(keys::LAST_WATER_INTAKE_TIME, &raw) {
                Ok(millis) => DateTime::from_timestamp_millis(millis),
                Err(err) => {
                    warn!(%err, "treating unreadable drink time as absent");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(?err, "could not read last drink time, using in-memory value");
                self.state.last_drink
            }
        };
        let goal_reached = match self.store.get(keys::GOAL_REACHED).await {
            Ok(Some(raw)) => parse_bool(keys::GOAL_REACHED, &raw).unwrap_or(self.state.goal_reached),
            Ok(None) => false,
            Err(err) => {
                warn!(?err, "could not read goal flag, using in-memory value");
                self.state.goal_reached
            }
        };

        let slot = self
            .scheduler
            .evaluate(self.clock.now(), last_drink, goal_reached)
            .await;
        if slot == ReminderSlot::FiredAwaitingNext {
            self.events.push(AppEvent::ReminderFired);
        }
        slot
    }

    /// Run on every foreground transition and every poll tick while active.
    pub async fn foreground_pass(&mut self) -> ForegroundPass {
        self.ensure_loaded().await;

        let reconciled = self
            .reconciler
            .reconcile(self.store.as_ref(), &mut self.state)
            .await;
        if reconciled.any() {
            self.publish_status().await;
            self.events.push(AppEvent::StateChanged(self.state.clone()));
        }

        let rolled_over = self.check_daily_rollover().await;
        let reminder = self.evaluate_reminder().await;

        ForegroundPass {
            reconciled,
            rolled_over,
            reminder,
        }
    }

    /// Wipe every persisted key and every notification, then show a fresh
    /// zero-state status.
    pub async fn reset_all(&mut self) {
        self.tracker.reset_all(&mut self.state).await;
        if let Err(err) = self.notifier.cancel_all().await {
            warn!(?err, "failed to cancel notifications on reset");
        }
        self.scheduler.forget();
        self.publisher.publish(0.0, 0.0, false).await;
        self.reconciler = Reconciler::new();
        self.loaded = true;
        self.events.push(AppEvent::Reset);
        self.events.push(AppEvent::StateChanged(self.state.clone()));
    }

    pub async fn publish_status(&self) -> bool {
        if !self.state.is_onboarded || self.state.daily_goal <= 0.0 {
            return false;
        }
        self.publisher
            .publish(
                self.state.current_intake,
                self.state.daily_goal,
                self.state.goal_reached,
            )
            .await
    }

    async fn announce_goal(&self) {
        let request = NotificationRequest::new(
            NotificationContent {
                title: "🎉 Goal Achieved!".to_string(),
                body: "Congratulations! You've reached your daily water intake goal!".to_string(),
                sound: true,
                sticky: false,
                category: None,
                kind: NotificationKind::Achievement,
            },
            Trigger::Immediate,
        );
        if let Err(err) = self.notifier.schedule(request).await {
            warn!(?err, "failed to show achievement notification");
        }
    }
}
