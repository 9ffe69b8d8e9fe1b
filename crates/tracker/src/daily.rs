//! Fixed time-of-day educational reminders.

use std::sync::Arc;

use chrono::{NaiveTime, Timelike};
use tracing::{info, warn};

use hydrate_notify::{
    ActionCategory, NotificationContent, NotificationKind, NotificationRequest, Notifier,
    REMINDER_CATEGORY_ID, Trigger,
};

use crate::facts::random_fact;

pub struct DailyReminders {
    notifier: Arc<dyn Notifier>,
    times: Vec<NaiveTime>,
}

impl DailyReminders {
    pub fn new(notifier: Arc<dyn Notifier>, times: Vec<NaiveTime>) -> Self {
        Self { notifier, times }
    }

    pub fn id_for(time: NaiveTime) -> String {
        format!("daily-{:02}{:02}", time.hour(), time.minute())
    }

    /// Register the reminder actions and schedule one repeating reminder per
    /// configured time.  Returns how many were accepted.
    pub async fn schedule_all(&self) -> usize {
        if let Err(err) = self
            .notifier
            .set_category(ActionCategory::reminder_actions())
            .await
        {
            warn!(?err, "failed to register reminder actions");
        }

        let mut scheduled = 0;
        for time in &self.times {
            let request = NotificationRequest::new(
                NotificationContent {
                    title: title_for(*time).to_string(),
                    body: random_fact().to_string(),
                    sound: true,
                    sticky: false,
                    category: Some(REMINDER_CATEGORY_ID.to_string()),
                    kind: NotificationKind::DailyReminder,
                },
                Trigger::Daily {
                    hour: time.hour(),
                    minute: time.minute(),
                },
            )
            .with_id(Self::id_for(*time));

            match self.notifier.schedule(request).await {
                Ok(id) => {
                    info!(%id, "daily reminder scheduled");
                    scheduled += 1;
                }
                Err(err) => warn!(?err, time = %time, "failed to schedule daily reminder"),
            }
        }
        scheduled
    }

    pub async fn cancel_all(&self) {
        for time in &self.times {
            let id = Self::id_for(*time);
            if let Err(err) = self.notifier.cancel(&id).await {
                warn!(?err, %id, "failed to cancel daily reminder");
            }
        }
    }
}

fn title_for(time: NaiveTime) -> &'static str {
    match time.hour() {
        0..=9 => "Good Morning! ☀️",
        10..=11 => "Hydration Check! 💧",
        12..=13 => "Lunch Hydration! 🍽️",
        14..=16 => "Afternoon Hydration! 🌤️",
        _ => "Evening Hydration! 🌅",
    }
}
