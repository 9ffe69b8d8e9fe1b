//! Intake bookkeeping over the key-value store.
//!
//! Store failures never abort an operation: they are logged and the
//! in-memory state carries on ahead of what was persisted.

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use hydrate_store::keys::{self, encode_bool};
use hydrate_store::{KvStore, parse_bool, parse_f64, parse_millis};

use crate::error::TrackerError;
use crate::state::{TrackerState, round_liters};

#[derive(Debug, Clone, PartialEq)]
pub struct IntakeOutcome {
    pub state: TrackerState,
    /// True only on the false → true transition.
    pub just_reached_goal: bool,
    /// False when the call was a no-op (goal already reached, bad amount).
    pub applied: bool,
}

impl IntakeOutcome {
    fn unchanged(state: &TrackerState) -> Self {
        Self {
            state: state.clone(),
            just_reached_goal: false,
            applied: false,
        }
    }
}

pub struct IntakeTracker {
    store: Arc<dyn KvStore>,
    max_goal: f64,
}

impl IntakeTracker {
    pub fn new(store: Arc<dyn KvStore>, max_goal: f64) -> Self {
        Self { store, max_goal }
    }

    /// Read every key.  With no onboarding flag the pre-onboarding default is
    /// returned and the other keys are ignored.
    pub async fn load(&self) -> TrackerState {
        let mut state = TrackerState::default();

        match self.store.get(keys::IS_FIRST_LAUNCH).await {
            Ok(None) => return state,
            Ok(Some(_)) => state.is_onboarded = true,
            Err(err) => {
                warn!(?err, "load: could not read onboarding flag");
                return state;
            }
        }

        if let Some(goal) = self.read_logged(keys::DAILY_GOAL, parse_f64).await {
            state.daily_goal = goal;
        }
        if let Some(intake) = self.read_logged(keys::CURRENT_INTAKE, parse_f64).await {
            state.current_intake = intake.max(0.0);
        }
        if let Some(date) = self.read_logged(keys::LAST_RESET_DATE, decode_string).await {
            state.last_reset_date = date;
        }
        if let Some(reached) = self.read_logged(keys::GOAL_REACHED, parse_bool).await {
            state.goal_reached = reached;
        }
        if let Some(millis) = self
            .read_logged(keys::LAST_WATER_INTAKE_TIME, parse_millis)
            .await
        {
            state.last_drink = DateTime::from_timestamp_millis(millis);
        }

        debug!(
            goal = state.daily_goal,
            intake = state.current_intake,
            goal_reached = state.goal_reached,
            "tracker state loaded"
        );
        state
    }

    /// Add `amount` liters.  Reads the persisted intake, goal and goal flag
    /// first, since the caller's view may never have been loaded (a
    /// notification action handled in the background).  In-memory values are
    /// used only when the store cannot be read.
    pub async fn add_intake(
        &self,
        state: &mut TrackerState,
        amount: f64,
        now: DateTime<Utc>,
    ) -> IntakeOutcome {
        if !amount.is_finite() || amount <= 0.0 {
            warn!(amount, "add_intake: ignoring non-positive amount");
            return IntakeOutcome::unchanged(state);
        }

        let already_reached = self
            .fresh(keys::GOAL_REACHED, parse_bool, false, state.goal_reached)
            .await;
        if already_reached {
            info!("add_intake: goal already reached, not adding more water");
            return IntakeOutcome::unchanged(state);
        }

        let intake = self
            .fresh(keys::CURRENT_INTAKE, parse_f64, 0.0, state.current_intake)
            .await;
        let goal = self
            .fresh(keys::DAILY_GOAL, parse_f64, 0.0, state.daily_goal)
            .await;
        let new_intake = round_liters(intake + amount);

        state.current_intake = new_intake;
        state.daily_goal = goal;
        state.last_drink = Some(now);

        let millis = now.timestamp_millis().to_string();
        self.write(keys::CURRENT_INTAKE, &new_intake.to_string()).await;
        self.write(keys::LAST_UPDATED_TIMESTAMP, &millis).await;
        self.write(keys::LAST_WATER_INTAKE_TIME, &millis).await;

        let just_reached_goal = goal > 0.0 && new_intake >= goal;
        if just_reached_goal {
            info!(intake = new_intake, goal, "goal reached");
            state.goal_reached = true;
            self.write(keys::GOAL_REACHED, encode_bool(true)).await;
        } else {
            debug!(intake = new_intake, goal, "intake recorded");
        }

        IntakeOutcome {
            state: state.clone(),
            just_reached_goal,
            applied: true,
        }
    }

    /// Reset the day's progress when `today` differs from the persisted
    /// rollover key.  Idempotent within a day.
    pub async fn check_daily_rollover(&self, state: &mut TrackerState, today: &str) -> bool {
        let last = match self.store.get(keys::LAST_RESET_DATE).await {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                warn!(?err, "rollover: could not read last reset date, using in-memory value");
                state.last_reset_date.clone()
            }
        };
        if last == today {
            state.last_reset_date = last;
            return false;
        }

        info!(from = %last, to = %today, "daily rollover");
        state.current_intake = 0.0;
        state.goal_reached = false;
        state.last_drink = None;
        state.last_reset_date = today.to_string();

        self.write(keys::CURRENT_INTAKE, "0").await;
        self.write(keys::LAST_RESET_DATE, today).await;
        self.write(keys::GOAL_REACHED, encode_bool(false)).await;
        if let Err(err) = self.store.remove(keys::LAST_WATER_INTAKE_TIME).await {
            warn!(?err, "rollover: failed to clear last drink time");
        }
        true
    }

    pub fn validate_goal(&self, goal: f64) -> Result<(), TrackerError> {
        if !goal.is_finite() || goal <= 0.0 || goal > self.max_goal {
            return Err(TrackerError::InvalidGoal {
                value: goal,
                max: self.max_goal,
            });
        }
        Ok(())
    }

    /// Validate and persist the daily goal; marks the user onboarded.  The
    /// goal is set once: an onboarded tracker only changes it through
    /// `reset_all`.
    pub async fn set_goal(&self, state: &mut TrackerState, goal: f64) -> Result<(), TrackerError> {
        self.validate_goal(goal)?;
        if state.is_onboarded || self.onboarded_in_store().await {
            warn!(goal, "set_goal: goal already set, ignoring");
            return Err(TrackerError::AlreadyOnboarded);
        }

        self.write(keys::DAILY_GOAL, &goal.to_string()).await;
        self.write(keys::IS_FIRST_LAUNCH, encode_bool(false)).await;
        state.daily_goal = goal;
        state.is_onboarded = true;
        info!(goal, "daily goal saved");
        Ok(())
    }

    /// Clear every persisted key and return to the pre-onboarding state.
    pub async fn reset_all(&self, state: &mut TrackerState) {
        if let Err(err) = self.store.remove_many(keys::ALL).await {
            warn!(?err, "reset: failed to clear stored keys");
        }
        *state = TrackerState::default();
        info!("tracker reset to pre-onboarding state");
    }

    async fn onboarded_in_store(&self) -> bool {
        match self.store.get(keys::IS_FIRST_LAUNCH).await {
            Ok(flag) => flag.is_some(),
            Err(err) => {
                warn!(?err, "could not read onboarding flag");
                false
            }
        }
    }

    async fn write(&self, key: &str, value: &str) -> bool {
        match self.store.set(key, value).await {
            Ok(()) => true,
            Err(err) => {
                warn!(?err, key, "store write failed");
                false
            }
        }
    }

    async fn read<T, E>(&self, key: &str, decode: fn(&str, &str) -> Result<T, E>) -> Result<Option<T>>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(decode(key, &raw)?)),
            None => Ok(None),
        }
    }

    async fn read_logged<T, E>(&self, key: &str, decode: fn(&str, &str) -> Result<T, E>) -> Option<T>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self.read(key, decode).await {
            Ok(value) => value,
            Err(err) => {
                warn!(?err, key, "ignoring unreadable stored value");
                None
            }
        }
    }

    /// Persisted value, `absent` when the key is unset, or `cached` when the
    /// store cannot be read.
    async fn fresh<T, E>(
        &self,
        key: &str,
        decode: fn(&str, &str) -> Result<T, E>,
        absent: T,
        cached: T,
    ) -> T
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self.read(key, decode).await {
            Ok(Some(value)) => value,
            Ok(None) => absent,
            Err(err) => {
                warn!(?err, key, "falling back to in-memory value");
                cached
            }
        }
    }
}

fn decode_string(_key: &str, raw: &str) -> Result<String, Infallible> {
    Ok(raw.to_string())
}
