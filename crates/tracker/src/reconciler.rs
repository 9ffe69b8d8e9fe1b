//! Pulls state written behind the view's back (notification actions, another
//! process) into the live view.
//!
//! A stored value is merged only when it differs from both the live value and
//! the last value this instance wrote or merged.  Convergence is by storage
//! content; there is no per-write version.

use chrono::DateTime;
use tracing::{debug, warn};

use hydrate_store::keys;
use hydrate_store::{KvStore, parse_bool, parse_f64, parse_millis};

use crate::state::TrackerState;

/// Intake differences at or below this are treated as equal.
const INTAKE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub intake_changed: bool,
    pub goal_reached_changed: bool,
}

impl Reconciliation {
    pub fn any(&self) -> bool {
        self.intake_changed || self.goal_reached_changed
    }
}

#[derive(Debug, Default)]
pub struct Reconciler {
    last_synced_intake: Option<f64>,
    last_synced_goal_reached: Option<bool>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a value this instance just persisted, so reading it back later
    /// is not mistaken for an external change.
    pub fn record_write(&mut self, intake: f64, goal_reached: bool) {
        self.last_synced_intake = Some(intake);
        self.last_synced_goal_reached = Some(goal_reached);
    }

    pub async fn reconcile(&mut self, store: &dyn KvStore, state: &mut TrackerState) -> Reconciliation {
        let mut result = Reconciliation::default();

        match store.get(keys::CURRENT_INTAKE).await {
            Ok(Some(raw)) => match parse_f64(keys::CURRENT_INTAKE, &raw) {
                Ok(stored) if self.intake_diverged(stored, state.current_intake) => {
                    debug!(from = state.current_intake, to = stored, "merging intake from storage");
                    state.current_intake = stored;
                    self.last_synced_intake = Some(stored);
                    result.intake_changed = true;
                    merge_last_drink(store, state).await;
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "reconcile: unreadable intake"),
            },
            Ok(None) => {}
            Err(err) => warn!(?err, "reconcile: failed to read intake"),
        }

        match store.get(keys::GOAL_REACHED).await {
            Ok(Some(raw)) => match parse_bool(keys::GOAL_REACHED, &raw) {
                Ok(stored)
                    if stored != state.goal_reached
                        && Some(stored) != self.last_synced_goal_reached =>
                {
                    debug!(from = state.goal_reached, to = stored, "merging goal flag from storage");
                    state.goal_reached = stored;
                    self.last_synced_goal_reached = Some(stored);
                    result.goal_reached_changed = true;
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "reconcile: unreadable goal flag"),
            },
            Ok(None) => {}
            Err(err) => warn!(?err, "reconcile: failed to read goal flag"),
        }

        result
    }

    fn intake_diverged(&self, stored: f64, live: f64) -> bool {
        (stored - live).abs() > INTAKE_TOLERANCE && Some(stored) != self.last_synced_intake
    }
}

/// The drink time travels with the intake that produced it.  An absent key
/// means a rollover cleared it.
async fn merge_last_drink(store: &dyn KvStore, state: &mut TrackerState) {
    match store.get(keys::LAST_WATER_INTAKE_TIME).await {
        Ok(Some(raw)) => match parse_millis(keys::LAST_WATER_INTAKE_TIME, &raw) {
            Ok(millis) => state.last_drink = DateTime::from_timestamp_millis(millis),
            Err(err) => warn!(%err, "reconcile: unreadable drink time"),
        },
        Ok(None) => state.last_drink = None,
        Err(err) => warn!(?err, "reconcile: failed to read drink time"),
    }
}

#[cfg(test)]
mod tests {
    use hydrate_store::MemoryKvStore;

    use super::*;

    fn live(intake: f64, goal_reached: bool) -> TrackerState {
        TrackerState {
            daily_goal: 2.0,
            current_intake: intake,
            goal_reached,
            is_onboarded: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn background_write_is_merged_once() {
        let store = MemoryKvStore::new();
        let mut reconciler = Reconciler::new();
        let mut state = live(0.4, false);
        reconciler.record_write(0.4, false);

        store.set(keys::CURRENT_INTAKE, "0.6").await.unwrap();
        let first = reconciler.reconcile(&store, &mut state).await;
        assert!(first.intake_changed);
        assert!(!first.goal_reached_changed);
        assert_eq!(state.current_intake, 0.6);

        let second = reconciler.reconcile(&store, &mut state).await;
        assert!(!second.any());
    }

    #[tokio::test]
    async fn merged_intake_brings_its_drink_time() {
        let store = MemoryKvStore::new();
        let mut reconciler = Reconciler::new();
        let mut state = live(0.2, false);
        state.last_drink = DateTime::from_timestamp_millis(1_000);
        reconciler.record_write(0.2, false);

        store.set(keys::CURRENT_INTAKE, "0.4").await.unwrap();
        store.set(keys::LAST_WATER_INTAKE_TIME, "5000").await.unwrap();
        assert!(reconciler.reconcile(&store, &mut state).await.intake_changed);
        assert_eq!(state.last_drink, DateTime::from_timestamp_millis(5_000));

        // External rollover clears the drink time along with intake.
        store.set(keys::CURRENT_INTAKE, "0").await.unwrap();
        store.remove(keys::LAST_WATER_INTAKE_TIME).await.unwrap();
        assert!(reconciler.reconcile(&store, &mut state).await.intake_changed);
        assert_eq!(state.last_drink, None);
    }

    #[tokio::test]
    async fn own_write_is_not_merged_back() {
        let store = MemoryKvStore::new();
        let mut reconciler = Reconciler::new();
        // The view ran ahead while a local write was still landing; storage
        // still holds the value we wrote earlier.
        store.set(keys::CURRENT_INTAKE, "0.4").await.unwrap();
        reconciler.record_write(0.4, false);
        let mut state = live(0.6, false);

        let result = reconciler.reconcile(&store, &mut state).await;
        assert!(!result.intake_changed);
        assert_eq!(state.current_intake, 0.6);
    }

    #[tokio::test]
    async fn tiny_differences_are_ignored() {
        let store = MemoryKvStore::new();
        store.set(keys::CURRENT_INTAKE, "1.005").await.unwrap();
        let mut reconciler = Reconciler::new();
        let mut state = live(1.0, false);

        assert!(!reconciler.reconcile(&store, &mut state).await.any());
        assert_eq!(state.current_intake, 1.0);
    }

    #[tokio::test]
    async fn goal_flag_set_in_background_is_merged() {
        let store = MemoryKvStore::new();
        store.set(keys::CURRENT_INTAKE, "2").await.unwrap();
        store.set(keys::GOAL_REACHED, "true").await.unwrap();
        let mut reconciler = Reconciler::new();
        let mut state = live(1.8, false);

        let result = reconciler.reconcile(&store, &mut state).await;
        assert!(result.intake_changed && result.goal_reached_changed);
        assert!(state.goal_reached);
        assert_eq!(state.current_intake, 2.0);
    }

    #[tokio::test]
    async fn external_rollover_is_merged() {
        let store = MemoryKvStore::new();
        let mut reconciler = Reconciler::new();
        let mut state = live(2.0, true);
        reconciler.record_write(2.0, true);

        store.set(keys::CURRENT_INTAKE, "0").await.unwrap();
        store.set(keys::GOAL_REACHED, "false").await.unwrap();

        let result = reconciler.reconcile(&store, &mut state).await;
        assert!(result.intake_changed && result.goal_reached_changed);
        assert_eq!(state.current_intake, 0.0);
        assert!(!state.goal_reached);
    }

    #[tokio::test]
    async fn empty_or_garbage_storage_changes_nothing() {
        let store = MemoryKvStore::new();
        let mut reconciler = Reconciler::new();
        let mut state = live(0.8, false);
        assert!(!reconciler.reconcile(&store, &mut state).await.any());

        store.set(keys::CURRENT_INTAKE, "???").await.unwrap();
        store.set(keys::GOAL_REACHED, "maybe").await.unwrap();
        assert!(!reconciler.reconcile(&store, &mut state).await.any());
        assert_eq!(state, live(0.8, false));
    }
}
