//! The foreground loop owns the [`HydrationApp`]; everything else talks to it
//! through a [`RuntimeHandle`].  While foregrounded it re-runs the
//! reconcile / rollover / reminder pass on every poll tick.

use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use hydrate_config::AppConfig;
use hydrate_tracker::{AppEvent, HydrationApp, IntakeOutcome, TrackerState};

use crate::commands::{Lifecycle, RuntimeCommand};

/// Broadcast channel capacity. Slow subscribers lose the oldest events.
const EVENT_CAP: usize = 64;
const COMMAND_CAP: usize = 32;

#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    tx: mpsc::Sender<RuntimeCommand>,
}

impl RuntimeHandle {
    pub async fn add_water(&self, amount: Option<f64>) -> Result<IntakeOutcome> {
        Ok(self
            .request(|reply| RuntimeCommand::AddWater { amount, reply })
            .await??)
    }

    pub async fn set_goal(&self, goal: f64) -> Result<()> {
        Ok(self
            .request(|reply| RuntimeCommand::SetGoal { goal, reply })
            .await??)
    }

    pub async fn notification_action(&self, action_id: impl Into<String>) -> Result<Option<IntakeOutcome>> {
        let action_id = action_id.into();
        Ok(self
            .request(|reply| RuntimeCommand::NotificationAction { action_id, reply })
            .await??)
    }

    pub async fn lifecycle(&self, lifecycle: Lifecycle) -> Result<()> {
        self.tx
            .send(RuntimeCommand::Lifecycle(lifecycle))
            .await
            .map_err(|_| anyhow!("foreground runtime has stopped"))
    }

    pub async fn status(&self) -> Result<TrackerState> {
        self.request(RuntimeCommand::Status).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.request(RuntimeCommand::Reset).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> RuntimeCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| anyhow!("foreground runtime has stopped"))?;
        rx.await
            .map_err(|_| anyhow!("foreground runtime dropped the request"))
    }
}

pub struct ForegroundRuntime {
    handle: RuntimeHandle,
    events: broadcast::Sender<AppEvent>,
    task: JoinHandle<HydrationApp>,
}

impl ForegroundRuntime {
    /// Start the loop, polling at the configured interval.
    pub fn spawn(app: HydrationApp, config: &AppConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self::spawn_with_interval(app, config.poll_interval(), shutdown)
    }

    pub fn spawn_with_interval(
        mut app: HydrationApp,
        poll_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel(COMMAND_CAP);
        let (events, _) = broadcast::channel(EVENT_CAP);
        let event_tx = events.clone();

        let task = tokio::spawn(async move {
            app.load().await;
            app.ensure_permission().await;
            app.foreground_pass().await;
            forward_events(&mut app, &event_tx);

            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            let mut foreground = true;
            info!(poll_secs = poll_interval.as_secs(), "foreground runtime started");

            loop {
                tokio::select! {
                    _ = ticker.tick(), if foreground => {
                        let pass = app.foreground_pass().await;
                        debug!(?pass, "poll tick");
                    }
                    command = rx.recv() => {
                        let Some(command) = command else { break };
                        dispatch(&mut app, command, &mut foreground, &mut ticker).await;
                    }
                    changed = shutdown.changed() => {
                        // A dropped sender can never signal again.
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
                forward_events(&mut app, &event_tx);
            }

            forward_events(&mut app, &event_tx);
            info!("foreground runtime stopped");
            app
        });

        Self {
            handle: RuntimeHandle { tx },
            events,
            task,
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Events published before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Wait for the loop to exit, either on shutdown or once every handle
    /// has been dropped, and hand back the app.
    pub async fn join(self) -> Result<HydrationApp> {
        let Self { handle, task, .. } = self;
        drop(handle);
        task.await
            .map_err(|err| anyhow!("foreground runtime task failed: {err}"))
    }
}

async fn dispatch(
    app: &mut HydrationApp,
    command: RuntimeCommand,
    foreground: &mut bool,
    ticker: &mut Interval,
) {
    match command {
        RuntimeCommand::AddWater { amount, reply } => {
            let outcome = match amount {
                Some(amount) => app.add_water(amount).await,
                None => app.add_standard().await,
            };
            let _ = reply.send(outcome);
        }
        RuntimeCommand::SetGoal { goal, reply } => {
            let _ = reply.send(app.set_goal(goal).await);
        }
        RuntimeCommand::NotificationAction { action_id, reply } => {
            let _ = reply.send(app.handle_action(&action_id).await);
        }
        RuntimeCommand::Lifecycle(Lifecycle::Foreground) => {
            debug!("entering foreground");
            *foreground = true;
            app.foreground_pass().await;
            ticker.reset();
        }
        RuntimeCommand::Lifecycle(Lifecycle::Background) => {
            debug!("entering background, polling paused");
            *foreground = false;
        }
        RuntimeCommand::Status(reply) => {
            let _ = reply.send(app.state().clone());
        }
        RuntimeCommand::Reset(reply) => {
            app.reset_all().await;
            let _ = reply.send(());
        }
    }
}

fn forward_events(app: &mut HydrationApp, events: &broadcast::Sender<AppEvent>) {
    for event in app.drain_events() {
        // No subscribers is fine.
        let _ = events.send(event);
    }
}
