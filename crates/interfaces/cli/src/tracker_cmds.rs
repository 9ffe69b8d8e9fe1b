use std::io;
use std::io::IsTerminal;
use std::io::Write;

use anyhow::{Result, bail};
use chrono::Local;

use hydrate_config::TrackerConfig;
use hydrate_notify::{Notifier, OutboxNotifier, ScheduledNotification, Trigger};
use hydrate_tracker::{AppEvent, HydrationApp, IntakeOutcome, TrackerState, render_status};

/// `--goal` when given, otherwise the configured suggestion.
pub(crate) fn setup_goal(requested: Option<f64>, config: &TrackerConfig) -> f64 {
    requested.unwrap_or(config.default_goal_liters)
}

pub(crate) async fn run_setup(app: &mut HydrationApp, goal: f64) -> Result<()> {
    app.set_goal(goal).await?;
    report_events(app.drain_events());
    println!("daily goal set to {goal}L");
    print_state(app.state());
    Ok(())
}

pub(crate) async fn run_add(app: &mut HydrationApp, amount: Option<f64>) -> Result<()> {
    let outcome = match amount {
        Some(amount) => app.add_water(amount).await?,
        None => app.add_standard().await?,
    };
    report_events(app.drain_events());
    print_outcome(&outcome);
    Ok(())
}

pub(crate) async fn run_status(app: &mut HydrationApp) {
    app.foreground_pass().await;
    report_events(app.drain_events());
    println!("today: {}", app.today_key());
    print_state(app.state());
}

pub(crate) async fn run_action(app: &mut HydrationApp, action_id: &str) -> Result<()> {
    let outcome = app.handle_action(action_id).await?;
    report_events(app.drain_events());
    match outcome {
        Some(outcome) => print_outcome(&outcome),
        None => println!("action '{action_id}' handled; nothing to record"),
    }
    Ok(())
}

pub(crate) async fn run_reset(app: &mut HydrationApp, yes: bool) -> Result<()> {
    if !yes {
        if !io::stdin().is_terminal() {
            bail!("refusing to reset in non-interactive mode without --yes");
        }

        print!("This erases today's progress and your daily goal. Type 'RESET' to continue: ");
        io::stdout().flush()?;
        let mut confirmation = String::new();
        io::stdin().read_line(&mut confirmation)?;
        if confirmation.trim() != "RESET" {
            println!("reset cancelled");
            return Ok(());
        }
    }

    app.reset_all().await;
    println!("all progress erased");
    println!("- notifications cancelled");
    println!("- run `hydrate setup [--goal <liters>]` to start again");
    Ok(())
}

pub(crate) async fn run_list_notifications(outbox: &OutboxNotifier) -> Result<()> {
    let pending = outbox.outstanding().await?;
    if pending.is_empty() {
        println!("no pending notifications");
        return Ok(());
    }

    println!("── pending notifications ─────────────────────────────");
    for notification in &pending {
        println!(
            "  {:<18} {:<26} {}",
            notification.id,
            describe_trigger(notification),
            notification.request.content.title
        );
    }
    println!("  ({} total, outbox: {})", pending.len(), outbox.path().display());
    Ok(())
}

pub(crate) fn print_outcome(outcome: &IntakeOutcome) {
    if !outcome.applied {
        if outcome.state.goal_reached {
            println!("goal already reached today; nothing added");
        } else {
            println!("nothing added");
        }
    }
    print_state(&outcome.state);
}

pub(crate) fn print_state(state: &TrackerState) {
    if !state.is_onboarded {
        println!("no daily goal set; run `hydrate setup [--goal <liters>]`");
        return;
    }

    let status = render_status(state.current_intake, state.daily_goal, state.goal_reached);
    println!("{}", status.title);
    println!("{}", status.body);
    if let Some(last) = state.last_drink {
        println!("last drink: {}", last.with_timezone(&Local).format("%H:%M"));
    }
}

pub(crate) fn report_events(events: Vec<AppEvent>) {
    for event in &events {
        report_event(event);
    }
}

pub(crate) fn report_event(event: &AppEvent) {
    match event {
        AppEvent::GoalReached => println!("🎉 Goal achieved! Great job staying hydrated!"),
        AppEvent::ReminderFired => println!("💧 Time to hydrate! It's been a while since your last drink."),
        AppEvent::PermissionDenied => {
            println!("notifications are off; reminders will not be shown")
        }
        AppEvent::Reset | AppEvent::StateChanged(_) => {}
    }
}

fn describe_trigger(notification: &ScheduledNotification) -> String {
    match notification.request.trigger {
        Trigger::Immediate => "showing now".to_string(),
        Trigger::After { .. } => match notification.due_at() {
            Some(due) => format!("at {}", due.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
            None => "later".to_string(),
        },
        Trigger::Daily { hour, minute } => format!("daily at {hour:02}:{minute:02}"),
    }
}
