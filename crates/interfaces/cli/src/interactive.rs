use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use hydrate_config::AppConfig;
use hydrate_runtime::{ForegroundRuntime, Lifecycle, RuntimeHandle};
use hydrate_tracker::HydrationApp;

use crate::tracker_cmds::{print_outcome, print_state, report_event};

#[derive(Debug, PartialEq)]
enum SessionLine {
    Add(Option<f64>),
    Action(String),
    Status,
    Background,
    Foreground,
    Help,
    Quit,
    Unknown(String),
}

fn parse_line(line: &str) -> Option<SessionLine> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let arg = parts.next();
    let parsed = match (command, arg) {
        ("add", None) => SessionLine::Add(None),
        ("add", Some(raw)) => match raw.parse() {
            Ok(amount) => SessionLine::Add(Some(amount)),
            Err(_) => SessionLine::Unknown(line.to_string()),
        },
        ("action", Some(id)) => SessionLine::Action(id.to_string()),
        ("status", None) => SessionLine::Status,
        ("bg", None) => SessionLine::Background,
        ("fg", None) => SessionLine::Foreground,
        ("help", None) => SessionLine::Help,
        ("quit" | "exit", None) => SessionLine::Quit,
        _ => SessionLine::Unknown(line.to_string()),
    };
    Some(parsed)
}

fn print_help() {
    println!("add [liters]   log a drink (default: standard increment)");
    println!("action <id>    press a notification button (add-200ml, dismiss)");
    println!("status         show today's progress");
    println!("bg / fg        simulate leaving / returning to the app");
    println!("quit");
}

pub(crate) async fn run_foreground_session(app: HydrationApp, config: &AppConfig) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runtime = ForegroundRuntime::spawn(app, config, shutdown_rx);
    let handle = runtime.handle();

    let mut events = runtime.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => report_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("hydrate session; type `help` for commands");
    print_state(&handle.status().await?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(command) = parse_line(line.trim()) else { continue };
                if command == SessionLine::Quit {
                    break;
                }
                if let Err(err) = run_line(&handle, command).await {
                    println!("{err}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    drop(handle);
    runtime.join().await?;
    let _ = printer.await;
    println!("session closed");
    Ok(())
}

async fn run_line(handle: &RuntimeHandle, command: SessionLine) -> Result<()> {
    match command {
        SessionLine::Add(amount) => print_outcome(&handle.add_water(amount).await?),
        SessionLine::Action(id) => match handle.notification_action(id).await? {
            Some(outcome) => print_outcome(&outcome),
            None => println!("ok"),
        },
        SessionLine::Status => print_state(&handle.status().await?),
        SessionLine::Background => {
            handle.lifecycle(Lifecycle::Background).await?;
            println!("app in background; reminders keep running, polling paused");
        }
        SessionLine::Foreground => {
            handle.lifecycle(Lifecycle::Foreground).await?;
            print_state(&handle.status().await?);
        }
        SessionLine::Help => print_help(),
        SessionLine::Quit => {}
        SessionLine::Unknown(line) => println!("unrecognised command: {line} (try `help`)"),
    }
    Ok(())
}
