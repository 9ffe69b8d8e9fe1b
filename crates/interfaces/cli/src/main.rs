mod interactive;
mod tracker_cmds;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hydrate_config::AppConfig;
use hydrate_notify::{Notifier, OutboxNotifier, PermissionStatus, RecordingNotifier};
use hydrate_store::JsonFileStore;
use hydrate_tracker::{HydrationApp, SystemClock};

const DEFAULT_CONFIG_PATH: &str = "config/hydrate.toml";

#[derive(Debug, Parser)]
#[command(
    name = "hydrate",
    version,
    about = "Daily water intake tracker with inactivity reminders"
)]
struct Cli {
    /// TOML config file; missing files fall back to defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Set the daily goal in liters and start reminders.  Only allowed
    /// before setup or after a reset.
    Setup {
        /// Defaults to `tracker.default_goal_liters`.
        #[arg(long)]
        goal: Option<f64>,
    },
    /// Log a drink; defaults to the standard increment.
    Add {
        #[arg(long)]
        amount: Option<f64>,
    },
    Status,
    /// Handle a notification action as if tapped with the app closed.
    Action {
        #[arg(value_name = "ACTION_ID")]
        action_id: String,
    },
    /// Erase all progress and the daily goal.
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Foreground session reading commands from stdin.
    Run,
    /// List pending notifications from the outbox.
    Notifications,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Setup { goal } => {
            let mut app = build_app(&config);
            let goal = tracker_cmds::setup_goal(goal, &config.tracker);
            tracker_cmds::run_setup(&mut app, goal).await?;
        }
        Commands::Add { amount } => {
            let mut app = build_app(&config);
            tracker_cmds::run_add(&mut app, amount).await?;
        }
        Commands::Status => {
            let mut app = build_app(&config);
            tracker_cmds::run_status(&mut app).await;
        }
        Commands::Action { action_id } => {
            let mut app = build_app(&config);
            tracker_cmds::run_action(&mut app, &action_id).await?;
        }
        Commands::Reset { yes } => {
            let mut app = build_app(&config);
            tracker_cmds::run_reset(&mut app, yes).await?;
        }
        Commands::Run => {
            if config.notifications.enabled {
                OutboxNotifier::new(&config.notifications.outbox_path)
                    .compact()
                    .await?;
            }
            let app = build_app(&config);
            interactive::run_foreground_session(app, &config).await?;
        }
        Commands::Notifications => {
            let outbox = OutboxNotifier::new(&config.notifications.outbox_path);
            tracker_cmds::run_list_notifications(&outbox).await?;
        }
    }

    Ok(())
}

fn build_app(config: &AppConfig) -> HydrationApp {
    let store = Arc::new(JsonFileStore::new(&config.storage.path));
    let notifier: Arc<dyn Notifier> = if config.notifications.enabled {
        Arc::new(OutboxNotifier::new(&config.notifications.outbox_path))
    } else {
        // Disabled notifications behave like a refused permission.
        Arc::new(RecordingNotifier::with_permission(PermissionStatus::Denied, false))
    };
    HydrationApp::new(config, store, notifier, Arc::new(SystemClock))
}
