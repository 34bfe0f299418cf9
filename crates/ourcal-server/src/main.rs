//! ourcal: shared calendar server
//!
//! Main entry point for the calendar backend.
//!
//! Usage:
//!   ourcal                   - Start the HTTP API
//!   ourcal --config <path>   - Start with an explicit TOML config
//!   ourcal --help            - Show help

use ourcal_api::AppState;
use ourcal_core::{CalendarService, Config, NotifyRule};
use ourcal_notify::NotificationDispatcher;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Serve the HTTP API
    Server { config_path: Option<String> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let mode = parse_args(std::env::args().skip(1))?;

    let config_path = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("ourcal {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server { config_path } => config_path,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse()?)
        )
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    run_server(config).await
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> anyhow::Result<RunMode>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => match args.next() {
                Some(path) => config_path = Some(path),
                None => anyhow::bail!("--config requires a path"),
            },
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(RunMode::Server { config_path })
}

/// Print help message
fn print_help() {
    println!("ourcal - shared calendar server");
    println!();
    println!("Usage:");
    println!("  ourcal                   Start the HTTP API");
    println!("  ourcal --config <path>   Load settings from a TOML file (default: ourcal.toml)");
    println!("  ourcal --help            Show this help message");
    println!("  ourcal --version         Show version");
    println!();
    println!("Environment Variables:");
    println!("  API_PORT                 HTTP API port (default: 5001)");
    println!("  API_ALLOWED_ORIGINS      Comma-separated CORS origins");
    println!("  DB_PATH                  SQLite database file (default: data/ourcal.db)");
    println!("  SEED_USERS               Comma-separated user names (default: Angel,Andrea)");
    println!("  NOTIFY_ENABLED           Enable notifications (default: true)");
    println!("  NOTIFY_CALENDAR_URL      Link included in notification emails");
    println!("  NOTIFY_RULES             actor:recipient:email entries, comma-separated");
    println!("  SMTP_HOST                SMTP server (notifications are logged if unset)");
    println!("  SMTP_PORT                SMTP port (default: 587)");
    println!("  SMTP_USER / SMTP_PASS    SMTP credentials");
    println!("  SMTP_FROM                Sender address");
}

/// Open the store, start the notification worker and serve until Ctrl+C
async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting ourcal...");
    tracing::info!("Database: {}", config.database.db_path);

    let calendar = CalendarService::open(&config.database.db_path)
        .map_err(|e| anyhow::anyhow!("Failed to open calendar store: {}", e))?;

    let users = calendar
        .seed_users(&config.users.names)
        .map_err(|e| anyhow::anyhow!("Failed to seed users: {}", e))?;
    tracing::info!(
        "Users: {:?}",
        users.iter().map(|u| u.name.as_str()).collect::<Vec<_>>()
    );

    if config.notify.enabled {
        for name in unknown_rule_users(&calendar, &config.notify.rules)? {
            tracing::warn!("Notification rule names unknown user: {}", name);
        }
    }

    let (dispatcher, worker) = NotificationDispatcher::from_config(&config.notify);

    let state = AppState::new(config, calendar, dispatcher);

    tracing::info!("ourcal initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    let result = ourcal_api::start_server(state, shutdown_signal()).await;

    tracing::info!("Shutting down...");

    // Deliver anything already queued before exiting
    if let Some(worker) = worker {
        worker.shutdown().await;
    }

    tracing::info!("Shutdown complete");
    result
}

/// Names used by notification rules that are not in the user directory
fn unknown_rule_users(
    calendar: &CalendarService,
    rules: &[NotifyRule],
) -> anyhow::Result<Vec<String>> {
    let mut unknown = Vec::new();
    for rule in rules {
        for name in [&rule.actor, &rule.recipient] {
            if calendar.find_user_by_name(name)?.is_none() && !unknown.contains(name) {
                unknown.push(name.clone());
            }
        }
    }
    Ok(unknown)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
}
