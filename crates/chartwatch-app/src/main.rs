use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chartwatch_config::Config;
use chartwatch_config::history::HISTORY_CAPACITY;
use chartwatch_io::NotificationFeed;
use chartwatch_types::AppEvent;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;

mod controller;
mod events;
mod io;
mod logging;
mod pipeline;
mod profile;
mod scheduler;
mod state;
mod status;

use self::controller::{AppController, ChannelSet};
use self::state::{AppState, open_history};

/// Watches the screen for the active patient and tells every open view
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Profile to load from the user config directory
    #[arg(long, default_value = "main")]
    profile: String,

    /// Load this config file instead of a profile
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log JSON lines even on a terminal
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the background process (default)
    Run {
        /// Turn monitoring on right away
        #[arg(long)]
        start: bool,
    },
    /// Follow a running hub the way a companion window does
    Companion {
        #[arg(long, default_value = "ws://127.0.0.1:8765")]
        url: String,
        #[arg(long, default_value = "http://localhost:8765")]
        origin: String,
    },
    /// Print statistics over the stored history as JSON
    Stats,
    /// Print stored history, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Empty the stored history
    ClearHistory,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.log_json);

    let mut config = load_config(&cli)?;
    config.apply_env();

    match cli.command.unwrap_or(Command::Run { start: false }) {
        Command::Run { start } => run(config, start).await,
        Command::Companion { url, origin } => companion(&url, &origin).await,
        Command::Stats => {
            let history = open_history(&config).await?;
            let stats = history.compute_stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::History { limit } => {
            let history = open_history(&config).await?;
            println!("{}", serde_json::to_string_pretty(&history.recent(limit).await)?);
            Ok(())
        }
        Command::ClearHistory => {
            let history = open_history(&config).await?;
            history.clear().await?;
            println!("History cleared");
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(path) = &cli.config {
        return profile::load_config_file(path);
    }

    if let Err(e) = profile::init_user_config() {
        tracing::warn!("Could not prepare user profiles: {e}");
    }
    profile::load_user_profile(&cli.profile)
}

async fn run(config: Config, start: bool) -> anyhow::Result<()> {
    let channels = ChannelSet::new();
    let state = Arc::new(
        AppState::build(config, channels.events.0.clone())
            .await
            .context("Failed to set up")?,
    );

    let controller = AppController::new(channels, state);
    let mut tasks = controller.spawn_tasks().await?;

    if start {
        controller.events().send(AppEvent::StartMonitoring).await?;
    }

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) if controller.is_shutting_down() => {}
                Ok(Ok(())) => tracing::warn!("A task exited early"),
                Ok(Err(e)) => tracing::error!("Task failed: {e:#}"),
                Err(e) => tracing::error!("Task panicked: {e}"),
            }
        }
    }

    controller.shutdown();
    controller.release().await;
    while let Some(result) = tasks.join_next().await {
        if let Ok(Err(e)) = result {
            tracing::debug!("Task ended with {e:#}");
        }
    }

    Ok(())
}

async fn companion(url: &str, origin: &str) -> anyhow::Result<()> {
    let feed = NotificationFeed::new(HISTORY_CAPACITY);
    let cancel = CancellationToken::new();

    let mut updates = feed.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let items = updates.borrow_and_update().clone();
            let unread = items.iter().filter(|item| !item.read).count();
            if let Some(latest) = items.first() {
                println!(
                    "{}  {} ({})  [{} unread]",
                    latest.received_at.format("%H:%M:%S"),
                    latest.patient.display_name,
                    latest.patient.mrn.as_deref().unwrap_or("no MRN"),
                    unread
                );
            }
        }
    });

    let (click_tx, click_rx) = kanal::bounded_async(16);
    io::spawn_companion_console(click_tx)?;

    let listener =
        chartwatch_io::run_companion_listener(url, origin, &feed, click_rx, cancel.clone());
    tokio::select! {
        result = listener => result?,
        _ = signal::ctrl_c() => cancel.cancel(),
    }

    printer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    mod pipeline_tests;
    mod scheduler_tests;
    mod support;

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::parse_from(["chartwatch"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["chartwatch", "--log-json", "run", "--start"]);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Some(Command::Run { start: true })));

        let cli = Cli::parse_from(["chartwatch", "history", "--limit", "5"]);
        assert!(matches!(cli.command, Some(Command::History { limit: 5 })));
    }
}
