use std::io::BufRead;

use chartwatch_io::FeedClick;
use chartwatch_types::{AlertAction, AppEvent};
use kanal::AsyncSender;

#[cfg(feature = "hotkey")]
use tokio_util::sync::CancellationToken;

const DEFAULT_HISTORY_LIMIT: usize = 10;

pub const HELP: &str =
    "commands: toggle | start | stop | status | stats | history [N] | clear | quit";

pub const COMPANION_HELP: &str = "commands: open [ID] | alerts [ID] | history [ID]";

/// Map one line typed on the console to an event
pub fn parse_command(line: &str) -> Option<AppEvent> {
    let mut words = line.split_whitespace();
    let event = match words.next()?.to_ascii_lowercase().as_str() {
        "toggle" | "t" => AppEvent::ToggleMonitoring,
        "start" | "on" => AppEvent::StartMonitoring,
        "stop" | "off" => AppEvent::StopMonitoring,
        "status" => AppEvent::ShowStatus,
        "stats" => AppEvent::ShowStats,
        "history" => AppEvent::ShowHistory {
            limit: words
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_LIMIT),
        },
        "clear" => AppEvent::ClearHistory,
        "quit" | "exit" | "q" => AppEvent::Shutdown,
        _ => return None,
    };
    Some(event)
}

/// Map one line typed on the companion console to a click. `ID` may be any
/// prefix of a notification id; without one the newest notification is used.
pub fn parse_companion_command(line: &str) -> Option<FeedClick> {
    let mut words = line.split_whitespace();
    let action = match words.next()?.to_ascii_lowercase().as_str() {
        "open" | "read" => AlertAction::Body,
        "alerts" => AlertAction::ViewAlerts,
        "history" => AlertAction::ViewHistory,
        _ => return None,
    };
    Some(FeedClick {
        notification_id: words.next().map(str::to_string),
        action,
    })
}

/// Console control, the user-facing monitoring toggle
pub fn spawn_console(event_tx: AsyncSender<AppEvent>) -> anyhow::Result<()> {
    spawn_reader("console", HELP, parse_command, event_tx)
}

/// Companion console, opening notifications from the feed
pub fn spawn_companion_console(click_tx: AsyncSender<FeedClick>) -> anyhow::Result<()> {
    spawn_reader("companion-console", COMPANION_HELP, parse_companion_command, click_tx)
}

/// Reads on a plain thread: a pending blocking read on a runtime thread
/// would keep the runtime from shutting down.
fn spawn_reader<T: Send + 'static>(
    name: &str,
    help: &'static str,
    parse: fn(&str) -> Option<T>,
    tx: AsyncSender<T>,
) -> anyhow::Result<()> {
    let tx = tx.to_sync();
    std::thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            println!("{help}");
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("Console read failed: {e}");
                        break;
                    }
                };

                if line.trim().is_empty() {
                    continue;
                }

                match parse(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => println!("{help}"),
                }
            }
            tracing::debug!("Console input closed");
        })?;

    Ok(())
}

/// Ctrl+Shift+M toggles monitoring
#[cfg(feature = "hotkey")]
pub fn spawn_hotkey_listener(event_tx: AsyncSender<AppEvent>, cancel: CancellationToken) {
    tokio::task::spawn_blocking(move || {
        let hotkey = match chartwatch_capture::ToggleHotkey::register() {
            Ok(hotkey) => hotkey,
            Err(e) => {
                tracing::error!("Failed to register toggle hotkey: {e}");
                return;
            }
        };

        tracing::info!("Toggle hotkey registered (Ctrl+Shift+M)");

        while !cancel.is_cancelled() {
            if hotkey.poll() {
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = tx.send(AppEvent::ToggleMonitoring).await {
                        tracing::error!("Failed to send toggle: {e}");
                    }
                });
            }

            // Sleep briefly to avoid busy loop
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        tracing::info!("Toggle hotkey listener stopping");
    });
}
