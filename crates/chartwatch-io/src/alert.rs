use std::io::ErrorKind;
use std::process::Stdio;

use chartwatch_core::{AlertOutcome, AlertSink, DesktopAlert, Error, Result};
use chartwatch_types::{AlertAction, AppEvent};
use kanal::AsyncSender;

/// Desktop alerts through a `notify-send` compatible program.
///
/// The program is started with `--wait` so the chosen action is printed on
/// stdout when the user clicks; that is reported back as
/// [`AppEvent::AlertInteraction`].
pub struct CommandAlertSink {
    program: String,
    app_name: String,
    events: AsyncSender<AppEvent>,
}

impl CommandAlertSink {
    pub fn new(
        program: impl Into<String>,
        app_name: impl Into<String>,
        events: AsyncSender<AppEvent>,
    ) -> Self {
        Self {
            program: program.into(),
            app_name: app_name.into(),
            events,
        }
    }
}

fn action_key(action: AlertAction) -> &'static str {
    match action {
        AlertAction::Body => "default",
        AlertAction::ViewAlerts => "alerts",
        AlertAction::ViewHistory => "history",
    }
}

fn parse_action(stdout: &str) -> Option<AlertAction> {
    match stdout.trim() {
        "default" => Some(AlertAction::Body),
        "alerts" => Some(AlertAction::ViewAlerts),
        "history" => Some(AlertAction::ViewHistory),
        _ => None,
    }
}

impl AlertSink for CommandAlertSink {
    fn alert(&self, alert: &DesktopAlert) -> Result<AlertOutcome> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .arg(format!("--app-name={}", self.app_name))
            .arg("--wait")
            .arg(format!("--action={}=Open", action_key(AlertAction::Body)));
        for (action, label) in &alert.actions {
            command.arg(format!("--action={}={label}", action_key(*action)));
        }
        command
            .arg(&alert.title)
            .arg(&alert.body)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} not installed, desktop alerts disabled", self.program);
                return Ok(AlertOutcome::Skipped);
            }
            Err(e) => return Err(Error::delivery("desktop", e)),
        };

        let notification_id = alert.id.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let output = match child.wait_with_output().await {
                Ok(output) => output,
                Err(e) => {
                    tracing::debug!("Desktop alert {notification_id} ended: {e}");
                    return;
                }
            };

            let Some(action) = parse_action(&String::from_utf8_lossy(&output.stdout)) else {
                // Dismissed or expired
                return;
            };

            tracing::info!("Desktop alert {notification_id} clicked: {action:?}");
            let event = AppEvent::AlertInteraction {
                notification_id,
                action,
            };
            if let Err(e) = events.send(event).await {
                tracing::error!("Failed to report alert click: {e}");
            }
        });

        Ok(AlertOutcome::Shown)
    }
}
