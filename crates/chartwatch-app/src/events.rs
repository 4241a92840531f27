use std::sync::Arc;

use chartwatch_types::{AppEvent, HistoryStatus, StatusPatch};
use kanal::AsyncReceiver;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// App's main loop
pub async fn event_loop(
    state: Arc<AppState>,
    events_rx: AsyncReceiver<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::debug!("Event loop waiting for events");
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events_rx.recv() => event?,
        };

        if matches!(event, AppEvent::Shutdown) {
            cancel.cancel();
            break;
        }

        handle_event(&state, event).await?;
    }

    Ok(())
}

pub async fn handle_event(state: &AppState, event: AppEvent) -> anyhow::Result<()> {
    match event {
        AppEvent::StartMonitoring => {
            let mut scheduler = state.scheduler.lock().await;
            match scheduler.start().await {
                Ok(true) => println!("Monitoring on"),
                Ok(false) => println!("Monitoring is already on"),
                Err(e) => println!("Monitoring could not start: {e}"),
            }
        }
        AppEvent::StopMonitoring => {
            let mut scheduler = state.scheduler.lock().await;
            if scheduler.stop().await {
                println!("Monitoring off");
            } else {
                println!("Monitoring is already off");
            }
        }
        AppEvent::ToggleMonitoring => {
            let mut scheduler = state.scheduler.lock().await;
            match scheduler.toggle().await {
                Ok(true) => println!("Monitoring on"),
                Ok(false) => println!("Monitoring off"),
                Err(e) => println!("Monitoring could not start: {e}"),
            }
        }
        AppEvent::MonitoringChanged { running } => {
            tracing::info!("Monitoring running: {running}");
        }
        AppEvent::AlertInteraction {
            notification_id,
            action,
        } => {
            let patch = StatusPatch {
                status: Some(HistoryStatus::from(action)),
                read: Some(true),
            };
            match state.history.update_status(&notification_id, patch).await {
                Ok(true) => tracing::info!("Notification {notification_id} clicked ({action:?})"),
                Ok(false) => tracing::debug!("Click for unknown notification {notification_id}"),
                Err(e) => tracing::warn!("Failed to persist click on {notification_id}: {e}"),
            }
        }
        AppEvent::ShowStatus => {
            let scheduler = state.scheduler.lock().await;
            println!("{}", serde_json::to_string_pretty(&scheduler.status().await)?);
            match scheduler.active_patient().await {
                Some(active) => println!(
                    "Active patient: {} ({})",
                    active.display_name, active.patient_id
                ),
                None => println!("No active patient"),
            }
            println!("Companion windows: {}", state.hub.window_count());
        }
        AppEvent::ShowStats => {
            let stats = state.history.compute_stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        AppEvent::ShowHistory { limit } => {
            for entry in state.history.recent(limit).await {
                println!(
                    "{}  {:<16} {:<24} {:?}",
                    entry.record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.record.patient_id,
                    entry.record.patient_display_name,
                    entry.status
                );
            }
        }
        AppEvent::ClearHistory => {
            match state.history.clear().await {
                Ok(()) => println!("History cleared"),
                Err(e) => tracing::error!("Failed to clear history: {e}"),
            }
        }
        AppEvent::Shutdown => {}
    }

    Ok(())
}
