use std::sync::Arc;

use anyhow::Context;
use chartwatch_types::AppEvent;
use kanal::{AsyncReceiver, AsyncSender};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::events::event_loop;
use crate::io::spawn_console;
use crate::state::AppState;

/// Centralized channel management
pub struct ChannelSet {
    /// Console, hotkey, desktop alerts and companions all feed the event loop
    pub events: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            events: kanal::bounded_async(64),
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(channels: ChannelSet, state: Arc<AppState>) -> Self {
        Self {
            channels,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn events(&self) -> AsyncSender<AppEvent> {
        self.channels.events.0.clone()
    }

    pub async fn spawn_tasks(&self) -> anyhow::Result<JoinSet<anyhow::Result<()>>> {
        let mut tasks = JoinSet::new();

        // Event loop
        tasks.spawn(event_loop(
            self.state.clone(),
            self.channels.events.1.clone(),
            self.cancel_token.clone(),
        ));

        // Console toggle
        spawn_console(self.channels.events.0.clone())?;

        // Companion hub
        let addr = self.state.config.read().await.notify.companion_addr.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind companion hub on {addr}"))?;
        let hub = self.state.hub.clone();
        let reports = self.channels.events.0.clone();
        let cancel = self.cancel_token.child_token();
        tasks.spawn(async move {
            hub.serve(listener, reports, cancel).await;
            Ok(())
        });

        // Running state, so an unexpected stop is reported like a toggle
        let mut running = self.state.scheduler.lock().await.subscribe();
        let events = self.channels.events.0.clone();
        let cancel = self.cancel_token.child_token();
        tasks.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = running.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let now = *running.borrow_and_update();
                        events.send(AppEvent::MonitoringChanged { running: now }).await?;
                    }
                }
            }
            Ok(())
        });

        #[cfg(feature = "hotkey")]
        crate::io::spawn_hotkey_listener(
            self.channels.events.0.clone(),
            self.cancel_token.child_token(),
        );

        Ok(tasks)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Stop monitoring so capture and OCR are released before exit
    pub async fn release(&self) {
        self.state.scheduler.lock().await.stop().await;
    }
}
