use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chartwatch_core::{Destination, DestinationRegistry, Error, Result};
use chartwatch_types::{AppEvent, BroadcastMessage, CompanionReport};
use futures_util::{SinkExt, StreamExt};
use kanal::{AsyncReceiver, AsyncSender};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::origin::OriginPolicy;

/// An open companion window. Sending only enqueues onto its outbound queue.
pub struct CompanionWindow {
    name: String,
    outbound: AsyncSender<String>,
}

impl Destination for CompanionWindow {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn send(&self, message: &BroadcastMessage) -> Result<()> {
        let payload =
            serde_json::to_string(message).map_err(|e| Error::delivery(&self.name, e))?;

        match self.outbound.try_send(payload) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::delivery(&self.name, "outbound queue full")),
            Err(_) => Err(Error::delivery(&self.name, "window closed")),
        }
    }
}

/// WebSocket endpoint companion windows connect to
pub struct CompanionHub {
    policy: OriginPolicy,
    queue_capacity: usize,
    windows: RwLock<HashMap<u64, Arc<CompanionWindow>>>,
    next_id: AtomicU64,
}

impl CompanionHub {
    pub fn new(policy: OriginPolicy, queue_capacity: usize) -> Self {
        Self {
            policy,
            queue_capacity: queue_capacity.max(1),
            windows: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a window and hand back the receiving end of its queue
    pub fn register(&self, label: &str) -> (u64, AsyncReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = kanal::bounded_async(self.queue_capacity);
        let window = Arc::new(CompanionWindow {
            name: format!("companion-{id} ({label})"),
            outbound: tx,
        });

        if let Ok(mut windows) = self.windows.write() {
            windows.insert(id, window);
        }
        (id, rx)
    }

    pub fn unregister(&self, id: u64) {
        if let Ok(mut windows) = self.windows.write() {
            windows.remove(&id);
        }
    }

    pub fn window_count(&self) -> usize {
        self.windows.read().map(|w| w.len()).unwrap_or(0)
    }

    /// Accept companions until cancelled. Click reports are forwarded to `reports`.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        reports: AsyncSender<AppEvent>,
        cancel: CancellationToken,
    ) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Companion hub listening on ws://{addr}");
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let hub = self.clone();
                        let reports = reports.clone();
                        let cancel = cancel.child_token();
                        tokio::spawn(async move {
                            hub.handle_connection(stream, peer, reports, cancel).await;
                        });
                    }
                    Err(e) => tracing::warn!("Failed to accept companion connection: {e}"),
                },
            }
        }

        tracing::info!("Companion hub stopping");
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        reports: AsyncSender<AppEvent>,
        cancel: CancellationToken,
    ) {
        let policy = &self.policy;
        let check_origin = |request: &Request, response: Response| {
            let origin = request
                .headers()
                .get("origin")
                .and_then(|value| value.to_str().ok());
            if policy.allows(origin) {
                Ok(response)
            } else {
                tracing::warn!("Rejected companion from {peer} with origin {origin:?}");
                let mut rejection = ErrorResponse::new(Some("origin not allowed".to_string()));
                *rejection.status_mut() = StatusCode::FORBIDDEN;
                Err(rejection)
            }
        };

        let ws = match tokio_tungstenite::accept_hdr_async(stream, check_origin).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::debug!("Companion handshake with {peer} failed: {e}");
                return;
            }
        };

        let (id, outbound) = self.register(&peer.to_string());
        tracing::info!("Companion window {id} connected from {peer}");

        let (mut write, mut read) = ws.split();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                queued = outbound.recv() => {
                    let Ok(payload) = queued else { break };
                    if let Err(e) = write.send(Message::Text(payload.into())).await {
                        tracing::debug!("Companion window {id} write failed: {e}");
                        break;
                    }
                }
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => forward_report(text.as_str(), &reports).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("Companion window {id} read failed: {e}");
                        break;
                    }
                },
            }
        }

        self.unregister(id);
        tracing::info!("Companion window {id} disconnected");
    }
}

async fn forward_report(text: &str, reports: &AsyncSender<AppEvent>) {
    match serde_json::from_str::<CompanionReport>(text) {
        Ok(CompanionReport::NotificationClicked {
            notification_id,
            action,
        }) => {
            let event = AppEvent::AlertInteraction {
                notification_id,
                action,
            };
            if let Err(e) = reports.send(event).await {
                tracing::error!("Failed to forward companion click: {e}");
            }
        }
        Err(e) => tracing::debug!("Ignoring companion message: {e}"),
    }
}

impl DestinationRegistry for CompanionHub {
    fn destinations(&self) -> Vec<Arc<dyn Destination>> {
        self.windows
            .read()
            .map(|windows| {
                windows
                    .values()
                    .map(|w| w.clone() as Arc<dyn Destination>)
                    .collect()
            })
            .unwrap_or_default()
    }
}
