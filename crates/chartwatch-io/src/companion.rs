use chartwatch_types::{AlertAction, BroadcastMessage, CompanionReport, MessageKind, PatientMatch};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use kanal::AsyncReceiver;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub notification_id: Option<String>,
    pub patient: PatientMatch,
    pub received_at: DateTime<Utc>,
    pub read: bool,
}

/// The companion user opening a notification from its list.
/// Without an id it refers to the newest one.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedClick {
    pub notification_id: Option<String>,
    pub action: AlertAction,
}

/// The companion side's notification list, newest first.
///
/// Every change is published on a `watch` channel so views can re-render.
pub struct NotificationFeed {
    capacity: usize,
    items: watch::Sender<Vec<FeedItem>>,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self { capacity, items }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<FeedItem>> {
        self.items.subscribe()
    }

    pub fn snapshot(&self) -> Vec<FeedItem> {
        self.items.borrow().clone()
    }

    pub fn apply(&self, message: BroadcastMessage) {
        match message.kind {
            MessageKind::PatientContextUpdated => {
                let item = FeedItem {
                    notification_id: message.notification_id,
                    patient: message.data,
                    received_at: Utc::now(),
                    read: false,
                };
                let capacity = self.capacity;
                self.items.send_modify(|items| {
                    items.insert(0, item);
                    items.truncate(capacity);
                });
            }
        }
    }

    pub fn mark_read(&self, notification_id: &str) -> bool {
        self.items.send_if_modified(|items| {
            match items
                .iter_mut()
                .find(|item| item.notification_id.as_deref() == Some(notification_id))
            {
                Some(item) if !item.read => {
                    item.read = true;
                    true
                }
                _ => false,
            }
        })
    }

    /// The newest notification id, or the first one starting with `prefix`
    pub fn resolve(&self, prefix: Option<&str>) -> Option<String> {
        self.items
            .borrow()
            .iter()
            .filter_map(|item| item.notification_id.as_deref())
            .find(|id| prefix.is_none_or(|prefix| id.starts_with(prefix)))
            .map(str::to_string)
    }

    pub fn unread_count(&self) -> usize {
        self.items.borrow().iter().filter(|item| !item.read).count()
    }
}

/// Connect to a hub and apply every broadcast to `feed` until cancelled or
/// the hub closes the connection. Each click from `clicks` marks the item
/// read and is reported back to the hub.
pub async fn run_companion_listener(
    url: &str,
    origin: &str,
    feed: &NotificationFeed,
    clicks: AsyncReceiver<FeedClick>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut request = url.into_client_request()?;
    request
        .headers_mut()
        .insert("origin", HeaderValue::from_str(origin)?);

    let (ws_stream, _) = connect_async(request).await?;
    tracing::info!("Connected to {url}");
    let (mut write, mut read) = ws_stream.split();
    let mut clicks_open = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            click = clicks.recv(), if clicks_open => match click {
                Ok(click) => {
                    let Some(notification_id) = feed.resolve(click.notification_id.as_deref())
                    else {
                        tracing::warn!("No notification matches {:?}", click.notification_id);
                        continue;
                    };
                    feed.mark_read(&notification_id);

                    let report = CompanionReport::NotificationClicked {
                        notification_id,
                        action: click.action,
                    };
                    write
                        .send(Message::Text(serde_json::to_string(&report)?.into()))
                        .await?;
                }
                Err(_) => clicks_open = false,
            },
            msg = read.next() => match msg {
                Some(Ok(msg)) if msg.is_text() => {
                    let text = msg.to_text()?;
                    match serde_json::from_str::<BroadcastMessage>(text) {
                        Ok(message) => {
                            tracing::info!(
                                "Patient context: {} ({})",
                                message.data.display_name,
                                message.data.id
                            );
                            feed.apply(message);
                        }
                        Err(e) => tracing::debug!("Ignoring hub message: {e}"),
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => {
                    tracing::info!("Hub closed the connection");
                    break;
                }
            },
        }
    }

    Ok(())
}
