use std::sync::Arc;

use chartwatch_history::HistoryStore;
use chartwatch_types::{
    AlertAction, BroadcastMessage, CaptureRegion, HistoryEntry, HistoryStatus,
    NotificationRecord, PatientMatch, StatusPatch,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;

/// One independent recipient of a broadcast, e.g. an open companion window.
///
/// `send` must not wait for the recipient; it either hands the message off
/// or reports [`Error::DeliveryFailed`](crate::Error::DeliveryFailed).
pub trait Destination: Send + Sync {
    fn name(&self) -> String;

    fn send(&self, message: &BroadcastMessage) -> Result<()>;
}

/// Enumerates the destinations that are open right now
pub trait DestinationRegistry: Send + Sync {
    fn destinations(&self) -> Vec<Arc<dyn Destination>>;
}

/// Fixed list of destinations
impl DestinationRegistry for Vec<Arc<dyn Destination>> {
    fn destinations(&self) -> Vec<Arc<dyn Destination>> {
        self.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesktopAlert {
    /// Unique per dispatch, clicks are reported back with it
    pub id: String,
    pub title: String,
    pub body: String,
    pub actions: Vec<(AlertAction, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Shown,
    /// No notifier or no permission, not an error
    Skipped,
}

pub trait AlertSink: Send + Sync {
    fn alert(&self, alert: &DesktopAlert) -> Result<AlertOutcome>;
}

/// Where the detection came from, copied onto the history entry
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    pub source: String,
    pub app_name: Option<String>,
    pub confidence: f64,
    pub raw_text: Option<String>,
    pub screen_region: Option<CaptureRegion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub notification_id: String,
    /// The entry reached the history storage backend. It is in the
    /// in-memory history either way.
    pub persisted: bool,
    pub alert: Option<AlertOutcome>,
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

impl DispatchReport {
    /// Status the history entry ends up with after fan-out
    fn final_status(&self) -> Option<HistoryStatus> {
        let any_success = self.alert == Some(AlertOutcome::Shown) || !self.delivered.is_empty();
        if any_success {
            Some(HistoryStatus::Delivered)
        } else if !self.failed.is_empty() {
            Some(HistoryStatus::Error)
        } else {
            None
        }
    }
}

/// Fans a context transition out to history, the desktop and companion windows.
///
/// Each destination is isolated: a failure is logged and the remaining
/// destinations are still attempted.
pub struct Dispatcher {
    history: Arc<HistoryStore>,
    alerts: Option<Arc<dyn AlertSink>>,
    companions: Arc<dyn DestinationRegistry>,
    app_name: String,
}

impl Dispatcher {
    pub fn new(
        history: Arc<HistoryStore>,
        alerts: Option<Arc<dyn AlertSink>>,
        companions: Arc<dyn DestinationRegistry>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            history,
            alerts,
            companions,
            app_name: app_name.into(),
        }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub async fn dispatch(&self, patient: &PatientMatch, ctx: DispatchContext) -> DispatchReport {
        let entry = self.build_entry(patient, &ctx);
        let notification_id = entry.record.id.clone();

        let mut report = DispatchReport {
            notification_id: notification_id.clone(),
            persisted: false,
            alert: None,
            delivered: Vec::new(),
            failed: Vec::new(),
        };

        let alert = DesktopAlert {
            id: notification_id.clone(),
            title: entry.record.title.clone(),
            body: entry.record.message.clone(),
            actions: vec![
                (AlertAction::ViewAlerts, "View alerts".to_string()),
                (AlertAction::ViewHistory, "View history".to_string()),
            ],
        };

        // History first, so the dispatch is on record even if delivery fails
        match self.history.append(entry).await {
            Ok(()) => report.persisted = true,
            Err(e) => tracing::error!("Failed to persist notification {notification_id}: {e}"),
        }

        if let Some(sink) = &self.alerts {
            match sink.alert(&alert) {
                Ok(outcome) => {
                    if outcome == AlertOutcome::Skipped {
                        tracing::debug!("Desktop alert skipped");
                    }
                    report.alert = Some(outcome);
                }
                Err(e) => {
                    tracing::warn!("Desktop alert failed: {e}");
                    report.failed.push("desktop".to_string());
                }
            }
        }

        let message = BroadcastMessage::patient_context_updated(
            patient.clone(),
            Some(notification_id.clone()),
        );
        for destination in self.companions.destinations() {
            let name = destination.name();
            match destination.send(&message) {
                Ok(()) => report.delivered.push(name),
                Err(e) => {
                    tracing::warn!("Companion delivery failed: {e}");
                    report.failed.push(name);
                }
            }
        }

        if let Some(status) = report.final_status()
            && let Err(e) = self
                .history
                .update_status(&notification_id, StatusPatch::status(status))
                .await
        {
            tracing::warn!("Failed to record delivery status for {notification_id}: {e}");
        }

        tracing::info!(
            "Dispatched {} for patient {}: {} delivered, {} failed",
            notification_id,
            patient.id,
            report.delivered.len(),
            report.failed.len()
        );

        report
    }

    fn build_entry(&self, patient: &PatientMatch, ctx: &DispatchContext) -> HistoryEntry {
        let message = match &patient.mrn {
            Some(mrn) => format!("{} (MRN {mrn}) is now the active patient", patient.display_name),
            None => format!("{} is now the active patient", patient.display_name),
        };

        HistoryEntry {
            record: NotificationRecord {
                id: Uuid::new_v4().to_string(),
                created_at: Utc::now(),
                title: format!("{}: patient detected", self.app_name),
                message,
                patient_id: patient.id.clone(),
                patient_display_name: patient.display_name.clone(),
                mrn: patient.mrn.clone(),
                source: ctx.source.clone(),
                app_name: ctx.app_name.clone(),
                read: false,
            },
            status: HistoryStatus::Created,
            match_confidence: ctx.confidence.clamp(0.0, 1.0),
            raw_text: ctx.raw_text.clone(),
            screen_region: ctx.screen_region,
            last_updated: None,
        }
    }
}
