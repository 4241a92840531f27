use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AlertAction, CaptureRegion, PatientMatch};

/// One "this patient is now active" notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub message: String,
    pub patient_id: String,
    pub patient_display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
    /// Capture source the detection came from
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Created,
    Delivered,
    ClickedAlerts,
    ClickedHistory,
    Error,
}

impl HistoryStatus {
    pub fn is_interaction(self) -> bool {
        matches!(self, Self::ClickedAlerts | Self::ClickedHistory)
    }
}

impl From<AlertAction> for HistoryStatus {
    fn from(action: AlertAction) -> Self {
        match action {
            AlertAction::Body | AlertAction::ViewAlerts => Self::ClickedAlerts,
            AlertAction::ViewHistory => Self::ClickedHistory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: NotificationRecord,
    pub status: HistoryStatus,
    pub match_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_region: Option<CaptureRegion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

/// Fields an interaction event may change on a stored entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusPatch {
    pub status: Option<HistoryStatus>,
    pub read: Option<bool>,
}

impl StatusPatch {
    pub fn status(status: HistoryStatus) -> Self {
        Self {
            status: Some(status),
            read: None,
        }
    }

    pub fn read() -> Self {
        Self {
            status: None,
            read: Some(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    PatientContextUpdated,
}

/// Message sent to every open companion window on a context transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: PatientMatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
}

impl BroadcastMessage {
    pub fn patient_context_updated(data: PatientMatch, notification_id: Option<String>) -> Self {
        Self {
            kind: MessageKind::PatientContextUpdated,
            data,
            notification_id,
        }
    }
}

/// Messages a companion window sends back to the background process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanionReport {
    #[serde(rename_all = "camelCase")]
    NotificationClicked {
        notification_id: String,
        action: AlertAction,
    },
}
