use serde::{Deserialize, Serialize};

/// Unverified identifying tokens pulled out of recognized screen text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CandidateIdentity {
    pub fn is_empty(&self) -> bool {
        self.mrn.is_none() && self.name.is_none()
    }
}

/// A patient resolved against the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientMatch {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
}

/// Directory match together with how well it fits the extracted candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub patient: PatientMatch,
    /// In `[0, 1]`
    pub confidence: f64,
}

/// The patient currently considered on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveContext {
    pub patient_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
}

impl From<&PatientMatch> for ActiveContext {
    fn from(patient: &PatientMatch) -> Self {
        Self {
            patient_id: patient.id.clone(),
            display_name: patient.display_name.clone(),
            mrn: patient.mrn.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Which part of a desktop alert the user clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertAction {
    Body,
    ViewAlerts,
    ViewHistory,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    StartMonitoring,
    StopMonitoring,
    ToggleMonitoring,
    MonitoringChanged {
        running: bool,
    },
    /// A click on a desktop alert or a companion-window notification
    AlertInteraction {
        notification_id: String,
        action: AlertAction,
    },
    ShowStatus,
    ShowStats,
    ShowHistory {
        limit: usize,
    },
    ClearHistory,
    Shutdown,
}
