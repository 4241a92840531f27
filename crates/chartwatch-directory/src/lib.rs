mod client;
mod matcher;

pub use client::HttpDirectory;
pub use matcher::{DirectoryMatcher, PatientMatcher, score};

use chartwatch_types::PatientMatch;
use serde::Deserialize;

/// Exactly one lookup key is sent per search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryQuery {
    Mrn(String),
    Name(String),
}

/// A patient as the directory returns it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WireRecord")]
pub struct DirectoryRecord {
    pub id: String,
    pub display_name: String,
    pub mrn: Option<String>,
}

/// Directories disagree on field names and some send several at once
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, alias = "patient_id")]
    patient_id: Option<String>,
    #[serde(default, alias = "display_name")]
    display_name: Option<String>,
    #[serde(default, alias = "full_name")]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "medicalRecordNumber")]
    mrn: Option<String>,
}

impl TryFrom<WireRecord> for DirectoryRecord {
    type Error = String;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .or(wire.patient_id)
            .ok_or_else(|| "record without an id".to_string())?;
        let display_name = [wire.display_name, wire.full_name, wire.name]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .ok_or_else(|| format!("record {id} has no name"))?;

        Ok(Self {
            id,
            display_name,
            mrn: wire.mrn,
        })
    }
}

impl From<DirectoryRecord> for PatientMatch {
    fn from(record: DirectoryRecord) -> Self {
        Self {
            id: record.id,
            display_name: record.display_name,
            mrn: record.mrn,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("directory rejected the credentials")]
    Unauthorized,

    #[error("directory answered with status {0}")]
    Status(u16),

    #[error("unexpected response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<DirectoryError> for chartwatch_core::Error {
    fn from(e: DirectoryError) -> Self {
        chartwatch_core::Error::LookupFailed(e.to_string())
    }
}

/// Patient search backend
#[async_trait::async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn search(&self, query: &DirectoryQuery) -> Result<Vec<DirectoryRecord>, DirectoryError>;
}
