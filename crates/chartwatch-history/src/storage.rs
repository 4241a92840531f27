use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chartwatch_types::HistoryEntry;

use crate::error::Result;

/// Well-known name the history collection is stored under
pub const HISTORY_KEY: &str = "notification_history";

/// Get-all / set-all persistence for the history collection
#[async_trait::async_trait]
pub trait HistoryStorage: Send + Sync {
    async fn load(&self) -> Result<Vec<HistoryEntry>>;

    async fn save(&self, entries: &[HistoryEntry]) -> Result<()>;
}

/// Stores the whole collection as one JSON array on disk
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/notification_history.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{HISTORY_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl HistoryStorage for JsonFileStorage {
    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(entries)?;

        // Write next to the target and rename so readers never see half a file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Keeps the collection in memory, nothing survives the process
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl HistoryStorage for MemoryStorage {
    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.snapshot())
    }

    async fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Ok(mut stored) = self.entries.lock() {
            *stored = entries.to_vec();
        }
        Ok(())
    }
}
