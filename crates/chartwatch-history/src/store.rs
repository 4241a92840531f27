use std::sync::Arc;

use chartwatch_types::{HistoryEntry, StatusPatch};
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::stats::{HistoryStats, compute_stats};
use crate::storage::{HistoryStorage, MemoryStorage};

/// Bounded, newest-first notification history.
///
/// Every mutation is written through to the storage backend as a whole
/// collection. A failed write is returned to the caller but the in-memory
/// change stays, so a dispatch is never lost from the running process.
pub struct HistoryStore {
    entries: RwLock<Vec<HistoryEntry>>,
    capacity: usize,
    storage: Arc<dyn HistoryStorage>,
}

impl HistoryStore {
    /// Load whatever the storage already holds, trimmed to `capacity`
    pub async fn open(storage: Arc<dyn HistoryStorage>, capacity: usize) -> Result<Self> {
        let mut entries = storage.load().await?;
        entries.truncate(capacity);
        tracing::debug!("Loaded {} history entries", entries.len());

        Ok(Self {
            entries: RwLock::new(entries),
            capacity,
            storage,
        })
    }

    pub fn in_memory(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            capacity,
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert at the front, evicting the oldest entries beyond capacity
    pub async fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(0, entry);
        if entries.len() > self.capacity {
            let evicted = entries.len() - self.capacity;
            entries.truncate(self.capacity);
            tracing::trace!("Evicted {} history entries", evicted);
        }
        self.storage.save(&entries).await
    }

    /// Merge `patch` into the entry with `id` and stamp `last_updated`.
    /// Returns `false` without touching storage when no entry has that id.
    pub async fn update_status(&self, id: &str, patch: StatusPatch) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.iter_mut().find(|e| e.id() == id) else {
            return Ok(false);
        };

        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(read) = patch.read {
            entry.record.read = read;
        }
        entry.last_updated = Some(Utc::now());

        self.storage.save(&entries).await?;
        Ok(true)
    }

    pub async fn mark_read(&self, id: &str) -> Result<bool> {
        self.update_status(id, StatusPatch::read()).await
    }

    /// Newest first
    pub async fn get_all(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.clone()
    }

    pub async fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries.read().await.iter().take(limit).cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<HistoryEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.id() == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.storage.save(&entries).await
    }

    /// Statistics over the current snapshot, bucketed by local hour
    pub async fn compute_stats(&self) -> HistoryStats {
        let entries = self.entries.read().await;
        compute_stats(&entries, Utc::now())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chartwatch_types::{HistoryStatus, NotificationRecord};
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::error::HistoryError;

    /// Entry created `minutes_ago` minutes before a fixed reference time
    pub(crate) fn entry(id: &str, patient_id: &str, minutes_ago: i64) -> HistoryEntry {
        let reference = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        HistoryEntry {
            record: NotificationRecord {
                id: id.to_string(),
                created_at: reference - Duration::minutes(minutes_ago),
                title: "Patient context".to_string(),
                message: format!("{patient_id} is now active"),
                patient_id: patient_id.to_string(),
                patient_display_name: format!("Patient {patient_id}"),
                mrn: None,
                source: "screen".to_string(),
                app_name: None,
                read: false,
            },
            status: HistoryStatus::Created,
            match_confidence: 1.0,
            raw_text: None,
            screen_region: None,
            last_updated: None,
        }
    }

    struct FailingStorage;

    #[async_trait::async_trait]
    impl HistoryStorage for FailingStorage {
        async fn load(&self) -> Result<Vec<HistoryEntry>> {
            Ok(Vec::new())
        }

        async fn save(&self, _entries: &[HistoryEntry]) -> Result<()> {
            Err(HistoryError::Io(std::io::Error::other("disk full")))
        }
    }

    #[tokio::test]
    async fn test_append_is_newest_first() {
        let store = HistoryStore::in_memory(100);
        store.append(entry("n-1", "pat-1", 10)).await.unwrap();
        store.append(entry("n-2", "pat-2", 5)).await.unwrap();

        let all = store.get_all().await;
        assert_eq!(all[0].id(), "n-2");
        assert_eq!(all[1].id(), "n-1");
    }

    #[tokio::test]
    async fn test_bound_evicts_oldest() {
        let store = HistoryStore::in_memory(100);
        for i in 0..101 {
            store
                .append(entry(&format!("n-{i}"), "pat-1", 200 - i))
                .await
                .unwrap();
        }

        let all = store.get_all().await;
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].id(), "n-100");
        assert_eq!(all[99].id(), "n-1");
        assert!(all.iter().all(|e| e.id() != "n-0"));
    }

    #[tokio::test]
    async fn test_update_status_merges_and_stamps() {
        let store = HistoryStore::in_memory(100);
        store.append(entry("n-1", "pat-1", 0)).await.unwrap();

        let found = store
            .update_status("n-1", StatusPatch::status(HistoryStatus::ClickedHistory))
            .await
            .unwrap();
        assert!(found);

        let updated = store.get("n-1").await.unwrap();
        assert_eq!(updated.status, HistoryStatus::ClickedHistory);
        assert!(!updated.record.read);
        assert!(updated.last_updated.is_some());

        store.mark_read("n-1").await.unwrap();
        let updated = store.get("n-1").await.unwrap();
        assert!(updated.record.read);
        assert_eq!(updated.status, HistoryStatus::ClickedHistory);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_noop() {
        let store = HistoryStore::in_memory(100);
        store.append(entry("n-1", "pat-1", 0)).await.unwrap();

        let found = store
            .update_status("missing", StatusPatch::status(HistoryStatus::Error))
            .await
            .unwrap();
        assert!(!found);
        assert_eq!(store.get("n-1").await.unwrap().status, HistoryStatus::Created);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_entry() {
        let store = HistoryStore::open(Arc::new(FailingStorage), 100)
            .await
            .unwrap();
        assert!(store.append(entry("n-1", "pat-1", 0)).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_open_trims_and_persists() {
        let storage = Arc::new(MemoryStorage::with_entries(vec![
            entry("n-3", "pat-1", 0),
            entry("n-2", "pat-1", 1),
            entry("n-1", "pat-1", 2),
        ]));
        let store = HistoryStore::open(storage.clone(), 2).await.unwrap();
        assert_eq!(store.len().await, 2);

        store.append(entry("n-4", "pat-2", 0)).await.unwrap();
        let saved = storage.snapshot();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].id(), "n-4");
        assert_eq!(saved[1].id(), "n-3");

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
        assert!(storage.snapshot().is_empty());
    }
}
