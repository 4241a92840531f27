mod error;
mod stats;
mod storage;
mod store;

pub use error::{HistoryError, Result};
pub use stats::{
    ErrorStats, HistoryStats, PatientAnalysis, PatientFrequency, Performance, RecentActivity,
    SourceStats, TimeAnalysis, compute_stats, compute_stats_in,
};
pub use storage::{HISTORY_KEY, HistoryStorage, JsonFileStorage, MemoryStorage};
pub use store::HistoryStore;
