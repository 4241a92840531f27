use chrono::{DateTime, Utc};
use serde::Serialize;

/// Monitoring counters, shown by the `status` command
#[derive(Clone, Debug, Default, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub cycles_run: u64,
    pub cycles_failed: u64,
    /// Cycles that found no identity or no directory match
    pub cycles_skipped: u64,
    pub notifications_sent: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
