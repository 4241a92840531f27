use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const HISTORY_CAPACITY: usize = 100;

fn default_capacity() -> usize {
    HISTORY_CAPACITY
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// History file, defaults to `notification_history.json` in the platform data dir
    pub path: Option<PathBuf>,
    /// Keep recognized text on history entries
    pub keep_raw_text: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            path: None,
            keep_raw_text: false,
        }
    }
}
