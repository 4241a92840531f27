use std::env;

use serde::{Deserialize, Serialize};

use self::capture::CaptureConfig;
use self::directory::DirectoryConfig;
use self::extractor::ExtractorConfig;
use self::history::HistoryConfig;
use self::notify::NotifyConfig;
use self::ocr::OcrConfig;

pub mod capture;
pub mod directory;
pub mod extractor;
pub mod history;
pub mod notify;
pub mod ocr;

fn default_cycle_interval_ms() -> u64 {
    5000
}

fn default_cycle_timeout_ms() -> u64 {
    15000
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub ocr: OcrConfig,
    pub directory: DirectoryConfig,
    pub extractor: ExtractorConfig,
    pub notify: NotifyConfig,
    pub history: HistoryConfig,

    /// Time between detection cycles
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// A cycle running longer than this is abandoned
    #[serde(default = "default_cycle_timeout_ms")]
    pub cycle_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            ocr: OcrConfig::default(),
            directory: DirectoryConfig::default(),
            extractor: ExtractorConfig::default(),
            notify: NotifyConfig::default(),
            history: HistoryConfig::default(),
            cycle_interval_ms: default_cycle_interval_ms(),
            cycle_timeout_ms: default_cycle_timeout_ms(),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn new() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Environment variables win over whatever was loaded from a profile
    pub fn apply_env(&mut self) {
        if let Some(interval) = env::var("CHARTWATCH_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.cycle_interval_ms = interval;
        }

        if let Ok(url) = env::var("CHARTWATCH_DIRECTORY_URL") {
            self.directory.base_url = url;
        }

        if let Ok(token) = env::var("CHARTWATCH_DIRECTORY_TOKEN")
            && !token.is_empty()
        {
            self.directory.token = Some(token);
        }

        if let Ok(addr) = env::var("CHARTWATCH_COMPANION_ADDR") {
            self.notify.companion_addr = addr;
        }
    }
}
