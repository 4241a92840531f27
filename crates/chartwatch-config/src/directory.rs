use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "http://localhost:8103".to_string()
}

fn default_search_path() -> String {
    "/patients/search".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DirectoryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    /// Bearer token handed over by whoever owns authentication
    pub token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Matches scoring below this are ignored. 0.0 accepts every match.
    pub min_confidence: f64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_path: default_search_path(),
            token: None,
            timeout_ms: default_timeout_ms(),
            min_confidence: 0.0,
        }
    }
}
