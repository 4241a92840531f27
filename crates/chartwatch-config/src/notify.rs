use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

fn default_alert_program() -> String {
    "notify-send".to_string()
}

fn default_app_name() -> String {
    "ChartWatch".to_string()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8765".to_string()
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:*".to_string(),
        "http://127.0.0.1:*".to_string(),
    ]
}

fn default_queue_capacity() -> usize {
    32
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NotifyConfig {
    #[serde(default = "default_enabled")]
    pub desktop_alerts: bool,
    #[serde(default = "default_alert_program")]
    pub alert_program: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Address the companion-window WebSocket hub listens on
    #[serde(default = "default_listen_addr")]
    pub companion_addr: String,
    /// Origin patterns companion windows must match, `*` is a wildcard
    #[serde(default = "default_origins")]
    pub companion_origins: Vec<String>,
    /// Outbound messages buffered per companion window
    #[serde(default = "default_queue_capacity")]
    pub companion_queue: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            desktop_alerts: default_enabled(),
            alert_program: default_alert_program(),
            app_name: default_app_name(),
            companion_addr: default_listen_addr(),
            companion_origins: default_origins(),
            companion_queue: default_queue_capacity(),
        }
    }
}
