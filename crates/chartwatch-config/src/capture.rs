use std::path::PathBuf;

use chartwatch_types::CaptureRegion;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureBackend {
    /// Still image kept fresh by an external screenshot tool
    #[default]
    File,
    /// Primary monitor
    Screen,
    /// Window matched by `target_window`
    Window,
}

fn default_image_path() -> PathBuf {
    PathBuf::from("screen.png")
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CaptureConfig {
    pub backend: CaptureBackend,
    #[serde(default = "default_image_path")]
    pub image_path: PathBuf,
    pub target_window: Option<String>,
    pub region: Option<CaptureRegion>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            backend: CaptureBackend::default(),
            image_path: default_image_path(),
            target_window: None,
            region: None,
        }
    }
}
