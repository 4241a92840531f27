use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    #[default]
    Tesseract,
    /// Windows.Media.Ocr, only available on Windows builds
    Windows,
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: OcrBackend,
    /// Language profile loaded at initialization ("eng" for tesseract, "en" for Windows)
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::default(),
            language: default_language(),
            tesseract_path: default_tesseract_path(),
        }
    }
}
