use serde::{Deserialize, Serialize};

pub const DEFAULT_MRN_PATTERN: &str =
    r"(?i:\bMRN|\bMR\s*#|\bmedical\s+record(?:\s+(?:number|no\.?|#))?)\s*[:#]?\s*([A-Z]{0,3}\d[\d-]{2,19})\b";

pub const DEFAULT_NAME_PATTERN: &str = r"(?i:\bpatient(?:\s+name)?|\bname)[ \t]*:[ \t]*([A-Z][A-Za-z'-]+(?:,?[ \t]+[A-Z][A-Za-z'-]+){1,3})";

fn default_mrn_pattern() -> String {
    DEFAULT_MRN_PATTERN.to_string()
}

fn default_name_pattern() -> String {
    DEFAULT_NAME_PATTERN.to_string()
}

/// Regexes used to pull identity tokens out of recognized text.
/// Each pattern must have one capture group holding the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractorConfig {
    #[serde(default = "default_mrn_pattern")]
    pub mrn_pattern: String,
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            mrn_pattern: default_mrn_pattern(),
            name_pattern: default_name_pattern(),
        }
    }
}
