use chartwatch_config::extractor::ExtractorConfig;
use chartwatch_types::CandidateIdentity;
use regex::Regex;

use crate::preprocess::{DefaultPreprocessor, Preprocessor};

/// Turns recognized screen text into identity tokens.
///
/// Implementations must be pure and never fail: unusable input yields an
/// empty [`CandidateIdentity`].
pub trait IdentityExtractor: Send + Sync {
    fn extract(&self, raw_text: &str) -> CandidateIdentity;
}

/// Words that commonly follow a patient name on chart headers and get
/// swallowed by the name pattern.
const TRAILING_LABELS: &[&str] = &["DOB", "MRN", "Age", "Sex", "Gender", "Room", "Bed", "ID"];

/// Label-driven extraction: an MRN after `MRN`/`MR#`/`Medical Record Number`,
/// a name only after `Patient:`/`Name:`.
pub struct PatternExtractor {
    mrn: Regex,
    name: Regex,
}

impl PatternExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            mrn: Regex::new(&config.mrn_pattern)?,
            name: Regex::new(&config.name_pattern)?,
        })
    }

    fn find_mrn(&self, text: &str) -> Option<String> {
        self.mrn
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim_matches('-').to_string())
            .find(|mrn| !mrn.is_empty())
    }

    fn find_name(&self, text: &str) -> Option<String> {
        self.name
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| normalize_name(m.as_str()))
    }
}

impl IdentityExtractor for PatternExtractor {
    fn extract(&self, raw_text: &str) -> CandidateIdentity {
        let text = DefaultPreprocessor.process(raw_text);
        if text.is_empty() {
            return CandidateIdentity::default();
        }

        CandidateIdentity {
            mrn: self.find_mrn(&text),
            name: self.find_name(&text),
        }
    }
}

/// Drop trailing header labels and turn `Last, First` into `First Last`
fn normalize_name(raw: &str) -> Option<String> {
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    while let Some(&last) = words.last() {
        let bare = last.trim_end_matches([',', ':']);
        if TRAILING_LABELS.iter().any(|label| label.eq_ignore_ascii_case(bare)) {
            words.pop();
        } else {
            break;
        }
    }

    let joined = words.join(" ");
    let name = match joined.split_once(',') {
        Some((last, first)) if !first.trim().is_empty() => {
            format!("{} {}", first.trim(), last.trim())
        }
        _ => joined.trim_end_matches(',').to_string(),
    };

    // A single word is too weak to be a name
    if name.split_whitespace().count() < 2 {
        None
    } else {
        Some(name)
    }
}
