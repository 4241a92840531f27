use std::collections::HashSet;
use std::sync::Arc;

use chartwatch_core::{Error, Result};
use chartwatch_types::{CandidateIdentity, PatientMatch, ScoredMatch};

use crate::{DirectoryQuery, DirectoryRecord, PatientDirectory};

/// Resolves an extracted candidate to a directory patient
#[async_trait::async_trait]
pub trait PatientMatcher: Send + Sync {
    /// `Ok(None)` when the directory knows no such patient.
    /// An empty candidate is [`Error::MissingIdentity`].
    async fn match_candidate(&self, candidate: &CandidateIdentity) -> Result<Option<ScoredMatch>>;
}

pub struct DirectoryMatcher {
    directory: Arc<dyn PatientDirectory>,
    min_confidence: f64,
}

impl DirectoryMatcher {
    pub fn new(directory: Arc<dyn PatientDirectory>, min_confidence: f64) -> Self {
        Self {
            directory,
            min_confidence,
        }
    }

    fn query_for(candidate: &CandidateIdentity) -> Option<DirectoryQuery> {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        non_blank(&candidate.mrn)
            .map(DirectoryQuery::Mrn)
            .or_else(|| non_blank(&candidate.name).map(DirectoryQuery::Name))
    }
}

#[async_trait::async_trait]
impl PatientMatcher for DirectoryMatcher {
    async fn match_candidate(&self, candidate: &CandidateIdentity) -> Result<Option<ScoredMatch>> {
        let query = Self::query_for(candidate).ok_or(Error::MissingIdentity)?;

        let records = self.directory.search(&query).await?;
        let Some(record) = records.into_iter().next() else {
            tracing::debug!("Directory has no patient for {query:?}");
            return Ok(None);
        };

        let confidence = score(&query, &record);
        if confidence < self.min_confidence {
            tracing::debug!(
                "Match {} scored {confidence:.2}, below {:.2}",
                record.id,
                self.min_confidence
            );
            return Ok(None);
        }

        Ok(Some(ScoredMatch {
            patient: PatientMatch::from(record),
            confidence,
        }))
    }
}

fn name_tokens(name: &str) -> HashSet<String> {
    name.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// How well `record` fits the query that found it, in `[0, 1]`
pub fn score(query: &DirectoryQuery, record: &DirectoryRecord) -> f64 {
    match query {
        DirectoryQuery::Mrn(mrn) => {
            if record.mrn.as_deref().map(str::trim) == Some(mrn.as_str()) {
                1.0
            } else {
                0.5
            }
        }
        DirectoryQuery::Name(name) => {
            let wanted = name_tokens(name);
            let found = name_tokens(&record.display_name);
            if wanted.is_empty() || found.is_empty() {
                return 0.0;
            }
            let shared = wanted.intersection(&found).count();
            shared as f64 / wanted.len().max(found.len()) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::DirectoryError;

    #[derive(Default)]
    struct FakeDirectory {
        records: Vec<DirectoryRecord>,
        fail: bool,
        queries: Mutex<Vec<DirectoryQuery>>,
    }

    #[async_trait::async_trait]
    impl PatientDirectory for FakeDirectory {
        async fn search(
            &self,
            query: &DirectoryQuery,
        ) -> std::result::Result<Vec<DirectoryRecord>, DirectoryError> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail {
                return Err(DirectoryError::Unauthorized);
            }
            Ok(self.records.clone())
        }
    }

    fn record(id: &str, name: &str, mrn: Option<&str>) -> DirectoryRecord {
        DirectoryRecord {
            id: id.to_string(),
            display_name: name.to_string(),
            mrn: mrn.map(str::to_string),
        }
    }

    fn candidate(mrn: Option<&str>, name: Option<&str>) -> CandidateIdentity {
        CandidateIdentity {
            mrn: mrn.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    fn matcher(directory: &Arc<FakeDirectory>, min_confidence: f64) -> DirectoryMatcher {
        DirectoryMatcher::new(directory.clone(), min_confidence)
    }

    #[tokio::test]
    async fn test_mrn_preferred_single_lookup() {
        let directory = Arc::new(FakeDirectory {
            records: vec![
                record("p1", "John Smith", Some("12345")),
                record("p2", "Johnny Smith", Some("12345")),
            ],
            ..FakeDirectory::default()
        });

        let found = matcher(&directory, 0.0)
            .match_candidate(&candidate(Some("12345"), Some("John Smith")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.patient.id, "p1");
        assert_eq!(found.confidence, 1.0);
        assert_eq!(
            *directory.queries.lock().unwrap(),
            vec![DirectoryQuery::Mrn("12345".to_string())]
        );
    }

    #[tokio::test]
    async fn test_name_fallback() {
        let directory = Arc::new(FakeDirectory {
            records: vec![record("p1", "John Smith", None)],
            ..FakeDirectory::default()
        });

        let found = matcher(&directory, 0.0)
            .match_candidate(&candidate(None, Some("John Smith")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.confidence, 1.0);
        assert_eq!(
            *directory.queries.lock().unwrap(),
            vec![DirectoryQuery::Name("John Smith".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_candidate_sends_nothing() {
        let directory = Arc::new(FakeDirectory::default());
        let result = matcher(&directory, 0.0)
            .match_candidate(&candidate(None, Some("  ")))
            .await;

        assert!(matches!(result, Err(Error::MissingIdentity)));
        assert!(directory.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_records_is_none() {
        let directory = Arc::new(FakeDirectory::default());
        let result = matcher(&directory, 0.0)
            .match_candidate(&candidate(Some("999"), None))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_directory_failure_is_lookup_failed() {
        let directory = Arc::new(FakeDirectory {
            fail: true,
            ..FakeDirectory::default()
        });
        let result = matcher(&directory, 0.0)
            .match_candidate(&candidate(Some("12345"), None))
            .await;
        assert!(matches!(result, Err(Error::LookupFailed(_))));
    }

    #[tokio::test]
    async fn test_min_confidence_drops_weak_match() {
        let directory = Arc::new(FakeDirectory {
            records: vec![record("p1", "John Smithers", None)],
            ..FakeDirectory::default()
        });

        let weak = candidate(None, Some("John Smith"));
        assert!(
            matcher(&directory, 0.0)
                .match_candidate(&weak)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            matcher(&directory, 0.8)
                .match_candidate(&weak)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_score() {
        let mrn = DirectoryQuery::Mrn("12345".to_string());
        assert_eq!(score(&mrn, &record("p", "X Y", Some("12345"))), 1.0);
        assert_eq!(score(&mrn, &record("p", "X Y", Some("54321"))), 0.5);
        assert_eq!(score(&mrn, &record("p", "X Y", None)), 0.5);

        let name = DirectoryQuery::Name("John Smith".to_string());
        assert_eq!(score(&name, &record("p", "Smith, John", None)), 1.0);
        assert_eq!(score(&name, &record("p", "John A Smith", None)), 2.0 / 3.0);
        assert_eq!(score(&name, &record("p", "Ada Lovelace", None)), 0.0);
    }
}
