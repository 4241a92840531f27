use std::time::Duration;

use chartwatch_config::directory::DirectoryConfig;
use serde::Deserialize;

use crate::{DirectoryError, DirectoryQuery, DirectoryRecord, PatientDirectory};

/// Patient search over the clinic's REST directory
#[derive(Clone)]
pub struct HttpDirectory {
    search_url: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpDirectory {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            search_url: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                config.search_path
            ),
            token: config.token.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            client: reqwest::Client::new(),
        }
    }

    pub fn build_request(&self, query: &DirectoryQuery) -> reqwest::RequestBuilder {
        let (key, value) = match query {
            DirectoryQuery::Mrn(mrn) => ("mrn", mrn),
            DirectoryQuery::Name(name) => ("name", name),
        };

        let request = self
            .client
            .get(&self.search_url)
            .query(&[(key, value)])
            .timeout(self.timeout);

        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Directories answer with a bare array or wrap it in an object
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    List(Vec<DirectoryRecord>),
    Wrapped {
        #[serde(alias = "results", alias = "data")]
        patients: Vec<DirectoryRecord>,
    },
}

impl SearchResponse {
    fn into_records(self) -> Vec<DirectoryRecord> {
        match self {
            Self::List(records) | Self::Wrapped { patients: records } => records,
        }
    }
}

pub(crate) fn parse_records(body: &str) -> Result<Vec<DirectoryRecord>, DirectoryError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response.into_records())
}

#[async_trait::async_trait]
impl PatientDirectory for HttpDirectory {
    async fn search(&self, query: &DirectoryQuery) -> Result<Vec<DirectoryRecord>, DirectoryError> {
        let response = self.build_request(query).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DirectoryError::Unauthorized);
        }
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_records(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(token: Option<&str>) -> HttpDirectory {
        HttpDirectory::new(&DirectoryConfig {
            base_url: "https://ehr.example.org/".to_string(),
            token: token.map(str::to_string),
            ..DirectoryConfig::default()
        })
    }

    #[test]
    fn test_mrn_query_url() {
        let request = directory(None)
            .build_request(&DirectoryQuery::Mrn("12345".to_string()))
            .build()
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://ehr.example.org/patients/search?mrn=12345"
        );
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_name_query_is_encoded_with_token() {
        let request = directory(Some("secret"))
            .build_request(&DirectoryQuery::Name("John Smith".to_string()))
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("name=John+Smith"));
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer secret"
        );
    }

    #[test]
    fn test_parse_bare_and_wrapped() {
        let bare = parse_records(r#"[{"id":"p1","name":"John Smith","mrn":"12345"}]"#).unwrap();
        assert_eq!(bare[0].id, "p1");

        let wrapped =
            parse_records(r#"{"results":[{"id":"p2","displayName":"Jane Doe"}]}"#).unwrap();
        assert_eq!(wrapped[0].display_name, "Jane Doe");
        assert_eq!(wrapped[0].mrn, None);

        assert!(parse_records(r#"{"patients":[]}"#).unwrap().is_empty());

        // Several name fields at once, the most specific wins
        let both = parse_records(
            r#"[{
                "patientId": "p3",
                "name": "SMITH, J",
                "fullName": "John Smith",
                "medicalRecordNumber": "9"
            }]"#,
        )
        .unwrap();
        assert_eq!(both[0].id, "p3");
        assert_eq!(both[0].display_name, "John Smith");
        assert_eq!(both[0].mrn.as_deref(), Some("9"));

        assert!(parse_records(r#"[{"id":"p4"}]"#).is_err());
        assert!(parse_records("not json").is_err());
    }
}
