use regex::Regex;

/// Allow-list of WebSocket `Origin` values, `*` matches any run of characters
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    patterns: Vec<Regex>,
}

impl OriginPolicy {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let escaped = pattern
                    .as_ref()
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(".*");
                Regex::new(&format!("^(?i:{escaped})$"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// A missing origin is never allowed
    pub fn allows(&self, origin: Option<&str>) -> bool {
        origin.is_some_and(|origin| self.patterns.iter().any(|p| p.is_match(origin)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_port() {
        let policy = OriginPolicy::new(&["http://localhost:*", "https://ehr.example.org"]).unwrap();
        assert!(policy.allows(Some("http://localhost:5173")));
        assert!(policy.allows(Some("HTTPS://ehr.example.org")));
        assert!(!policy.allows(Some("http://localhost.evil.com")));
        assert!(!policy.allows(Some("https://ehr.example.org.evil.com")));
        assert!(!policy.allows(None));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let policy = OriginPolicy::new(&["app://chart.watch"]).unwrap();
        assert!(policy.allows(Some("app://chart.watch")));
        assert!(!policy.allows(Some("app://chartXwatch")));
    }

    #[test]
    fn test_empty_policy_rejects_all() {
        let policy = OriginPolicy::new::<&str>(&[]).unwrap();
        assert!(!policy.allows(Some("http://localhost:1")));
    }
}
