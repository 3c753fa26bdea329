//! Display filter over a session's resources

use pagescope_telemetry::{ResourceRecord, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Resource filter. The default admits everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceFilter {
    /// Case-insensitive URL substring; empty matches all
    pub search_text: String,
    /// Included resource types
    pub resource_types: BTreeSet<ResourceType>,
    /// Included hosts; empty means no domain restriction
    pub domains: BTreeSet<String>,
}

impl ResourceFilter {
    pub fn new() -> Self {
        Self {
            search_text: String::new(),
            resource_types: ResourceType::ALL.into_iter().collect(),
            domains: BTreeSet::new(),
        }
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn only_types(mut self, types: impl IntoIterator<Item = ResourceType>) -> Self {
        self.resource_types = types.into_iter().collect();
        self
    }

    pub fn only_domains<S: Into<String>>(mut self, domains: impl IntoIterator<Item = S>) -> Self {
        self.domains = domains
            .into_iter()
            .map(|d| d.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn matches(&self, record: &ResourceRecord) -> bool {
        if !self.search_text.is_empty()
            && !record
                .url
                .to_lowercase()
                .contains(&self.search_text.to_lowercase())
        {
            return false;
        }

        if !self.resource_types.contains(&record.resource_type) {
            return false;
        }

        if !self.domains.is_empty() {
            match record.host() {
                Some(host) if self.domains.iter().any(|d| d.eq_ignore_ascii_case(&host)) => {}
                _ => return false,
            }
        }

        true
    }
}

impl Default for ResourceFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescope_telemetry::TimingPhases;

    fn record(url: &str, resource_type: ResourceType) -> ResourceRecord {
        ResourceRecord {
            id: url.to_string(),
            url: url.to_string(),
            method: "GET".to_string(),
            status_code: 200,
            mime_type: None,
            resource_type,
            start_time: chrono::Utc::now(),
            timings: TimingPhases::default(),
            request_size: 0,
            response_size: 0,
            request_headers: None,
            response_headers: None,
            response_body: None,
        }
    }

    #[test]
    fn test_default_admits_everything() {
        let filter = ResourceFilter::default();
        for t in ResourceType::ALL {
            assert!(filter.matches(&record("https://a.com/x", t)));
        }
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let filter = ResourceFilter::new().with_search("ANALYTICS");
        assert!(filter.matches(&record("https://cdn.com/analytics.js", ResourceType::Script)));
        assert!(!filter.matches(&record("https://cdn.com/app.js", ResourceType::Script)));
    }

    #[test]
    fn test_type_membership() {
        let filter = ResourceFilter::new().only_types([ResourceType::Image, ResourceType::Font]);
        assert!(filter.matches(&record("https://a.com/x.png", ResourceType::Image)));
        assert!(!filter.matches(&record("https://a.com/x.js", ResourceType::Script)));
    }

    #[test]
    fn test_domain_membership() {
        let filter = ResourceFilter::new().only_domains(["B.com"]);
        assert!(filter.matches(&record("https://b.com/x.js", ResourceType::Script)));
        assert!(!filter.matches(&record("https://a.com/x.js", ResourceType::Script)));
        assert!(!filter.matches(&record("not a url", ResourceType::Script)));
    }

    #[test]
    fn test_domain_set_directly_is_case_insensitive() {
        let mut filter = ResourceFilter::new();
        filter.domains.insert("CDN.Example.com".to_string());
        assert!(filter.matches(&record("https://cdn.example.com/x.js", ResourceType::Script)));
        assert!(!filter.matches(&record("https://example.com/x.js", ResourceType::Script)));
    }
}
