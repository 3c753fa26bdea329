//! One page-load attempt and its derived totals

use crate::filter::ResourceFilter;
use chrono::{DateTime, Utc};
use pagescope_telemetry::{normalize_batch, RawTimingSample, ResourceRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Derived totals for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub resource_count: usize,
    pub total_bytes: u64,
    /// Wall-clock span from session start to the latest resource end
    pub total_duration_ms: f64,
}

impl SessionTotals {
    pub fn total_duration_secs(&self) -> f64 {
        self.total_duration_ms / 1000.0
    }
}

/// Resources collected for one navigation, in arrival order
#[derive(Debug, Clone)]
pub struct SessionAggregate {
    id: String,
    url: String,
    start_time: DateTime<Utc>,
    resources: Vec<ResourceRecord>,
    urls: HashSet<String>,
    is_loading: bool,
    failure: Option<String>,
    totals: SessionTotals,
    pub filter: ResourceFilter,
}

impl SessionAggregate {
    pub fn new(url: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.into(),
            start_time,
            resources: Vec::new(),
            urls: HashSet::new(),
            is_loading: false,
            failure: None,
            totals: SessionTotals::default(),
            filter: ResourceFilter::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Host of the navigated URL
    pub fn page_host(&self) -> Option<String> {
        pagescope_telemetry::host_of(&self.url)
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn resources(&self) -> &[ResourceRecord] {
        &self.resources
    }

    pub fn totals(&self) -> SessionTotals {
        self.totals
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub(crate) fn set_failure(&mut self, reason: impl Into<String>) {
        self.is_loading = false;
        self.failure = Some(reason.into());
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Normalize raw samples against this session and append the result
    pub fn ingest(&mut self, samples: &[RawTimingSample]) -> Vec<ResourceRecord> {
        let records = normalize_batch(samples, self.start_time, &self.urls);
        self.append(records)
    }

    /// Append records, dropping any whose URL is already present or whose
    /// end time cannot be represented.
    ///
    /// Returns the records actually accepted.
    pub fn append(&mut self, records: Vec<ResourceRecord>) -> Vec<ResourceRecord> {
        let mut accepted = Vec::new();
        let mut spans = Vec::new();
        for record in records {
            let Some(end) = record.end_time() else {
                tracing::debug!(url = %record.url, "dropping record with unrepresentable end time");
                continue;
            };
            if self.urls.insert(record.url.clone()) {
                spans.push(
                    (end - self.start_time).num_microseconds().unwrap_or(0) as f64 / 1000.0,
                );
                accepted.push(record);
            }
        }

        let mut totals = self.totals;
        for (record, span) in accepted.iter().zip(spans) {
            totals.resource_count += 1;
            totals.total_bytes += record.total_bytes();
            if span > totals.total_duration_ms {
                totals.total_duration_ms = span;
            }
        }

        self.resources.extend(accepted.iter().cloned());
        self.totals = totals;
        accepted
    }

    /// Drop all resources and reset totals
    pub fn clear(&mut self) {
        self.resources.clear();
        self.urls.clear();
        self.totals = SessionTotals::default();
    }

    /// Resources admitted by the current filter, in arrival order
    pub fn filtered_resources(&self) -> Vec<&ResourceRecord> {
        self.resources
            .iter()
            .filter(|r| self.filter.matches(r))
            .collect()
    }

    /// Distinct hosts observed in this session
    pub fn domains(&self) -> BTreeSet<String> {
        self.resources.iter().filter_map(|r| r.host()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescope_telemetry::ResourceType;

    fn start() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().unwrap()
    }

    fn sample(url: &str, start_ms: f64, end_ms: f64, size: f64) -> RawTimingSample {
        RawTimingSample {
            url: Some(url.to_string()),
            start_time: Some(start_ms),
            fetch_start: start_ms,
            domain_lookup_start: start_ms,
            domain_lookup_end: start_ms,
            connect_start: start_ms,
            connect_end: start_ms,
            request_start: start_ms,
            response_start: start_ms,
            response_end: end_ms,
            transfer_size: size,
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_use_wall_clock_span() {
        let mut session = SessionAggregate::new("https://a.com/", start());
        session.ingest(&[
            sample("https://a.com/", 0.0, 400.0, 1000.0),
            sample("https://a.com/app.js", 100.0, 500.0, 2000.0),
            sample("https://a.com/img.png", 200.0, 450.0, 500.0),
        ]);

        let totals = session.totals();
        assert_eq!(totals.resource_count, 3);
        assert_eq!(totals.total_bytes, 3500);
        assert_eq!(totals.total_duration_ms, 500.0);
    }

    #[test]
    fn test_duration_never_decreases() {
        let mut session = SessionAggregate::new("https://a.com/", start());
        session.ingest(&[sample("https://a.com/late.js", 0.0, 900.0, 10.0)]);
        let before = session.totals().total_duration_ms;
        session.ingest(&[sample("https://a.com/early.js", 0.0, 50.0, 10.0)]);
        assert!(session.totals().total_duration_ms >= before);
        assert_eq!(session.totals().resource_count, 2);
    }

    #[test]
    fn test_extreme_marks_do_not_halt_ingestion() {
        let mut session = SessionAggregate::new("https://a.com/", start());
        let accepted = session.ingest(&[
            sample("https://a.com/huge.js", 0.0, 1e16, 10.0),
            sample("https://a.com/far.js", 1e17, 1e17 + 10.0, 10.0),
            sample("https://a.com/ok.js", 0.0, 80.0, 10.0),
        ]);
        assert_eq!(accepted.len(), 1);
        assert_eq!(session.totals().resource_count, 1);
        assert_eq!(session.totals().total_duration_ms, 80.0);
        assert!(!session.contains_url("https://a.com/huge.js"));
    }

    #[test]
    fn test_append_skips_unrepresentable_record() {
        let mut session = SessionAggregate::new("https://a.com/", start());
        let mut records = normalize_batch(
            &[sample("https://a.com/x.js", 0.0, 50.0, 10.0)],
            start(),
            &HashSet::new(),
        );
        records[0].timings.receive = 1e16;
        assert!(session.append(records).is_empty());
        assert_eq!(session.totals().resource_count, 0);
    }

    #[test]
    fn test_dedup_across_batches() {
        let mut session = SessionAggregate::new("https://a.com/", start());
        let first = session.ingest(&[sample("https://a.com/x.js", 0.0, 100.0, 10.0)]);
        let second = session.ingest(&[sample("https://a.com/x.js", 0.0, 900.0, 99.0)]);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(session.resources().len(), 1);
        assert_eq!(session.resources()[0].response_size, 10);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut session = SessionAggregate::new("https://a.com/", start());
        session.ingest(&[sample("https://a.com/x.js", 0.0, 100.0, 10.0)]);
        session.clear();
        assert!(session.resources().is_empty());
        assert_eq!(session.totals(), SessionTotals::default());
        assert!(!session.contains_url("https://a.com/x.js"));

        let readded = session.ingest(&[sample("https://a.com/x.js", 0.0, 100.0, 10.0)]);
        assert_eq!(readded.len(), 1);
    }

    #[test]
    fn test_filtered_view_does_not_mutate() {
        let mut session = SessionAggregate::new("https://a.com/", start());
        session.ingest(&[
            sample("https://a.com/x.js", 0.0, 100.0, 10.0),
            sample("https://cdn.b.com/y.css", 0.0, 100.0, 10.0),
        ]);
        session.filter = ResourceFilter::new().only_types([ResourceType::Stylesheet]);

        let filtered = session.filtered_resources();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].url, "https://cdn.b.com/y.css");
        assert_eq!(session.resources().len(), 2);
    }

    #[test]
    fn test_domains() {
        let mut session = SessionAggregate::new("https://a.com/", start());
        session.ingest(&[
            sample("https://a.com/x.js", 0.0, 100.0, 10.0),
            sample("https://cdn.b.com/y.css", 0.0, 100.0, 10.0),
            sample("https://a.com/z.js", 0.0, 100.0, 10.0),
        ]);
        let domains: Vec<_> = session.domains().into_iter().collect();
        assert_eq!(domains, vec!["a.com".to_string(), "cdn.b.com".to_string()]);
    }
}
