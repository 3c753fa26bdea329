use chrono::{DateTime, Utc};
use pagescope_core::{PerformanceScore, SessionAggregate, SessionTotals, UxMetrics};
use pagescope_telemetry::ResourceRecord;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentSession {
    pub id: String,
    pub url: String,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub resources: Vec<ResourceRecord>,
    pub totals: SessionTotals,
    #[serde(default)]
    pub failure: Option<String>,
    #[serde(default)]
    pub ux_metrics: Option<UxMetrics>,
    #[serde(default)]
    pub score: Option<PerformanceScore>,
}

impl PersistentSession {
    /// Snapshot a session, stamped now
    pub fn from_aggregate(
        session: &SessionAggregate,
        tags: Vec<String>,
        ux_metrics: Option<UxMetrics>,
        score: Option<PerformanceScore>,
    ) -> Self {
        Self {
            id: session.id().to_string(),
            url: session.url().to_string(),
            domain: session.page_host().unwrap_or_default(),
            timestamp: Utc::now(),
            tags,
            start_time: session.start_time(),
            resources: session.resources().to_vec(),
            totals: session.totals(),
            failure: session.failure().map(str::to_string),
            ux_metrics,
            score,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn metadata(&self) -> SessionMetadata {
        SessionMetadata {
            id: self.id.clone(),
            url: self.url.clone(),
            domain: self.domain.clone(),
            timestamp: self.timestamp,
            tags: self.tags.clone(),
        }
    }

    /// Body file name; sorts chronologically and is unique per id
    pub fn body_file_name(&self) -> String {
        format!(
            "session_{}_{}.json",
            self.timestamp.format("%Y%m%dT%H%M%S%.6fZ"),
            self.id
        )
    }
}

/// Index projection of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub id: String,
    pub url: String,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SessionMetadata {
    /// Case-insensitive substring match on URL, domain, or any tag
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.url.to_lowercase().contains(&needle)
            || self.domain.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

/// Ordered set of all stored session metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionIndex {
    pub sessions: Vec<SessionMetadata>,
}

impl SessionIndex {
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.iter().any(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn without(&self, id: &str) -> SessionIndex {
        SessionIndex {
            sessions: self
                .sessions
                .iter()
                .filter(|m| m.id != id)
                .cloned()
                .collect(),
        }
    }
}
