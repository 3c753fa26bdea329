//! Telemetry record types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One raw resource timing sample as reported by the instrumented page.
///
/// Marks are milliseconds relative to the navigation origin. Only `url` and
/// `start_time` are required; absent marks read as zero, which the
/// normalizer clamps into empty phases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTimingSample {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub initiator_type: Option<String>,
    #[serde(default)]
    pub transfer_size: f64,
    #[serde(default)]
    pub fetch_start: f64,
    #[serde(default)]
    pub domain_lookup_start: f64,
    #[serde(default)]
    pub domain_lookup_end: f64,
    #[serde(default)]
    pub connect_start: f64,
    #[serde(default)]
    pub connect_end: f64,
    #[serde(default)]
    pub secure_connection_start: f64,
    #[serde(default)]
    pub request_start: f64,
    #[serde(default)]
    pub response_start: f64,
    #[serde(default)]
    pub response_end: f64,
}

/// Resource classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Stylesheet,
    Script,
    Image,
    Font,
    Xhr,
    WebSocket,
    Media,
    Other,
}

impl ResourceType {
    pub const ALL: [ResourceType; 9] = [
        ResourceType::Document,
        ResourceType::Stylesheet,
        ResourceType::Script,
        ResourceType::Image,
        ResourceType::Font,
        ResourceType::Xhr,
        ResourceType::WebSocket,
        ResourceType::Media,
        ResourceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Document => "document",
            ResourceType::Stylesheet => "stylesheet",
            ResourceType::Script => "script",
            ResourceType::Image => "image",
            ResourceType::Font => "font",
            ResourceType::Xhr => "xhr",
            ResourceType::WebSocket => "websocket",
            ResourceType::Media => "media",
            ResourceType::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type: {0}")]
pub struct ParseResourceTypeError(String);

impl FromStr for ResourceType {
    type Err = ParseResourceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ResourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or(ParseResourceTypeError(lower))
    }
}

/// Phase durations of one fetch, in milliseconds. All fields are >= 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingPhases {
    pub blocked: f64,
    pub dns: f64,
    pub connect: f64,
    pub ssl: f64,
    pub wait: f64,
    pub receive: f64,
}

impl TimingPhases {
    /// Canonical load duration of the resource
    pub fn total(&self) -> f64 {
        self.blocked + self.dns + self.connect + self.ssl + self.wait + self.receive
    }
}

/// One observed network fetch, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub url: String,
    pub method: String,
    pub status_code: u16,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub resource_type: ResourceType,
    pub start_time: DateTime<Utc>,
    pub timings: TimingPhases,
    #[serde(default)]
    pub request_size: u64,
    #[serde(default)]
    pub response_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}

impl ResourceRecord {
    /// Total duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.timings.total()
    }

    /// Start plus duration; `None` when that lands outside the representable range
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        let micros = self.duration_ms() * 1000.0;
        if !micros.is_finite() {
            return None;
        }
        self.start_time
            .checked_add_signed(Duration::microseconds(micros.round() as i64))
    }

    /// Bytes attributed to this resource (request + response)
    pub fn total_bytes(&self) -> u64 {
        self.request_size + self.response_size
    }

    pub fn host(&self) -> Option<String> {
        crate::host::host_of(&self.url)
    }
}
