//! Raw timing samples to canonical resource records

use crate::types::{RawTimingSample, ResourceRecord, ResourceType, TimingPhases};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use url::Url;
use uuid::Uuid;

/// Passive capture cannot observe the status line, so every record is
/// reported as a successful GET.
pub const DEFAULT_STATUS: u16 = 200;
pub const DEFAULT_METHOD: &str = "GET";

static NON_NETWORK_SCHEMES: &[&str] = &["data:", "blob:", "about:", "javascript:"];

static SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];
static STYLE_EXTENSIONS: &[&str] = &["css"];
static IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico", "bmp",
];
static FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];
static MEDIA_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mp3", "wav", "m4a", "mov"];

/// Whether the URL actually traversed the network
pub fn is_network_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    !lower.is_empty() && !NON_NETWORK_SCHEMES.iter().any(|s| lower.starts_with(s))
}

fn delta(end: f64, start: f64) -> f64 {
    let d = end - start;
    if d.is_finite() && d > 0.0 {
        d
    } else {
        0.0
    }
}

/// Phase durations from consecutive marks, each clamped to >= 0
pub fn phases_from_sample(sample: &RawTimingSample) -> TimingPhases {
    let ssl = if sample.secure_connection_start > 0.0 {
        delta(sample.connect_end, sample.secure_connection_start)
    } else {
        0.0
    };

    TimingPhases {
        blocked: delta(sample.domain_lookup_start, sample.fetch_start),
        dns: delta(sample.domain_lookup_end, sample.domain_lookup_start),
        connect: delta(sample.connect_end, sample.connect_start),
        ssl,
        wait: delta(sample.response_start, sample.request_start),
        receive: delta(sample.response_end, sample.response_start),
    }
}

fn extension_of(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Resource type from the initiator tag, falling back to the URL.
///
/// Recognized initiators win; otherwise websocket schemes and file
/// extensions decide; anything else is `Other`.
pub fn resource_type_for(initiator: Option<&str>, url: &str) -> ResourceType {
    let by_initiator = match initiator.map(|i| i.trim().to_ascii_lowercase()).as_deref() {
        Some("navigation") | Some("link") => Some(ResourceType::Document),
        Some("script") => Some(ResourceType::Script),
        Some("css") => Some(ResourceType::Stylesheet),
        Some("img") | Some("image") => Some(ResourceType::Image),
        Some("xmlhttprequest") | Some("xhr") | Some("fetch") => Some(ResourceType::Xhr),
        _ => None,
    };
    if let Some(t) = by_initiator {
        return t;
    }

    let lower = url.to_ascii_lowercase();
    if lower.starts_with("ws:") || lower.starts_with("wss:") {
        return ResourceType::WebSocket;
    }

    match extension_of(url) {
        Some(ext) if SCRIPT_EXTENSIONS.contains(&ext.as_str()) => ResourceType::Script,
        Some(ext) if STYLE_EXTENSIONS.contains(&ext.as_str()) => ResourceType::Stylesheet,
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => ResourceType::Image,
        Some(ext) if FONT_EXTENSIONS.contains(&ext.as_str()) => ResourceType::Font,
        Some(ext) if MEDIA_EXTENSIONS.contains(&ext.as_str()) => ResourceType::Media,
        _ => ResourceType::Other,
    }
}

fn offset(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::microseconds((ms * 1000.0).round() as i64)
    } else {
        Duration::zero()
    }
}

/// `None` when the start or end of the record falls outside chrono's range
fn build_record(
    url: String,
    start_ms: f64,
    sample: &RawTimingSample,
    origin: DateTime<Utc>,
) -> Option<ResourceRecord> {
    let start_time = origin.checked_add_signed(offset(start_ms))?;
    let transfer = if sample.transfer_size.is_finite() && sample.transfer_size > 0.0 {
        sample.transfer_size.round() as u64
    } else {
        0
    };

    let record = ResourceRecord {
        id: Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).to_string(),
        resource_type: resource_type_for(sample.initiator_type.as_deref(), &url),
        method: DEFAULT_METHOD.to_string(),
        status_code: DEFAULT_STATUS,
        mime_type: None,
        start_time,
        timings: phases_from_sample(sample),
        request_size: 0,
        response_size: transfer,
        request_headers: None,
        response_headers: None,
        response_body: None,
        url,
    };
    record.end_time().map(|_| record)
}

/// Normalize a batch of raw samples against the URLs already accepted.
///
/// Samples without a URL or finite start time, non-network URLs, URLs
/// already in `seen` (or earlier in the same batch), and samples whose marks
/// place the record outside the representable time range are dropped. Records carry
/// deterministic ids, so the same batch and `seen` set always produce the
/// same output.
pub fn normalize_batch(
    samples: &[RawTimingSample],
    origin: DateTime<Utc>,
    seen: &HashSet<String>,
) -> Vec<ResourceRecord> {
    let mut accepted: HashSet<&str> = HashSet::new();
    let mut records = Vec::new();
    let mut dropped = 0usize;

    for sample in samples {
        let (Some(url), Some(start_ms)) = (sample.url.as_deref(), sample.start_time) else {
            dropped += 1;
            continue;
        };
        if !start_ms.is_finite()
            || !is_network_url(url)
            || seen.contains(url)
            || accepted.contains(url)
        {
            dropped += 1;
            continue;
        }
        match build_record(url.to_string(), start_ms, sample, origin) {
            Some(record) => {
                accepted.insert(url);
                records.push(record);
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, accepted = records.len(), "dropped timing samples");
    }
    records
}
