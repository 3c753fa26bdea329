#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use pagescope_core::Config;
use pagescope_telemetry::RawTimingSample;

pub fn sample_config() -> Config {
    Config {
        capture_buffer: 4,
        ..Config::default()
    }
}

pub fn navigation_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
}

/// Sample with a full set of marks laid out from `start`
pub fn timed_sample(url: &str, start: f64, duration: f64, bytes: f64) -> RawTimingSample {
    RawTimingSample {
        url: Some(url.to_string()),
        start_time: Some(start),
        duration,
        initiator_type: Some("script".to_string()),
        transfer_size: bytes,
        fetch_start: start,
        domain_lookup_start: start,
        domain_lookup_end: start + 5.0,
        connect_start: start + 5.0,
        connect_end: start + 15.0,
        secure_connection_start: 0.0,
        request_start: start + 15.0,
        response_start: start + duration * 0.6,
        response_end: start + duration,
    }
}

/// A shop page: 600 KB first-party, 400 KB spread over known third parties
pub fn shop_samples() -> Vec<RawTimingSample> {
    vec![
        RawTimingSample {
            initiator_type: Some("navigation".to_string()),
            ..timed_sample("https://shop.com/", 0.0, 120.0, 100_000.0)
        },
        timed_sample("https://shop.com/app.js", 130.0, 200.0, 300_000.0),
        timed_sample("https://static.shop.com/app.css", 140.0, 80.0, 200_000.0),
        timed_sample("https://www.googletagmanager.com/gtm.js", 150.0, 90.0, 150_000.0),
        timed_sample("https://www.google-analytics.com/analytics.js", 260.0, 60.0, 100_000.0),
        timed_sample("https://fonts.gstatic.com/s/inter.woff2", 170.0, 40.0, 150_000.0),
    ]
}
