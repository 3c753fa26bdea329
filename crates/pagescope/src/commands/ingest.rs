use super::Context;
use crate::cli::IngestArgs;
use chrono::{DateTime, Utc};
use pagescope_attribution::{attribute, ImpactTier, ProviderDirectory};
use pagescope_core::{
    score, CaptureBridge, Config, SessionAggregate, SessionMonitor, SessionObserver,
    SessionTotals, UxMetrics,
};
use pagescope_store::PersistentSession;
use pagescope_telemetry::{read_jsonl, RawTimingSample, ResourceRecord};
use std::path::Path;
use std::sync::Arc;

/// Samples per delivered batch
const BATCH_SIZE: usize = 50;

/// Logs capture progress
struct ProgressLog {
    accepted: usize,
}

impl SessionObserver for ProgressLog {
    fn name(&self) -> &str {
        "progress-log"
    }

    fn on_resources_added(&mut self, added: &[ResourceRecord], totals: &SessionTotals) {
        self.accepted += added.len();
        tracing::debug!(
            added = added.len(),
            resources = totals.resource_count,
            bytes = totals.total_bytes,
            "batch ingested"
        );
    }

    fn on_navigation_finished(&mut self, session_id: &str, totals: &SessionTotals) {
        tracing::debug!(
            session = session_id,
            accepted = self.accepted,
            duration_ms = totals.total_duration_ms,
            "capture complete"
        );
    }
}

/// Push samples through the capture bridge the way a live page would
async fn deliver_all(bridge: Arc<CaptureBridge>, samples: Vec<RawTimingSample>) {
    for chunk in samples.chunks(BATCH_SIZE) {
        if let Err(e) = bridge.send(chunk.to_vec()).await {
            tracing::warn!(error = %e, "capture stopped early");
            return;
        }
    }
    // Closing the channel ends the session's capture loop
    bridge.deregister();
}

/// Run one navigation over `samples` and hand back the finished session
pub async fn capture_session(
    config: &Config,
    url: &str,
    start: DateTime<Utc>,
    samples: Vec<RawTimingSample>,
    failure: Option<&str>,
) -> anyhow::Result<SessionAggregate> {
    let bridge = Arc::new(CaptureBridge::new());
    let mut monitor = SessionMonitor::new(Arc::clone(&bridge), config);
    monitor.subscribe(Box::new(ProgressLog { accepted: 0 }));
    monitor.start_navigation_at(url, start);

    let producer = tokio::spawn(deliver_all(Arc::clone(&bridge), samples));
    while monitor.next_batch().await.is_some() {}
    producer.await?;

    match failure {
        Some(reason) => monitor.fail_navigation(reason),
        None => monitor.finish_navigation(),
    };
    monitor
        .take_session()
        .ok_or_else(|| anyhow::anyhow!("navigation produced no session"))
}

fn parse_start(raw: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match raw {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .map_err(|e| anyhow::anyhow!("invalid --start {}: {}", s, e))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn ux_metrics(args: &IngestArgs) -> Option<UxMetrics> {
    let ux = UxMetrics {
        largest_paint_ms: args.lcp,
        layout_shift: args.cls,
        input_delay_ms: args.fid,
    };
    (!ux.is_empty()).then_some(ux)
}

pub async fn run(args: IngestArgs) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let path = Path::new(&args.file);
    if !path.exists() {
        anyhow::bail!("samples file not found: {}", path.display());
    }

    let samples: Vec<RawTimingSample> = read_jsonl(path)?;
    let start = parse_start(args.start.as_deref())?;
    let ux = ux_metrics(&args);
    let sample_count = samples.len();

    let session = capture_session(&ctx.config, &args.url, start, samples, args.failed.as_deref())
        .await?;
    let page_score = score(&session, ux.as_ref());
    let report = attribute(
        session.resources(),
        session.url(),
        ProviderDirectory::builtin(),
        &ctx.config.impact,
    );

    let persistent =
        PersistentSession::from_aggregate(&session, args.tags, ux, Some(page_score.clone()));
    let store = ctx.open_store().await?;
    store.save(persistent.clone()).await?;

    let totals = session.totals();
    println!("Session {}", persistent.id);
    println!(
        "  {} samples -> {} resources, {} bytes, {:.2}s",
        sample_count,
        totals.resource_count,
        totals.total_bytes,
        totals.total_duration_secs()
    );
    println!(
        "  Score: {} ({})",
        page_score.overall,
        page_score.rating().label()
    );
    println!(
        "  Third-party: {:.1}% of bytes across {} domain(s)",
        report.third_party_percentage,
        report.third_parties().count()
    );
    let critical: Vec<&str> = report
        .third_parties()
        .filter(|d| d.impact == ImpactTier::Critical)
        .map(|d| d.domain.as_str())
        .collect();
    if !critical.is_empty() {
        println!("  Critical third parties: {}", critical.join(", "));
    }
    if let Some(reason) = &persistent.failure {
        println!("  Navigation failed: {}", reason);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(url: &str, start: f64, duration: f64, bytes: f64) -> RawTimingSample {
        RawTimingSample {
            url: Some(url.to_string()),
            start_time: Some(start),
            duration,
            transfer_size: bytes,
            fetch_start: start,
            response_end: start + duration,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_capture_session_dedups_across_batches() {
        let mut samples: Vec<RawTimingSample> = (0..120)
            .map(|i| sample(&format!("https://shop.com/{}.js", i), i as f64, 10.0, 100.0))
            .collect();
        samples.push(sample("https://shop.com/0.js", 500.0, 10.0, 100.0));
        samples.push(sample("data:image/png;base64,AAAA", 1.0, 0.0, 0.0));

        let config = Config {
            capture_buffer: 1,
            ..Config::default()
        };
        let session = capture_session(&config, "https://shop.com/", Utc::now(), samples, None)
            .await
            .unwrap();

        assert_eq!(session.totals().resource_count, 120);
        assert_eq!(session.totals().total_bytes, 12_000);
        assert!(!session.is_loading());
        assert!(session.failure().is_none());
    }

    #[tokio::test]
    async fn test_capture_session_records_failure() {
        let samples = vec![sample("https://shop.com/app.js", 0.0, 10.0, 100.0)];
        let session = capture_session(
            &Config::default(),
            "https://shop.com/",
            Utc::now(),
            samples,
            Some("net::ERR_TIMED_OUT"),
        )
        .await
        .unwrap();
        assert_eq!(session.failure(), Some("net::ERR_TIMED_OUT"));
        assert_eq!(session.totals().resource_count, 1);
    }

    #[test]
    fn test_parse_start() {
        let parsed = parse_start(Some("2025-05-01T10:00:00+02:00")).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-05-01T08:00:00+00:00");
        assert!(parse_start(Some("yesterday")).is_err());
    }
}
