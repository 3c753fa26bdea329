mod common;

use pagescope_attribution::{attribute, ProviderCategory, ProviderDirectory};
use pagescope_core::{score, CaptureBridge, Config, DeliverError, SessionMonitor, UxMetrics};
use pagescope_store::{compare, PersistentSession, SessionStore, Trend};
use pagescope_telemetry::{Paths, ResourceType, HOME_ENV};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
async fn test_capture_score_attribute_store() {
    let config = common::sample_config();
    let bridge = Arc::new(CaptureBridge::new());
    let mut monitor = SessionMonitor::new(Arc::clone(&bridge), &config);
    monitor.start_navigation_at("https://shop.com/", common::navigation_start());

    let samples = common::shop_samples();
    bridge.deliver(samples[..3].to_vec()).unwrap();
    bridge.deliver(samples[3..].to_vec()).unwrap();
    // duplicate URL arriving late is ignored
    bridge.deliver(samples[..1].to_vec()).unwrap();

    let session = monitor.finish_navigation().unwrap().clone();
    assert!(!monitor.is_capturing());
    assert_eq!(
        bridge.deliver(samples.clone()),
        Err(DeliverError::NotRegistered)
    );

    let totals = session.totals();
    assert_eq!(totals.resource_count, 6);
    assert_eq!(totals.total_bytes, 1_000_000);
    assert_eq!(totals.total_duration_ms, 330.0);
    assert_eq!(session.resources()[0].resource_type, ResourceType::Document);
    for record in session.resources() {
        assert!(record.timings.dns >= 0.0 && record.timings.receive >= 0.0);
    }

    let page_score = score(&session, None);
    assert_eq!(page_score.overall, 85);

    let report = attribute(
        session.resources(),
        session.url(),
        ProviderDirectory::builtin(),
        &config.impact,
    );
    assert_eq!(report.third_party_percentage, 40.0);
    assert_eq!(report.first_party().count(), 2);
    assert_eq!(report.in_category(ProviderCategory::TagManager).len(), 1);

    let dir = tempfile::TempDir::new().unwrap();
    let store = SessionStore::open(dir.path(), config.retention.clone())
        .await
        .unwrap();
    let persistent = PersistentSession::from_aggregate(
        &session,
        vec!["baseline".to_string()],
        None,
        Some(page_score),
    );
    store.save(persistent.clone()).await.unwrap();

    let reopened = SessionStore::open(dir.path(), config.retention.clone())
        .await
        .unwrap();
    let found = reopened.search("SHOP.COM", None, None).await;
    assert_eq!(found, vec![persistent]);
}

#[tokio::test]
async fn test_new_navigation_cancels_previous_capture() {
    let config = common::sample_config();
    let bridge = Arc::new(CaptureBridge::new());
    let mut monitor = SessionMonitor::new(Arc::clone(&bridge), &config);

    monitor.start_navigation_at("https://shop.com/", common::navigation_start());
    let first_id = monitor.active().unwrap().id().to_string();
    bridge.deliver(common::shop_samples()).unwrap();

    monitor.start_navigation_at("https://shop.com/checkout", common::navigation_start());
    let active = monitor.active().unwrap();
    assert_ne!(active.id(), first_id);
    assert_eq!(active.totals().resource_count, 0);
    assert!(active.is_loading());

    bridge
        .deliver(vec![common::timed_sample(
            "https://shop.com/checkout.js",
            10.0,
            50.0,
            2_000.0,
        )])
        .unwrap();
    assert_eq!(monitor.next_batch().await, Some(1));
    assert_eq!(monitor.active().unwrap().totals().resource_count, 1);
}

#[tokio::test]
async fn test_ux_metrics_feed_comparison() {
    let config = common::sample_config();
    let bridge = Arc::new(CaptureBridge::new());
    let mut monitor = SessionMonitor::new(Arc::clone(&bridge), &config);

    monitor.start_navigation_at("https://shop.com/", common::navigation_start());
    monitor.ingest_batch(&common::shop_samples());
    let session = monitor.take_session().unwrap();

    let good = UxMetrics {
        largest_paint_ms: Some(1200.0),
        layout_shift: Some(0.02),
        input_delay_ms: Some(40.0),
    };
    let poor = UxMetrics {
        largest_paint_ms: Some(6000.0),
        layout_shift: Some(0.4),
        input_delay_ms: Some(500.0),
    };

    let before = PersistentSession::from_aggregate(
        &session,
        Vec::new(),
        Some(good),
        Some(score(&session, Some(&good))),
    );
    let after = PersistentSession::from_aggregate(
        &session,
        Vec::new(),
        Some(poor),
        Some(score(&session, Some(&poor))),
    );

    let comparison = compare(&before, &after);
    assert_eq!(comparison.overall_score.trend, Trend::Regressed);
    assert_eq!(comparison.load_time_secs.trend, Trend::Unchanged);
    assert_eq!(comparison.total_bytes.delta, 0.0);
}

#[test]
#[serial]
fn test_config_round_trip_under_home_override() {
    let dir = tempfile::TempDir::new().unwrap();
    std::env::set_var(HOME_ENV, dir.path());
    let paths = Paths::new().unwrap();
    std::env::remove_var(HOME_ENV);

    assert_eq!(paths.home(), dir.path());
    assert_eq!(Config::load(&paths.config_file()).unwrap(), Config::default());

    let mut config = Config::default();
    config.retention.max_sessions = 50;
    config.impact.critical_share = 0.6;
    config.save(&paths.config_file()).unwrap();
    assert_eq!(Config::load(&paths.config_file()).unwrap(), config);
}
