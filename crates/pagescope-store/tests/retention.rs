use chrono::{DateTime, Duration, TimeZone, Utc};
use pagescope_core::{RetentionPolicy, SessionAggregate};
use pagescope_store::{PersistentSession, SessionIndex, SessionStore};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinSet;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn session_at(domain: &str, timestamp: DateTime<Utc>) -> PersistentSession {
    let aggregate = SessionAggregate::new(format!("https://{}/", domain), timestamp);
    PersistentSession::from_aggregate(&aggregate, Vec::new(), None, None).with_timestamp(timestamp)
}

fn body_ids(dir: &std::path::Path) -> HashSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("session_") && name.ends_with(".json"))
        .collect()
}

#[tokio::test]
async fn cleanup_keeps_most_recent_thousand() {
    let dir = TempDir::new().unwrap();
    let lenient = RetentionPolicy {
        max_age_days: 100_000,
        max_sessions: 100_000,
    };
    let store = SessionStore::open(dir.path(), lenient).await.unwrap();

    let mut saved = Vec::new();
    for i in 0..1005 {
        let session = session_at("a.com", base() + Duration::seconds(i));
        saved.push(session.id.clone());
        store.save(session).await.unwrap();
    }
    assert_eq!(store.len().await, 1005);

    let report = store
        .cleanup_with(
            &RetentionPolicy {
                max_age_days: 100_000,
                max_sessions: 1000,
            },
            base() + Duration::days(1),
        )
        .await
        .unwrap();
    assert!(report.expired.is_empty());
    assert_eq!(report.overflow, saved[..5].to_vec());

    let files = body_ids(dir.path());
    assert_eq!(files.len(), 1000);
    for id in &saved[..5] {
        assert!(!files.iter().any(|name| name.contains(id.as_str())));
    }

    let index: SessionIndex =
        serde_json::from_slice(&std::fs::read(store.index_path()).unwrap()).unwrap();
    assert_eq!(index.len(), 1000);
    for id in &saved[..5] {
        assert!(!index.contains(id));
    }
    for id in &saved[5..] {
        assert!(index.contains(id));
    }
}

#[tokio::test]
async fn load_tolerates_orphaned_index_entry() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::open(dir.path(), RetentionPolicy::default())
        .await
        .unwrap();
    let kept = session_at("a.com", Utc::now());
    let ghost = session_at("b.com", Utc::now());
    store.save(kept.clone()).await.unwrap();

    // index names a session whose body never landed
    let mut index: SessionIndex =
        serde_json::from_slice(&std::fs::read(store.index_path()).unwrap()).unwrap();
    index.sessions.push(ghost.metadata());
    std::fs::write(store.index_path(), serde_json::to_vec(&index).unwrap()).unwrap();

    let reopened = SessionStore::open(dir.path(), RetentionPolicy::default())
        .await
        .unwrap();
    let ids: Vec<String> = reopened.sessions().await.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![kept.id]);
}

#[tokio::test]
async fn search_by_domain_and_range() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::open(dir.path(), RetentionPolicy::default())
        .await
        .unwrap();
    let now = Utc::now();
    let a = session_at("a.com", now - Duration::days(2));
    let b = session_at("b.com", now - Duration::days(1));
    store.save(a.clone()).await.unwrap();
    store.save(b.clone()).await.unwrap();

    let found = store.search("A", None, None).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, a.id);

    let upper = store.search("a", None, None).await;
    assert_eq!(upper, found);

    let outside = store
        .search("a.com", Some(now - Duration::days(1)), Some(now))
        .await;
    assert!(outside.is_empty());

    let inclusive = store
        .search("a.com", Some(a.timestamp), Some(a.timestamp))
        .await;
    assert_eq!(inclusive.len(), 1);
}

#[tokio::test]
async fn delete_unknown_id_is_noop() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::open(dir.path(), RetentionPolicy::default())
        .await
        .unwrap();
    store.save(session_at("a.com", Utc::now())).await.unwrap();

    assert!(!store.delete("does-not-exist").await.unwrap());
    // fragments of every body file name
    assert!(!store.delete("session").await.unwrap());
    assert!(!store.delete("2025").await.unwrap());
    assert!(!store.delete(".json").await.unwrap());
    assert_eq!(store.len().await, 1);
    assert_eq!(store.metadata().await.len(), 1);
    assert_eq!(body_ids(dir.path()).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_keep_index_consistent() {
    let dir = TempDir::new().unwrap();
    let lenient = RetentionPolicy {
        max_age_days: 100_000,
        max_sessions: 100_000,
    };
    let store = Arc::new(SessionStore::open(dir.path(), lenient).await.unwrap());

    let mut tasks = JoinSet::new();
    for i in 0..40 {
        let store = Arc::clone(&store);
        tasks.spawn(async move {
            let session = session_at(&format!("site{i}.com"), base() + Duration::seconds(i));
            let id = session.id.clone();
            store.save(session).await.unwrap();
            if i % 10 == 0 {
                store.cleanup().await.unwrap();
            }
            id
        });
    }
    let mut saved = HashSet::new();
    while let Some(id) = tasks.join_next().await {
        saved.insert(id.unwrap());
    }
    assert_eq!(saved.len(), 40);

    let index: SessionIndex =
        serde_json::from_slice(&std::fs::read(store.index_path()).unwrap()).unwrap();
    let indexed: HashSet<String> = index.sessions.iter().map(|m| m.id.clone()).collect();
    assert_eq!(index.len(), 40);
    assert_eq!(indexed, saved);

    let on_disk: HashSet<String> = body_ids(dir.path())
        .into_iter()
        .filter_map(|name| {
            let stem = name.strip_prefix("session_")?.strip_suffix(".json")?;
            stem.split_once('_').map(|(_, id)| id.to_string())
        })
        .collect();
    assert_eq!(on_disk, saved);
    assert!(store.orphans().await.unwrap().is_empty());
}
