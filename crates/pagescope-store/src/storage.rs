use crate::error::{Result, StoreError};
use crate::types::{PersistentSession, SessionIndex, SessionMetadata};
use crate::views;
use chrono::{DateTime, Local, TimeZone, Utc};
use pagescope_core::RetentionPolicy;
use pagescope_telemetry::staging_path;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const INDEX_FILE: &str = "index.json";
const BODY_PREFIX: &str = "session_";
const BODY_SUFFIX: &str = ".json";

/// Sessions removed by one retention pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    /// Older than the maximum age
    pub expired: Vec<String>,
    /// Oldest sessions beyond the maximum count
    pub overflow: Vec<String>,
}

impl CleanupReport {
    pub fn removed(&self) -> usize {
        self.expired.len() + self.overflow.len()
    }
}

#[derive(Default)]
struct StoreState {
    sessions: Vec<PersistentSession>,
    index: SessionIndex,
}

/// Directory of session bodies plus one index file.
///
/// Every mutation holds the state lock across its disk writes, so index
/// read-modify-write cycles never interleave.
pub struct SessionStore {
    dir: PathBuf,
    policy: RetentionPolicy,
    state: Mutex<StoreState>,
}

impl SessionStore {
    /// Store rooted at `dir`; nothing is read until [`SessionStore::load`]
    pub fn new(dir: impl Into<PathBuf>, policy: RetentionPolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create the directory if needed and load what is already there
    pub async fn open(dir: impl Into<PathBuf>, policy: RetentionPolicy) -> Result<Self> {
        let store = Self::new(dir, policy);
        tokio::fs::create_dir_all(&store.dir)
            .await
            .map_err(|source| StoreError::Write {
                path: store.dir.clone(),
                source,
            })?;
        store.load().await?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Persist a session, then apply retention.
    ///
    /// The body is written first and the index second; if the index write
    /// fails the body stays behind as an orphan and nothing in memory changes.
    /// Saving an id that is already stored replaces it; the previous body is
    /// only removed once the new index is on disk.
    pub async fn save(&self, session: PersistentSession) -> Result<()> {
        let mut state = self.state.lock().await;

        let body_path = self.dir.join(session.body_file_name());
        let body = serde_json::to_vec_pretty(&session)?;
        write_atomic(&body_path, &body).await?;

        let replaced = state.index.contains(&session.id);
        let mut next = state.index.without(&session.id);
        next.sessions.push(session.metadata());
        self.write_index(&next).await?;
        if replaced {
            self.remove_bodies(&session.id, Some(body_path.as_path())).await?;
        }

        state.index = next;
        state.sessions.retain(|s| s.id != session.id);
        tracing::info!(id = %session.id, url = %session.url, replaced, "session saved");
        state.sessions.insert(0, session);

        let policy = self.policy.clone();
        if let Err(e) = self.cleanup_locked(&mut state, &policy, Utc::now()).await {
            tracing::warn!(error = %e, "retention cleanup after save failed");
        }
        Ok(())
    }

    /// Replace in-memory state with what is on disk; returns the number of
    /// sessions loaded.
    ///
    /// Index entries without a body are skipped, as are bodies that fail to
    /// read or decode. Order follows the index, not recency.
    pub async fn load(&self) -> Result<usize> {
        let mut state = self.state.lock().await;

        let index = self.read_index().await?;
        let bodies = self.body_files().await?;

        let mut sessions = Vec::with_capacity(index.len());
        let mut missing = 0usize;
        for meta in &index.sessions {
            // Newest artifact wins if an id was written more than once
            let Some((_, path)) = bodies
                .iter()
                .rev()
                .find(|(name, _)| body_id(name) == Some(meta.id.as_str()))
            else {
                missing += 1;
                continue;
            };
            match read_body(path).await {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::warn!(id = %meta.id, error = %e, "skipping unreadable session body");
                }
            }
        }

        if missing > 0 {
            tracing::debug!(missing, "index entries without a body skipped");
        }
        tracing::info!(
            loaded = sessions.len(),
            indexed = index.len(),
            "session store loaded"
        );

        let loaded = sessions.len();
        state.sessions = sessions;
        state.index = index;
        Ok(loaded)
    }

    /// Remove a session's bodies, index entry, and in-memory copy.
    ///
    /// Returns whether anything was removed; unknown ids are a no-op.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        self.delete_locked(&mut state, id).await
    }

    /// Apply the configured retention policy
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let policy = self.policy.clone();
        self.cleanup_with(&policy, Utc::now()).await
    }

    /// Apply `policy` as of `now`
    pub async fn cleanup_with(
        &self,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport> {
        let mut state = self.state.lock().await;
        self.cleanup_locked(&mut state, policy, now).await
    }

    /// Case-insensitive query over URL, domain, and tags within inclusive bounds
    pub async fn search(
        &self,
        query: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<PersistentSession> {
        let state = self.state.lock().await;
        views::search(&state.sessions, query, from, to)
            .into_iter()
            .cloned()
            .collect()
    }

    /// In-memory sessions, most recently saved first
    pub async fn sessions(&self) -> Vec<PersistentSession> {
        self.state.lock().await.sessions.clone()
    }

    pub async fn get(&self, id: &str) -> Option<PersistentSession> {
        let state = self.state.lock().await;
        state.sessions.iter().find(|s| s.id == id).cloned()
    }

    pub async fn metadata(&self) -> Vec<SessionMetadata> {
        self.state.lock().await.index.sessions.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.sessions.is_empty()
    }

    /// Sessions recorded for `url`, oldest first
    pub async fn sessions_for_url(&self, url: &str) -> Vec<PersistentSession> {
        let wanted = comparable_url(url);
        let state = self.state.lock().await;
        let mut found: Vec<PersistentSession> = state
            .sessions
            .iter()
            .filter(|s| comparable_url(&s.url) == wanted)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        found
    }

    pub async fn today(&self) -> Vec<PersistentSession> {
        self.today_at(&Local::now()).await
    }

    pub async fn this_week(&self) -> Vec<PersistentSession> {
        self.this_week_at(&Local::now()).await
    }

    pub async fn this_month(&self) -> Vec<PersistentSession> {
        self.this_month_at(&Local::now()).await
    }

    pub async fn today_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<PersistentSession> {
        let state = self.state.lock().await;
        views::today(&state.sessions, now).into_iter().cloned().collect()
    }

    pub async fn this_week_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<PersistentSession> {
        let state = self.state.lock().await;
        views::this_week(&state.sessions, now)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn this_month_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<PersistentSession> {
        let state = self.state.lock().await;
        views::this_month(&state.sessions, now)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Body files whose id has no index entry
    pub async fn orphans(&self) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().await;
        let orphans: Vec<PathBuf> = self
            .body_files()
            .await?
            .into_iter()
            .filter(|(name, _)| match body_id(name) {
                Some(id) => !state.index.contains(id),
                None => false,
            })
            .map(|(_, path)| path)
            .collect();
        if !orphans.is_empty() {
            tracing::warn!(count = orphans.len(), "session bodies without index entries");
        }
        Ok(orphans)
    }

    async fn delete_locked(&self, state: &mut StoreState, id: &str) -> Result<bool> {
        if id.is_empty() {
            return Ok(false);
        }

        let removed_files = self.remove_bodies(id, None).await?;
        let indexed = state.index.contains(id);
        if indexed {
            let next = state.index.without(id);
            self.write_index(&next).await?;
            state.index = next;
        }
        state.sessions.retain(|s| s.id != id);

        let removed = indexed || removed_files > 0;
        if removed {
            tracing::info!(id, files = removed_files, "session deleted");
        }
        Ok(removed)
    }

    async fn cleanup_locked(
        &self,
        state: &mut StoreState,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        let cutoff = now - policy.max_age();
        let expired: Vec<String> = state
            .index
            .sessions
            .iter()
            .filter(|m| m.timestamp < cutoff)
            .map(|m| m.id.clone())
            .collect();
        for id in expired {
            self.delete_locked(state, &id).await?;
            report.expired.push(id);
        }

        if state.index.len() > policy.max_sessions {
            let mut remaining: Vec<&SessionMetadata> = state.index.sessions.iter().collect();
            remaining.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            let excess = remaining.len() - policy.max_sessions;
            let oldest: Vec<String> = remaining
                .into_iter()
                .take(excess)
                .map(|m| m.id.clone())
                .collect();
            for id in oldest {
                self.delete_locked(state, &id).await?;
                report.overflow.push(id);
            }
        }

        if report.removed() > 0 {
            tracing::info!(
                expired = report.expired.len(),
                overflow = report.overflow.len(),
                "retention cleanup"
            );
        }
        Ok(report)
    }

    async fn read_index(&self) -> Result<SessionIndex> {
        let path = self.index_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SessionIndex::default()),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::IndexDecode { path, source })
    }

    async fn write_index(&self, index: &SessionIndex) -> Result<()> {
        let data = serde_json::to_vec_pretty(index)?;
        write_atomic(&self.index_path(), &data).await
    }

    /// `(file name, path)` of every body artifact, sorted by name
    async fn body_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(StoreError::Read {
                        path: self.dir.clone(),
                        source,
                    })
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(BODY_PREFIX) && name.ends_with(BODY_SUFFIX) {
                files.push((name, entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Remove body files for `id`, sparing `keep`; returns how many went
    async fn remove_bodies(&self, id: &str, keep: Option<&Path>) -> Result<usize> {
        let mut removed = 0;
        for (name, path) in self.body_files().await? {
            if body_id(&name) != Some(id) || keep == Some(path.as_path()) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Write { path, source }),
            }
        }
        Ok(removed)
    }
}

/// Id part of `session_<timestamp>_<id>.json`
fn body_id(name: &str) -> Option<&str> {
    let stem = name.strip_prefix(BODY_PREFIX)?.strip_suffix(BODY_SUFFIX)?;
    let (_, id) = stem.split_once('_')?;
    (!id.is_empty()).then_some(id)
}

fn comparable_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_lowercase()
}

async fn read_body(path: &Path) -> Result<PersistentSession> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Async counterpart of [`pagescope_telemetry::atomic_write`], same staging file
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let io_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let temp = staging_path(path);
    tokio::fs::write(&temp, data).await.map_err(io_err)?;
    tokio::fs::rename(&temp, path).await.map_err(io_err)?;
    Ok(())
}
