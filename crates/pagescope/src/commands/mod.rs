pub mod cleanup;
pub mod compare;
pub mod delete;
pub mod history;
pub mod ingest;
pub mod init;
pub mod insights;
pub mod orphans;
pub mod report;
pub mod version;

use pagescope_core::Config;
use pagescope_store::{PersistentSession, SessionStore};
use pagescope_telemetry::Paths;

/// Resolved paths plus the config stored under them
pub struct Context {
    pub paths: Paths,
    pub config: Config,
}

impl Context {
    pub fn load() -> anyhow::Result<Self> {
        let paths = Paths::new()?;
        let config = Config::load(&paths.config_file())?;
        Ok(Self { paths, config })
    }

    pub async fn open_store(&self) -> anyhow::Result<SessionStore> {
        let store =
            SessionStore::open(self.paths.sessions_dir(), self.config.retention.clone()).await?;
        Ok(store)
    }
}

/// Session by exact id or unique id prefix
pub async fn find_session(store: &SessionStore, id: &str) -> anyhow::Result<PersistentSession> {
    if let Some(session) = store.get(id).await {
        return Ok(session);
    }
    let mut matches: Vec<PersistentSession> = store
        .sessions()
        .await
        .into_iter()
        .filter(|s| !id.is_empty() && s.id.starts_with(id))
        .collect();
    if matches.len() > 1 {
        anyhow::bail!("id prefix {} is ambiguous ({} sessions)", id, matches.len());
    }
    matches
        .pop()
        .ok_or_else(|| anyhow::anyhow!("no session with id {}", id))
}

/// Short id for tables
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
