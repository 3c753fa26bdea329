//! Path resolution for the pagescope data directory

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "PAGESCOPE_HOME";

/// Resolves standard paths for stored sessions and configuration
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
}

impl Paths {
    /// Resolve from `$PAGESCOPE_HOME`, else the platform data directory
    pub fn new() -> std::io::Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_home(PathBuf::from(home)));
        }

        let data = dirs::data_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "data directory not found")
        })?;
        Ok(Self::with_home(data.join("pagescope")))
    }

    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Directory holding session bodies and the index
    pub fn sessions_dir(&self) -> PathBuf {
        self.home.join("sessions")
    }

    /// Get index.json path
    pub fn index_file(&self) -> PathBuf {
        self.sessions_dir().join("index.json")
    }

    /// Get config.json path
    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.json")
    }
}
