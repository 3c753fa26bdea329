//! Configuration for scoring, attribution, and retention

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to write config: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Retention limits for stored sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Sessions older than this are deleted on cleanup
    pub max_age_days: i64,
    /// Oldest sessions beyond this count are deleted on cleanup
    pub max_sessions: usize,
}

impl RetentionPolicy {
    pub fn new() -> Self {
        Self {
            max_age_days: 90,
            max_sessions: 1000,
        }
    }

    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.max_age_days.max(0))
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Share-of-session cut points for third-party impact tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactThresholds {
    /// Share above this (0.0-1.0) is critical
    pub critical_share: f64,
    /// Share above this (0.0-1.0) is high
    pub high_share: f64,
}

impl ImpactThresholds {
    pub fn new() -> Self {
        Self {
            critical_share: 0.50,
            high_share: 0.30,
        }
    }
}

impl Default for ImpactThresholds {
    fn default() -> Self {
        Self::new()
    }
}

/// External trend-insight service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub endpoint: String,
    pub model: String,
    /// Most recent sessions included in one prompt
    pub max_sessions: usize,
    pub max_tokens: u32,
}

impl InsightsConfig {
    pub fn new() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            max_sessions: 20,
            max_tokens: 1024,
        }
    }
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Pagescope configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retention: RetentionPolicy,
    pub impact: ImpactThresholds,
    /// Sample batches buffered between capture and the active session
    pub capture_buffer: usize,
    pub insights: InsightsConfig,
}

impl Config {
    pub fn new() -> Self {
        Self {
            retention: RetentionPolicy::new(),
            impact: ImpactThresholds::new(),
            capture_buffer: 64,
            insights: InsightsConfig::new(),
        }
    }

    /// Load from a JSON file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        pagescope_telemetry::atomic_write(path, json.as_bytes())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert_eq!(config.retention.max_age_days, 90);
        assert_eq!(config.retention.max_sessions, 1000);
        assert_eq!(config.impact.critical_share, 0.50);
        assert_eq!(config.impact.high_share, 0.30);
        assert_eq!(config.capture_buffer, 64);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"retention":{"max_sessions":5}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.retention.max_sessions, 5);
        assert_eq!(config.retention.max_age_days, 90);
        assert_eq!(config.impact, ImpactThresholds::new());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::new();
        config.impact.critical_share = 0.6;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
