use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Timing of the synthetic source, stored as `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub emit_interval_ms: u64,
    pub detail_delay_ms: u64,
    /// Upper bound on a single detail fetch; `None` waits indefinitely.
    pub detail_timeout_ms: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            emit_interval_ms: 2_000,
            detail_delay_ms: 1_500,
            detail_timeout_ms: None,
        }
    }
}

impl SourceConfig {
    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.emit_interval_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }

    pub fn detail_timeout(&self) -> Option<Duration> {
        self.detail_timeout_ms.map(Duration::from_millis)
    }

    /// Linux: `~/.config/newsfeed/config.json`
    pub fn default_path() -> PathBuf {
        let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.push("newsfeed");
        dir.push("config.json");
        dir
    }

    pub fn try_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Missing file means defaults; a broken one is logged and also means defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::try_from_file(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to load config, using defaults");
                Self::default()
            }
        }
    }
}
