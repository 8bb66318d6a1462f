//! Window tuning knobs.
//!
//! Every field has a default from [`crate::constants`], so an empty RON file
//! (`()`) is a valid config:
//!
//! ```ron
//! (
//!     initial_sync_limit: 256,
//!     anchor_search_depth: 100,
//!     overcompensation: 32,
//!     fetch_timeout_secs: 30,
//! )
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;

/// Errors loading a [`WindowConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-registry window configuration, shared by every room it attaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Events requested by the initial room sync.
    pub initial_sync_limit: usize,
    /// Size of the one backward extension made to locate an uncached anchor.
    pub anchor_search_depth: usize,
    /// Buffer kept past a backward page.
    pub overcompensation: usize,
    /// Timeout applied to each fetch round-trip.
    pub fetch_timeout_secs: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            initial_sync_limit: constants::INITIAL_SYNC_LIMIT,
            anchor_search_depth: constants::ANCHOR_SEARCH_DEPTH,
            overcompensation: constants::OVERCOMPENSATION,
            fetch_timeout_secs: constants::FETCH_TIMEOUT.as_secs(),
        }
    }
}

impl WindowConfig {
    /// Parse and validate a RON document.
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.anchor_search_depth == 0 {
            return Err(ConfigError::Invalid(
                "anchor_search_depth must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn with_overcompensation(mut self, overcompensation: usize) -> Self {
        self.overcompensation = overcompensation;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_secs = timeout.as_secs().max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_ron_uses_defaults() {
        let config = WindowConfig::from_ron_str("()").unwrap();
        assert_eq!(config, WindowConfig::default());
        assert_eq!(config.overcompensation, 32);
        assert_eq!(config.anchor_search_depth, 100);
        assert_eq!(config.initial_sync_limit, 256);
    }

    #[test]
    fn test_partial_override() {
        let config = WindowConfig::from_ron_str("(overcompensation: 8, fetch_timeout_secs: 5)").unwrap();
        assert_eq!(config.overcompensation, 8);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(config.anchor_search_depth, 100);
    }

    #[test]
    fn test_rejects_zero_search_depth() {
        let err = WindowConfig::from_ron_str("(anchor_search_depth: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = WindowConfig::from_ron_str("(overcompensation: \"lots\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(initial_sync_limit: 64)").unwrap();

        let config = WindowConfig::load(file.path()).unwrap();
        assert_eq!(config.initial_sync_limit, 64);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = WindowConfig::load(dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
