//! Operational knobs that sit outside the bit-exact file format: durability
//! and lock-wait behavior. Nothing in here changes a single byte written to
//! disk.

use std::{path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Engine-wide configuration, loaded once per [`crate::db::Database`].
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Call `File::sync_data` before releasing the file handle at the end of
    /// every mutating operation.
    pub sync_on_write: bool,
    /// Milliseconds to keep retrying the advisory exclusive file lock before
    /// giving up. `0` means "try once".
    pub lock_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_on_write: false,
            lock_timeout_ms: 0,
        }
    }
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_disable_sync_and_do_not_wait_for_a_lock() {
        let config = Config::default();
        assert!(!config.sync_on_write);
        assert_eq!(config.lock_timeout(), Duration::ZERO);
    }

    #[test]
    fn loads_partial_toml_over_the_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flatdb.toml");
        std::fs::write(&path, "sync_on_write = true\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert!(config.sync_on_write);
        assert_eq!(config.lock_timeout_ms, 0);
    }

    #[test]
    fn missing_config_file_surfaces_an_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load_from_file(&path),
            Err(ConfigError::Io { .. })
        ));
    }
}
