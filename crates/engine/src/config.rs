//! Store configuration via `folio.toml`
//!
//! Settings live in a config file in the data directory instead of a
//! builder. On first open, a default `folio.toml` is created. To change
//! settings, edit the file and reopen the store.

use folio_core::{FolioError, FolioResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name placed in the store data directory.
pub const CONFIG_FILE_NAME: &str = "folio.toml";

/// Store configuration loaded from `folio.toml`.
///
/// # Example
///
/// ```toml
/// # Milliseconds between write-back sweeps
/// flush_interval_ms = 15000
///
/// # Collections held in memory before the sweep evicts
/// cache_capacity = 50
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolioConfig {
    /// Milliseconds between write-back sweeps.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Number of collections held resident before the sweep evicts.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Worker threads for the write pool.
    #[serde(default = "default_write_workers")]
    pub write_workers: usize,
}

fn default_flush_interval_ms() -> u64 {
    15_000
}

fn default_cache_capacity() -> usize {
    folio_storage::DEFAULT_CACHE_CAPACITY
}

fn default_write_workers() -> usize {
    2
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval_ms(),
            cache_capacity: default_cache_capacity(),
            write_workers: default_write_workers(),
        }
    }
}

impl FolioConfig {
    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns an error when the flush interval is zero, the cache
    /// capacity is zero, or the write pool has no workers.
    pub fn validate(&self) -> FolioResult<()> {
        if self.flush_interval_ms == 0 {
            return Err(FolioError::invalid_config(
                "flush_interval_ms must be greater than zero",
            ));
        }
        if self.cache_capacity == 0 {
            return Err(FolioError::invalid_config(
                "cache_capacity must be greater than zero",
            ));
        }
        if self.write_workers == 0 {
            return Err(FolioError::invalid_config(
                "write_workers must be greater than zero",
            ));
        }
        Ok(())
    }

    /// The sweep interval as a `Duration`.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Folio store configuration
#
# Milliseconds between write-back sweeps. Each sweep persists dirty
# collections and evicts clean ones past the cache capacity.
flush_interval_ms = 15000

# Number of collections held in memory before the sweep evicts the
# least recently used.
cache_capacity = 50

# Worker threads for the write pool used by sweeps.
write_workers = 2
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_file(path: &Path) -> FolioResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FolioError::internal(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: FolioConfig = toml::from_str(&content).map_err(|e| {
            FolioError::invalid_config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> FolioResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                FolioError::internal(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> FolioResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FolioError::internal(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            FolioError::internal(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
