//! `chronodb.toml`, the per-directory store settings
//!
//! Opening a directory without the file writes a commented default. Edits
//! take effect on the next open.

use std::path::Path;

use chronodb_core::{Error, Result};
use chronodb_durability::wal::DurabilityMode;
use serde::{Deserialize, Serialize};

/// Name of the settings file inside a data directory
pub const CONFIG_FILE_NAME: &str = "chronodb.toml";

const DEFAULT_TOML: &str = r#"# chronodb settings
#
# durability: how commits reach disk
#   standard  sync after sync_batch_size commits or sync_interval_ms, whichever first
#   always    sync on every commit
#   cache     keep everything in memory; nothing survives close
durability = "standard"

sync_interval_ms = 100
sync_batch_size = 1000
"#;

/// Settings read from `chronodb.toml`
///
/// Missing keys take their defaults, so an empty file is a standard store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// `"standard"`, `"always"` or `"cache"`
    pub durability: String,
    /// Longest gap between syncs in standard mode
    pub sync_interval_ms: u64,
    /// Most commits between syncs in standard mode
    pub sync_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            durability: DurabilityMode::default().name().to_owned(),
            sync_interval_ms: 100,
            sync_batch_size: 1000,
        }
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Storage(format!("cannot {} {}: {}", action, path.display(), e))
}

impl StoreConfig {
    /// Defaults with another durability mode
    pub fn with_durability(durability: impl Into<String>) -> Self {
        StoreConfig {
            durability: durability.into(),
            ..Default::default()
        }
    }

    /// The durability mode these settings describe
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for an unknown mode, or a standard mode whose
    /// batch size is zero.
    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        let mode: DurabilityMode = self
            .durability
            .parse()
            .map_err(|msg| Error::InvalidOperation(format!("{}: {}", CONFIG_FILE_NAME, msg)))?;

        match mode {
            DurabilityMode::Standard { .. } if self.sync_batch_size == 0 => {
                Err(Error::InvalidOperation(format!(
                    "{}: sync_batch_size must be at least 1",
                    CONFIG_FILE_NAME
                )))
            }
            DurabilityMode::Standard { .. } => Ok(DurabilityMode::Standard {
                interval_ms: self.sync_interval_ms,
                batch_size: self.sync_batch_size,
            }),
            other => Ok(other),
        }
    }

    /// Text written for a directory that has no settings file yet
    pub fn default_toml() -> &'static str {
        DEFAULT_TOML
    }

    /// Load and check the settings at `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;
        let config: StoreConfig = toml::from_str(&text).map_err(|e| {
            Error::InvalidOperation(format!("malformed {}: {}", path.display(), e))
        })?;
        config.durability_mode()?;
        Ok(config)
    }

    /// Create the commented default at `path` unless a file is already there
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if path.exists() {
            return Ok(());
        }
        std::fs::write(path, DEFAULT_TOML).map_err(|e| io_error("write", path, e))
    }

    /// Replace the file at `path` with these settings
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("store config: {}", e)))?;
        std::fs::write(path, text).map_err(|e| io_error("write", path, e))
    }
}
