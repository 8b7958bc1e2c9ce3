//! How far a commit must get toward disk before it returns

use std::fmt;
use std::str::FromStr;

/// Sync policy of the write-ahead log
///
/// `Cache` never touches disk. `Always` syncs inside every commit.
/// `Standard` syncs in the background and can lose the commits of the last
/// interval on a crash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DurabilityMode {
    /// No log; contents die with the process
    Cache,

    /// Sync before each commit returns
    Always,

    /// Sync on a timer or after a run of commits (the default)
    Standard {
        /// Timer period in milliseconds
        interval_ms: u64,
        /// Unsynced commits that force a sync
        batch_size: usize,
    },
}

impl DurabilityMode {
    /// True unless this is `Cache`
    pub fn requires_wal(&self) -> bool {
        *self != DurabilityMode::Cache
    }

    /// True for `Always`
    pub fn requires_immediate_fsync(&self) -> bool {
        *self == DurabilityMode::Always
    }

    /// `Standard { interval_ms: 100, batch_size: 1000 }`
    pub fn standard_default() -> Self {
        DurabilityMode::Standard {
            interval_ms: 100,
            batch_size: 1000,
        }
    }

    /// Mode name as written in the config file
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Always => "always",
            Self::Standard { .. } => "standard",
        }
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        Self::standard_default()
    }
}

impl fmt::Display for DurabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard { interval_ms, batch_size } => {
                write!(f, "standard ({}ms / {} commits)", interval_ms, batch_size)
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Parses the mode names, with standard defaults for the sync thresholds
impl FromStr for DurabilityMode {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let wanted = text.trim().to_ascii_lowercase();
        [Self::Cache, Self::Always, Self::standard_default()]
            .into_iter()
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| format!(
                "unknown durability mode '{}', expected cache, standard or always",
                wanted
            ))
    }
}
