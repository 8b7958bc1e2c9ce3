//! WAL replay into storage
//!
//! Records are applied in log order with their original commit versions, so
//! after replay `Storage::current_version` equals the last committed version.

use chronodb_core::{Result, Storage};
use tracing::info;

use crate::wal::WalRecord;

/// Outcome of a replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Batches applied
    pub batches_applied: usize,
    /// Keys written
    pub writes_applied: usize,
    /// Keys deleted
    pub deletes_applied: usize,
    /// Highest version seen
    pub final_version: u64,
}

/// Apply recovered records to storage
pub fn replay_wal(records: Vec<WalRecord>, storage: &dyn Storage) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    for record in records {
        stats.batches_applied += 1;
        stats.writes_applied += record.writes.len();
        stats.deletes_applied += record.deletes.len();
        stats.final_version = stats.final_version.max(record.version);
        storage.apply_batch(record.writes, record.deletes, record.version)?;
    }

    if stats.batches_applied > 0 {
        info!(
            target: "chronodb::db",
            batches = stats.batches_applied,
            writes = stats.writes_applied,
            deletes = stats.deletes_applied,
            version = stats.final_version,
            "WAL replay complete"
        );
    }

    Ok(stats)
}
