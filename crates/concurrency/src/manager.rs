//! Commit path
//!
//! Under one lock a commit is validated against the read set, given the
//! next version, appended to the WAL and only then applied to storage:
//!
//! ```text
//! validate -> allocate version -> WAL append -> apply_batch -> committed
//! ```
//!
//! A crash before the append loses the transaction; after it, recovery
//! replays the batch.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error};

use chronodb_core::traits::{SnapshotView, Storage};
use chronodb_durability::wal::{WalRecord, WAL};

use crate::transaction::{CommitError, TransactionContext};
use crate::validation::validate_transaction;

/// Hands out transaction ids and commits batches
///
/// Every key written by one commit carries the same version, and the
/// version advances by one per commit that writes anything.
#[derive(Debug)]
pub struct TransactionManager {
    /// Last version handed to a commit
    version: AtomicU64,

    /// Id for the next `begin`
    next_txn_id: AtomicU64,

    /// Held for the whole commit path
    commit_lock: Mutex<()>,
}

impl TransactionManager {
    /// Manager continuing from `initial_version`, the recovered storage version
    pub fn new(initial_version: u64) -> Self {
        TransactionManager {
            version: AtomicU64::new(initial_version),
            next_txn_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
        }
    }

    /// Last committed version
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Take a fresh transaction id
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Start a transaction over a snapshot
    pub fn begin(&self, snapshot: Box<dyn SnapshotView>) -> TransactionContext {
        TransactionContext::with_snapshot(self.next_txn_id(), snapshot)
    }

    fn allocate_version(&self) -> u64 {
        1 + self.version.fetch_add(1, Ordering::SeqCst)
    }

    /// Validate, log and apply `txn` as one unit
    ///
    /// Returns the commit version, or the snapshot version for a read-only
    /// transaction (which writes nothing).
    ///
    /// # Errors
    ///
    /// - `CommitError::ValidationFailed` if a key read by the transaction
    ///   changed since its snapshot; the transaction is aborted
    /// - `CommitError::InvalidState` if the transaction is not active
    /// - `CommitError::WALError` if the WAL append fails
    /// - `CommitError::Storage` if storage fails during validation, or
    ///   while applying a batch that has no WAL behind it
    pub fn commit(
        &self,
        txn: &mut TransactionContext,
        store: &dyn Storage,
        wal: Option<&WAL>,
    ) -> std::result::Result<u64, CommitError> {
        let _guard = self.commit_lock.lock();

        txn.mark_validating()
            .map_err(|e| CommitError::InvalidState(e.to_string()))?;

        let validation = match validate_transaction(txn, store) {
            Ok(v) => v,
            Err(e) => {
                let _ = txn.mark_aborted(format!("validation error: {}", e));
                return Err(CommitError::Storage(e.to_string()));
            }
        };

        if validation.conflict_count() > 0 {
            let reason = format!("{} conflict(s) detected", validation.conflict_count());
            debug!(
                target: "chronodb::txn",
                txn_id = txn.txn_id,
                conflicts = validation.conflict_count(),
                "Transaction aborted"
            );
            let _ = txn.mark_aborted(reason);
            return Err(CommitError::ValidationFailed(validation));
        }

        if txn.is_read_only() {
            let _ = txn.mark_committed();
            return Ok(txn.start_version);
        }

        let commit_version = self.allocate_version();
        let (writes, deletes) = txn.take_batch();
        let (puts, dels) = (writes.len(), deletes.len());

        let record = WalRecord {
            version: commit_version,
            writes,
            deletes,
        };

        if let Some(wal) = wal {
            if let Err(e) = wal.append(&record) {
                let _ = txn.mark_aborted(format!("WAL write failed: {}", e));
                return Err(CommitError::WALError(e.to_string()));
            }
        }

        if let Err(e) = store.apply_batch(record.writes, record.deletes, commit_version) {
            if wal.is_none() {
                let _ = txn.mark_aborted(format!("storage apply failed: {}", e));
                return Err(CommitError::Storage(e.to_string()));
            }
            // WAL is authoritative: the batch is replayed on restart
            error!(
                target: "chronodb::txn",
                txn_id = txn.txn_id,
                commit_version,
                error = %e,
                "Storage application failed after WAL commit"
            );
        }

        let _ = txn.mark_committed();

        debug!(
            target: "chronodb::txn",
            txn_id = txn.txn_id,
            commit_version,
            puts,
            deletes = dels,
            "Transaction committed"
        );

        Ok(commit_version)
    }

    /// Abandon `txn` without committing
    pub fn abort(&self, txn: &mut TransactionContext, reason: String) -> chronodb_core::Result<()> {
        txn.mark_aborted(reason)
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(0)
    }
}
