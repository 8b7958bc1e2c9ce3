//! Read-write transaction buffer
//!
//! A [`TransactionContext`] is opened on a snapshot. Reads consult the
//! transaction's own pending writes first and fall through to the snapshot;
//! snapshot reads are remembered with the version they saw so the commit can
//! detect that another transaction changed them. Nothing reaches storage
//! until the manager commits the batch.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use chronodb_core::error::{Error, Result};
use chronodb_core::traits::SnapshotView;
use thiserror::Error;

use crate::validation::ValidationResult;

/// Why a commit did not go through
#[derive(Debug, Clone, Error)]
pub enum CommitError {
    /// A key in the read set changed after it was read
    #[error("read set invalidated by {} concurrent change(s)", .0.conflict_count())]
    ValidationFailed(ValidationResult),

    /// The transaction was already finished
    #[error("transaction cannot commit: {0}")]
    InvalidState(String),

    /// Appending the batch to the log failed
    #[error("write-ahead log: {0}")]
    WALError(String),

    /// Storage failed while checking the read set or applying an unlogged batch
    #[error("storage: {0}")]
    Storage(String),
}

impl From<CommitError> for Error {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::ValidationFailed(result) => Error::TransactionAborted {
                reason: format!("{} key(s) changed since read", result.conflict_count()),
            },
            CommitError::InvalidState(msg) => Error::InvalidOperation(msg),
            CommitError::WALError(msg) => Error::Storage(format!("commit not durable: {}", msg)),
            CommitError::Storage(msg) => Error::Storage(msg),
        }
    }
}

/// Lifecycle position of a transaction
///
/// `Active` moves to `Validating` when commit starts, and from there to
/// `Committed` or `Aborted`. An active transaction can also be aborted
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting reads and writes
    Active,
    /// Commit in progress
    Validating,
    /// Batch applied
    Committed,
    /// Discarded, with the reason
    Aborted(String),
}

/// Buffered state of one read-write transaction
pub struct TransactionContext {
    /// Identifier used in logs
    pub txn_id: u64,

    /// Version of the snapshot reads are served from
    pub start_version: u64,

    snapshot: Box<dyn SnapshotView>,

    /// Snapshot keys read, with the version seen (0 for absent)
    reads: HashMap<Vec<u8>, u64>,

    /// Pending mutations; `None` deletes the key
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,

    status: TransactionStatus,
    opened_at: Instant,
}

impl TransactionContext {
    /// Open a transaction over a snapshot
    pub fn with_snapshot(txn_id: u64, snapshot: Box<dyn SnapshotView>) -> Self {
        TransactionContext {
            txn_id,
            start_version: snapshot.version(),
            snapshot,
            reads: HashMap::new(),
            pending: BTreeMap::new(),
            status: TransactionStatus::Active,
            opened_at: Instant::now(),
        }
    }

    /// Value of `key` as this transaction sees it
    ///
    /// Pending writes and deletes win over the snapshot and are not added to
    /// the read set.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.require_active()?;

        if let Some(pending) = self.pending.get(key) {
            return Ok(pending.clone());
        }

        let found = self.snapshot.get(key)?;
        // An absent key is recorded too, so a concurrent insert conflicts
        let seen = found.as_ref().map_or(0, |vv| vv.version);
        self.reads.insert(key.to_vec(), seen);
        Ok(found.map(|vv| vv.value))
    }

    /// Buffer a write, replacing any pending write or delete of `key`
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.require_active()?;
        self.pending.insert(key, Some(value));
        Ok(())
    }

    /// Buffer a delete, replacing any pending write of `key`
    pub fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        self.require_active()?;
        self.pending.insert(key, None);
        Ok(())
    }

    /// Current lifecycle position
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// True while reads and writes are accepted
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// True once the batch is applied
    pub fn is_committed(&self) -> bool {
        self.status == TransactionStatus::Committed
    }

    /// True once discarded
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted(_))
    }

    /// Reason given when the transaction was aborted
    pub fn abort_reason(&self) -> Option<&str> {
        match &self.status {
            TransactionStatus::Aborted(reason) => Some(reason),
            _ => None,
        }
    }

    /// Time since the transaction was opened
    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }

    fn require_active(&self) -> Result<()> {
        if self.is_active() {
            return Ok(());
        }
        Err(Error::InvalidOperation(format!(
            "transaction {} is {:?}, not active",
            self.txn_id, self.status
        )))
    }

    /// Start committing
    pub fn mark_validating(&mut self) -> Result<()> {
        self.require_active()?;
        self.status = TransactionStatus::Validating;
        Ok(())
    }

    /// Finish committing
    pub fn mark_committed(&mut self) -> Result<()> {
        if self.status != TransactionStatus::Validating {
            return Err(Error::InvalidOperation(format!(
                "transaction {} is {:?}, not validating",
                self.txn_id, self.status
            )));
        }
        self.status = TransactionStatus::Committed;
        Ok(())
    }

    /// Discard the transaction and its pending writes
    ///
    /// Fails once the transaction has committed or already aborted.
    pub fn mark_aborted(&mut self, reason: String) -> Result<()> {
        if self.is_committed() || self.is_aborted() {
            return Err(Error::InvalidOperation(format!(
                "transaction {} is already finished: {:?}",
                self.txn_id, self.status
            )));
        }
        self.pending.clear();
        self.status = TransactionStatus::Aborted(reason);
        Ok(())
    }

    /// Snapshot reads with the versions they saw
    pub fn read_set(&self) -> &HashMap<Vec<u8>, u64> {
        &self.reads
    }

    /// Number of pending writes and deletes
    pub fn write_count(&self) -> usize {
        self.pending.len()
    }

    /// True if nothing is pending
    pub fn is_read_only(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain pending mutations as `(writes, deletes)`, both key-ordered
    pub fn take_batch(&mut self) -> (Vec<(Vec<u8>, Vec<u8>)>, Vec<Vec<u8>>) {
        let mut writes = Vec::new();
        let mut deletes = Vec::new();
        for (key, value) in std::mem::take(&mut self.pending) {
            match value {
                Some(value) => writes.push((key, value)),
                None => deletes.push(key),
            }
        }
        (writes, deletes)
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("start_version", &self.start_version)
            .field("reads", &self.reads.len())
            .field("pending", &self.pending.len())
            .field("status", &self.status)
            .finish()
    }
}
