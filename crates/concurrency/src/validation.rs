//! Commit-time conflict detection
//!
//! Only the keys a transaction read are checked. Writing a key without
//! reading it never conflicts, and write skew across disjoint keys is
//! accepted.

use std::collections::HashMap;

use chronodb_core::error::Result;
use chronodb_core::traits::Storage;

use crate::transaction::TransactionContext;

/// A reason a transaction may not commit
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ConflictType {
    /// A read key now carries a different version
    ReadWriteConflict {
        /// Key that was read
        key: Vec<u8>,
        /// Version seen by the read (0 when absent)
        read_version: u64,
        /// Version in storage at commit time
        current_version: u64,
    },
}

/// Outcome of checking one read set
#[derive(Default, Debug, Clone)]
pub struct ValidationResult {
    /// Every conflict found; empty means the commit may proceed
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// No conflicts
    pub fn ok() -> Self {
        ValidationResult::default()
    }

    /// True when nothing conflicted
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// How many keys conflicted
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Compare every read version with what `store` holds now
pub fn validate_read_set(
    read_set: &HashMap<Vec<u8>, u64>,
    store: &dyn Storage,
) -> Result<ValidationResult> {
    let mut conflicts = Vec::new();
    for (key, &seen) in read_set {
        let now = store.get(key)?.map_or(0, |vv| vv.version);
        if now != seen {
            conflicts.push(ConflictType::ReadWriteConflict {
                key: key.clone(),
                read_version: seen,
                current_version: now,
            });
        }
    }
    Ok(ValidationResult { conflicts })
}

/// Check `txn` before commit; a transaction with nothing pending always passes
pub fn validate_transaction(
    txn: &TransactionContext,
    store: &dyn Storage,
) -> Result<ValidationResult> {
    if txn.is_read_only() {
        return Ok(ValidationResult::ok());
    }
    validate_read_set(txn.read_set(), store)
}
