//! Concurrency layer for chronodb
//!
//! Optimistic concurrency control over copy-on-write snapshots:
//! - TransactionContext: read/write set tracking with read-your-writes
//! - Validation: first-committer-wins on the read set
//! - TransactionManager: validate, log, then apply under a commit lock

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;
pub mod validation;

pub use manager::TransactionManager;
pub use transaction::{CommitError, TransactionContext, TransactionStatus};
pub use validation::{validate_read_set, validate_transaction, ConflictType, ValidationResult};
