//! chronodb's transactional key-value engine
//!
//! [`Database`] wires the storage map, the write-ahead log and optimistic
//! transactions together behind one handle per directory. Settings live in
//! `chronodb.toml`; [`Database::cache`] skips the directory altogether.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod database;

pub use chronodb_concurrency::TransactionContext;
pub use coordinator::{TransactionCoordinator, TransactionMetrics};
pub use database::{Database, RetryConfig, StoreConfig, CONFIG_FILE_NAME};
