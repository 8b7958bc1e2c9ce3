//! Storage layer for chronodb
//!
//! This crate implements the unified storage backend with:
//! - UnifiedStore: ordered BTreeMap storage behind a RwLock
//! - Atomic batch application stamped with a commit version
//! - ClonedSnapshotView: O(1) copy-on-write snapshots
//! - Forward and reverse range scans

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod snapshot;
pub mod unified;

pub use snapshot::{ClonedSnapshotView, StoreMap};
pub use unified::UnifiedStore;
