//! The seams between layers
//!
//! Transactions and record queries only see [`Storage`] and
//! [`SnapshotView`], so any ordered byte-keyed map can sit underneath.

use serde::{Deserialize, Serialize};
use std::ops::Bound;

use crate::error::Result;

/// A stored value and the commit version that wrote it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedValue {
    /// Stored bytes
    pub value: Vec<u8>,
    /// Commit version of the last write
    pub version: u64,
}

impl VersionedValue {
    /// Create a versioned value
    pub fn new(value: Vec<u8>, version: u64) -> Self {
        VersionedValue { value, version }
    }
}

/// Scan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending byte order
    #[default]
    Forward,
    /// Descending byte order
    Reverse,
}

impl Direction {
    /// Returns true for [`Direction::Reverse`]
    pub fn is_reverse(&self) -> bool {
        matches!(self, Direction::Reverse)
    }
}

/// Ordered iterator over `(key, value)` pairs
pub type ScanIter<'a> = Box<dyn Iterator<Item = (&'a [u8], &'a VersionedValue)> + 'a>;

/// Live, shared key space that commits write into
pub trait Storage: Send + Sync {
    /// Newest value of `key`
    fn get(&self, key: &[u8]) -> Result<Option<VersionedValue>>;

    /// Latest committed version
    fn current_version(&self) -> u64;

    /// Apply writes and deletes atomically, stamping them with `version`
    ///
    /// Readers observe either none or all of the batch.
    fn apply_batch(
        &self,
        writes: Vec<(Vec<u8>, Vec<u8>)>,
        deletes: Vec<Vec<u8>>,
        version: u64,
    ) -> Result<()>;
}

/// Storage frozen at one version
pub trait SnapshotView: Send + Sync {
    /// Value of `key` as of the snapshot
    fn get(&self, key: &[u8]) -> Result<Option<VersionedValue>>;

    /// Ordered scan over keys within the bounds
    ///
    /// An empty or inverted range yields nothing.
    fn scan<'a>(
        &'a self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        direction: Direction,
    ) -> Result<ScanIter<'a>>;

    /// Version the snapshot was taken at
    fn version(&self) -> u64;
}
