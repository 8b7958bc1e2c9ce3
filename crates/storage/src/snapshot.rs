//! ClonedSnapshotView: copy-on-write snapshot of the store
//!
//! A snapshot shares the store's `Arc<BTreeMap>` at the moment it was taken.
//! Writers that find the map still shared clone it before mutating, so the
//! snapshot never observes later commits.
//!
//! # Design Notes
//!
//! - **O(1) creation**: an `Arc` clone under the read lock
//! - **Immutable**: Once created, the snapshot never changes
//! - **Thread-safe**: Can be shared across threads

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use chronodb_core::{Direction, Result, ScanIter, SnapshotView, VersionedValue};

/// Ordered map shared between the store and its snapshots
pub type StoreMap = BTreeMap<Vec<u8>, VersionedValue>;

/// Point-in-time view of a [`UnifiedStore`](crate::UnifiedStore)
#[derive(Debug, Clone)]
pub struct ClonedSnapshotView {
    /// The version at which this snapshot was created
    version: u64,
    /// Map contents at snapshot time
    data: Arc<StoreMap>,
}

impl ClonedSnapshotView {
    /// Create a snapshot over shared data
    ///
    /// This is typically called by `UnifiedStore::create_snapshot()`, not directly.
    pub fn new(version: u64, data: Arc<StoreMap>) -> Self {
        Self { version, data }
    }

    /// Number of keys visible in the snapshot
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the snapshot has no keys
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl SnapshotView for ClonedSnapshotView {
    fn get(&self, key: &[u8]) -> Result<Option<VersionedValue>> {
        Ok(self.data.get(key).cloned())
    }

    fn scan<'a>(
        &'a self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        direction: Direction,
    ) -> Result<ScanIter<'a>> {
        Ok(scan_map(&self.data, lower, upper, direction))
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Ordered scan over a map, tolerating empty and inverted ranges
pub(crate) fn scan_map<'a>(
    map: &'a StoreMap,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
    direction: Direction,
) -> ScanIter<'a> {
    if range_is_empty(lower, upper) {
        return Box::new(std::iter::empty());
    }

    let range = map
        .range::<[u8], _>((lower, upper))
        .map(|(k, v)| (k.as_slice(), v));

    match direction {
        Direction::Forward => Box::new(range),
        Direction::Reverse => Box::new(range.rev()),
    }
}

// BTreeMap::range panics on these, so they are filtered first
fn range_is_empty(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l), Bound::Excluded(u))
        | (Bound::Excluded(l), Bound::Included(u))
        | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
        _ => false,
    }
}
