//! In-memory ordered key space
//!
//! The map sits behind an `Arc` inside a `parking_lot::RwLock`. A snapshot
//! is a clone of the `Arc`; a batch copies the map only when some snapshot
//! still shares it. Keys keep just their latest value, stamped with the
//! version the transaction manager chose for the commit.

use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use chronodb_core::{Direction, Result, Storage, VersionedValue};

use crate::snapshot::{scan_map, ClonedSnapshotView, StoreMap};

/// Byte-keyed store shared by every transaction of a database
#[derive(Debug, Default)]
pub struct UnifiedStore {
    /// Current map; snapshots hold older `Arc`s
    data: RwLock<Arc<StoreMap>>,
    /// Highest version applied so far
    version: AtomicU64,
}

impl UnifiedStore {
    /// Empty store at version 0
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Arc::new(StoreMap::new())),
            version: AtomicU64::new(0),
        }
    }

    /// Freeze the current contents
    ///
    /// # Example
    ///
    /// ```
    /// use chronodb_core::{SnapshotView, Storage};
    /// use chronodb_storage::UnifiedStore;
    ///
    /// let live = UnifiedStore::new();
    /// let frozen = live.create_snapshot();
    ///
    /// live.apply_batch(vec![(b"k".to_vec(), b"v".to_vec())], vec![], 1).unwrap();
    /// assert!(frozen.get(b"k").unwrap().is_none());
    /// ```
    pub fn create_snapshot(&self) -> ClonedSnapshotView {
        // Version read under the lock so it matches the map
        let guard = self.data.read();
        ClonedSnapshotView::new(self.current_version(), Arc::clone(&guard))
    }

    /// Collect the keys and values within the bounds
    ///
    /// Holds the read lock only while copying.
    pub fn scan_collect(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        direction: Direction,
    ) -> Vec<(Vec<u8>, VersionedValue)> {
        let data = self.data.read();
        scan_map(&data, lower, upper, direction)
            .map(|(k, v)| (k.to_vec(), v.clone()))
            .collect()
    }

    /// Live keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True when no key is live
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Storage for UnifiedStore {
    fn get(&self, key: &[u8]) -> Result<Option<VersionedValue>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn current_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Writes then deletes under one write lock, all stamped `version`
    fn apply_batch(
        &self,
        writes: Vec<(Vec<u8>, Vec<u8>)>,
        deletes: Vec<Vec<u8>>,
        version: u64,
    ) -> Result<()> {
        let mut guard = self.data.write();
        let data = Arc::make_mut(&mut *guard);

        data.extend(
            writes
                .into_iter()
                .map(|(key, value)| (key, VersionedValue::new(value, version))),
        );
        for key in &deletes {
            data.remove(key);
        }
        self.version.fetch_max(version, Ordering::AcqRel);

        Ok(())
    }
}
