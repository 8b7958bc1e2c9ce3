//! RecordStore: typed records with secondary indexes over a Database
//!
//! ## Design
//!
//! RecordStore is a thin facade over the engine. It holds an
//! `Arc<Database>`, the record codec, and the schema registry; cloning it is
//! cheap and clones share the registry.
//!
//! ## Atomicity
//!
//! `save` writes every record of the call, and all of their index deltas,
//! in one transaction: either the whole batch becomes visible or none of it
//! does. Reads (`get`, `get_ids`, queries) run against one snapshot.

use std::path::Path;
use std::sync::Arc;

use chronodb_concurrency::TransactionContext;
use chronodb_core::key::primary_key;
use chronodb_core::traits::SnapshotView;
use chronodb_core::{Result, Tid};
use chronodb_engine::{Database, StoreConfig};
use tracing::debug;

use crate::codec::RecordCodec;
use crate::index::{apply_delta, index_entries, IndexEntries};
use crate::query::{Query, QueryOptions};
use crate::record::{QueryContext, Record};
use crate::registry::{RecordType, SchemaRegistry};

/// Typed record repository
///
/// # Example
///
/// ```ignore
/// let store = RecordStore::open("/path/to/data")?;
/// let mut order = Order { customer: "jon".into(), ..Default::default() };
/// store.save_one(&mut order)?;
///
/// let recent = store.find::<Order>().matching("customer", "Jon").reverse().run()?;
/// ```
#[derive(Clone)]
pub struct RecordStore {
    db: Arc<Database>,
    codec: RecordCodec,
    registry: Arc<SchemaRegistry>,
}

impl RecordStore {
    /// Wrap an open database, using MessagePack record bodies
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            codec: RecordCodec::default(),
            registry: Arc::new(SchemaRegistry::new()),
        }
    }

    /// Open (or create) a store in a data directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open a store with an explicit engine configuration
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        Ok(Self::new(Database::open_with_config(path, config)?))
    }

    /// In-memory store with no files
    pub fn cache() -> Result<Self> {
        Ok(Self::new(Database::cache()?))
    }

    /// Use a different record body format
    pub fn with_codec(mut self, codec: RecordCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Underlying database
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Record body format
    pub fn codec(&self) -> RecordCodec {
        self.codec
    }

    /// Register `R` eagerly, validating its names
    ///
    /// Every other operation registers on first use; calling this up front
    /// only moves schema errors earlier.
    pub fn register<R: Record>(&self) -> Result<()> {
        self.record_type::<R>().map(|_| ())
    }

    pub(crate) fn record_type<R: Record>(&self) -> Result<Arc<RecordType>> {
        self.registry.get_or_register::<R>()
    }

    // ========== Writes ==========

    /// Save records in one atomic batch
    ///
    /// Records with a zero identifier get a new one, assigned before the
    /// transaction starts. Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Schema errors from index computation, serialization errors, and
    /// `Error::TransactionAborted` when a concurrent save changed one of the
    /// same records first. Nothing is written when an error is returned.
    pub fn save<R: Record>(&self, records: &mut [R]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let record_type = self.record_type::<R>()?;

        for record in records.iter_mut() {
            if record.id().is_zero() {
                record.set_id(Tid::new());
            }
        }

        let records: &[R] = records;
        let (removed, added) = self.db.transaction(|txn| {
            let mut totals = (0, 0);
            for record in records {
                let (removed, added) = self.write_record(txn, &record_type, record)?;
                totals.0 += removed;
                totals.1 += added;
            }
            Ok(totals)
        })?;

        debug!(
            target: "chronodb::records",
            type_name = %record_type.type_name,
            records = records.len(),
            index_removed = removed,
            index_added = added,
            "Saved records"
        );
        Ok(records.len())
    }

    /// Save a single record
    pub fn save_one<R: Record>(&self, record: &mut R) -> Result<()> {
        self.save(std::slice::from_mut(record)).map(|_| ())
    }

    fn write_record<R: Record>(
        &self,
        txn: &mut TransactionContext,
        record_type: &RecordType,
        record: &R,
    ) -> Result<(usize, usize)> {
        let id = record.id();
        let key = primary_key(&record_type.type_name, id);

        // Reading the stored state puts the key in the read set, so two
        // concurrent saves of one record conflict instead of corrupting
        // each other's index deltas
        let old_entries = match txn.get(&key)? {
            Some(bytes) => {
                let previous: R = self.codec.decode(&bytes)?;
                index_entries(record_type, &previous, id)?
            }
            None => IndexEntries::new(),
        };
        let new_entries = index_entries(record_type, record, id)?;

        txn.put(key, self.codec.encode(record)?)?;
        apply_delta(txn, &old_entries, &new_entries)
    }

    /// Delete a record and all its index entries
    ///
    /// Returns false if no record with `id` exists.
    pub fn delete<R: Record>(&self, id: Tid) -> Result<bool> {
        if id.is_zero() {
            return Ok(false);
        }
        let record_type = self.record_type::<R>()?;
        let key = primary_key(&record_type.type_name, id);

        let existed = self.db.transaction(|txn| {
            let Some(bytes) = txn.get(&key)? else {
                return Ok(false);
            };
            let previous: R = self.codec.decode(&bytes)?;
            let old_entries = index_entries(&record_type, &previous, id)?;
            txn.delete(key.clone())?;
            apply_delta(txn, &old_entries, &IndexEntries::new())?;
            Ok(true)
        })?;

        debug!(target: "chronodb::records", type_name = %record_type.type_name, %id, existed, "Deleted record");
        Ok(existed)
    }

    // ========== Reads ==========

    /// Reload `record` from the store using its own identifier
    ///
    /// A zero identifier, or no stored record, returns `Ok(false)` and leaves
    /// `record` untouched. On success the after-get hook runs once.
    pub fn get<R: Record>(&self, record: &mut R) -> Result<bool> {
        let id = record.id();
        match self.get_by_id::<R>(id)? {
            Some(found) => {
                *record = found;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fetch one record by identifier
    pub fn get_by_id<R: Record>(&self, id: Tid) -> Result<Option<R>> {
        if id.is_zero() {
            return Ok(None);
        }
        let record_type = self.record_type::<R>()?;
        let snapshot = self.db.snapshot();
        let found = self.fetch::<R>(&snapshot, &record_type, id)?;

        Ok(found.map(|mut record| {
            record.after_get(&QueryContext::new());
            record
        }))
    }

    /// Fetch several records, keeping the order of `ids`
    ///
    /// `out` is cleared first; identifiers with no stored record are skipped.
    /// Returns the number of records found.
    pub fn get_ids<R: Record>(&self, out: &mut Vec<R>, ids: &[Tid]) -> Result<usize> {
        out.clear();
        let record_type = self.record_type::<R>()?;
        let snapshot = self.db.snapshot();

        for id in ids.iter().copied().filter(|id| !id.is_zero()) {
            if let Some(record) = self.fetch::<R>(&snapshot, &record_type, id)? {
                out.push(record);
            }
        }

        let ctx = QueryContext::new();
        for record in out.iter_mut() {
            record.after_get(&ctx);
        }
        Ok(out.len())
    }

    /// Read and decode one primary entry from a snapshot
    pub(crate) fn fetch<R: Record>(
        &self,
        snapshot: &dyn SnapshotView,
        record_type: &RecordType,
        id: Tid,
    ) -> Result<Option<R>> {
        let key = primary_key(&record_type.type_name, id);
        match snapshot.get(&key)? {
            Some(versioned) => {
                let mut record: R = self.codec.decode(&versioned.value)?;
                record.set_id(id);
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    // ========== Queries ==========

    /// Start a query over every record of type `R`
    pub fn find<R: Record>(&self) -> Query<R> {
        Query::new(self.clone())
    }

    /// Start a query that returns at most one record
    pub fn first<R: Record>(&self) -> Query<R> {
        self.find::<R>().first()
    }

    /// Build a query from declarative options
    pub fn query<R: Record>(&self, options: QueryOptions) -> Query<R> {
        options.apply(self.find::<R>())
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("db", &self.db)
            .field("codec", &self.codec)
            .field("registered_types", &self.registry.len())
            .finish()
    }
}
