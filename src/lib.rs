//! chronodb - embedded record store with time-ordered identifiers
//!
//! chronodb stores typed records under 16-byte identifiers that sort by
//! creation time, keeps secondary indexes derived from record fields, and
//! answers queries over creation-time ranges and index values.
//!
//! # Quick Start
//!
//! ```ignore
//! use chronodb::{FieldKind, FieldValue, Record, RecordStore, Schema, Tid};
//!
//! let store = RecordStore::open("./data")?;
//!
//! let mut order = Order { customer: "jon".into(), total: 42.0, ..Default::default() };
//! store.save_one(&mut order)?;
//!
//! let big = store.find::<Order>().range("total", 40.0, FieldValue::Null).count()?;
//! let spent: f64 = store.find::<Order>().matching("customer", "Jon").quick_sum()?;
//! ```
//!
//! # Architecture
//!
//! The [`RecordStore`] is the public surface. It runs on a [`Database`]
//! (ordered in-memory store, write-ahead log, optimistic transactions), which
//! can also be used directly for raw key-value work.

pub use chronodb_core::{
    Decompose, Error, FieldKind, FieldSpec, FieldValue, QueryError, Result, Schema,
    SchemaBuilder, Tid,
};
pub use chronodb_engine::{Database, RetryConfig, StoreConfig, TransactionMetrics};
pub use chronodb_records::{
    and, or, QueryContext, QueryOptions, QuickSumTarget, Query, Record, RecordCodec,
    RecordStore,
};

/// Durability modes accepted by [`StoreConfig::durability`]
pub use chronodb_durability::DurabilityMode;

/// Re-exported for building date bounds
pub use chrono::{DateTime, Utc};
