//! Core types and traits for chronodb
//!
//! This crate defines the foundational types used throughout the system:
//! - Tid: time-ordered 16-byte identifiers
//! - FieldValue / FieldKind: typed field values and their kinds
//! - encoding: order-preserving byte encodings of field values
//! - key: primary and index key layout
//! - Schema: static per-type field table and tag parsing
//! - Error: Error type hierarchy
//! - Traits: Core trait definitions (Storage, SnapshotView)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod error;
pub mod key;
pub mod schema;
pub mod tid;
pub mod traits;
pub mod value;

pub use error::{Error, QueryError, Result};
pub use key::KeyError;
pub use schema::{Decompose, FieldSpec, Schema, SchemaBuilder};
pub use tid::{Tid, TID_LEN};
pub use traits::{Direction, ScanIter, SnapshotView, Storage, VersionedValue};
pub use value::{FieldKind, FieldValue};
