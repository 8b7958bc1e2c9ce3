//! Typed records, secondary indexes and queries for chronodb
//!
//! This crate is the record layer on top of the engine:
//! - Record: the capability a type implements to be stored
//! - RecordStore: save, get, get_ids and delete, with index maintenance
//! - Query: fluent and declarative queries over the primary keys or an index
//! - or / and: set combination of query results
//!
//! Records are stored under `type | 0x00 | id`. Each indexed field value
//! adds a key-only entry `0x01 | type | 0x00 | index | 0x00 | value | id`,
//! where the value encoding sorts in value order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod index;
pub mod query;
pub mod record;
pub mod registry;
pub mod store;

pub use codec::RecordCodec;
pub use query::{and, or, QuickSumTarget, Query, QueryOptions};
pub use record::{QueryContext, Record};
pub use registry::{RecordType, SchemaRegistry};
pub use store::RecordStore;
