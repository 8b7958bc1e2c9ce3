//! Per-type schema cache
//!
//! `Record::schema()` runs once per type per store; later lookups clone an
//! `Arc`. Registration validates the type and index names against the key
//! layout and rejects two Rust types that claim the same type name.

use std::any::TypeId;
use std::sync::Arc;

use chronodb_core::key::validate_name;
use chronodb_core::{Error, Result, Schema};
use dashmap::DashMap;
use tracing::debug;

use crate::record::Record;

/// Registered metadata of one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    /// Key namespace
    pub type_name: String,
    /// Field table
    pub schema: Schema,
}

/// Cache of [`RecordType`]s keyed by Rust type
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: DashMap<TypeId, Arc<RecordType>>,
    names: DashMap<String, TypeId>,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for `R`, registering it on first use
    pub fn get_or_register<R: Record>(&self) -> Result<Arc<RecordType>> {
        let type_id = TypeId::of::<R>();
        if let Some(existing) = self.types.get(&type_id) {
            return Ok(Arc::clone(existing.value()));
        }

        let record_type = RecordType {
            type_name: R::type_name(),
            schema: R::schema(),
        };
        validate_name(&record_type.type_name)?;
        record_type.schema.validate()?;

        match self.names.entry(record_type.type_name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) if *entry.get() != type_id => {
                return Err(Error::Schema(format!(
                    "type name '{}' of {} is already used by another record type",
                    record_type.type_name,
                    std::any::type_name::<R>()
                )));
            }
            dashmap::mapref::entry::Entry::Occupied(_) => {}
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(type_id);
            }
        }

        debug!(
            target: "chronodb::records",
            type_name = %record_type.type_name,
            indexes = record_type.schema.indexed_fields().count(),
            "Registered record type"
        );

        let record_type = Arc::new(record_type);
        let stored = self
            .types
            .entry(type_id)
            .or_insert_with(|| Arc::clone(&record_type));
        Ok(Arc::clone(stored.value()))
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
