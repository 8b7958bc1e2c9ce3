//! Secondary index maintenance
//!
//! Index entries are key-only markers:
//!
//! ```text
//! 0x01 | type | 0x00 | index | 0x00 | encoded value | id (16)
//! ```
//!
//! A save computes the entry set of the new record state and, for an
//! update, of the stored state; only the difference is written. Both sets
//! are computed from the schema, so a field that stops being indexed leaves
//! its old entries to be removed by the next save of each record.

use std::collections::BTreeSet;

use chronodb_concurrency::TransactionContext;
use chronodb_core::encoding::encode_as;
use chronodb_core::key::index_key;
use chronodb_core::{Decompose, Error, FieldSpec, FieldValue, Result, Tid};
use tracing::trace;

use crate::record::Record;
use crate::registry::RecordType;

/// Index entry keys of one record state
pub type IndexEntries = BTreeSet<Vec<u8>>;

/// Compute every index entry key for `record` stored under `id`
///
/// # Errors
///
/// `Error::Schema` if a field value cannot be converted to the kind its
/// schema declares.
pub fn index_entries<R: Record>(record_type: &RecordType, record: &R, id: Tid) -> Result<IndexEntries> {
    let mut entries = IndexEntries::new();
    for spec in record_type.schema.indexed_fields() {
        let Some(value) = record.field(&spec.name) else {
            continue;
        };
        let index_name = spec.index_name();
        for component in expand(spec, value) {
            let encoded = encode_as(spec.kind, &component).ok_or_else(|| {
                Error::Schema(format!(
                    "field '{}' of {} holds {:?}, which cannot be indexed as {}",
                    spec.name, record_type.type_name, component, spec.kind
                ))
            })?;
            entries.insert(index_key(&record_type.type_name, &index_name, &encoded, id));
        }
    }
    Ok(entries)
}

/// Split a field value into the scalar values that get an index entry each
fn expand(spec: &FieldSpec, value: FieldValue) -> Vec<FieldValue> {
    let scalars = match value {
        FieldValue::List(items) => items,
        other => vec![other],
    };
    let scalars = scalars.into_iter().filter(|v| !v.is_null());

    match spec.decompose {
        Decompose::Words => scalars
            .flat_map(|v| match v {
                FieldValue::String(s) => s
                    .split_whitespace()
                    .map(|w| FieldValue::String(w.to_string()))
                    .collect(),
                other => vec![other],
            })
            .collect(),
        // A list on an element-wise field gets one entry per element; on a
        // plain field the list is indexed the same way rather than dropped
        Decompose::Elements | Decompose::None => scalars.collect(),
    }
}

/// Write the delta between two entry sets into `txn`
///
/// Returns `(removed, added)` counts.
pub fn apply_delta(
    txn: &mut TransactionContext,
    old: &IndexEntries,
    new: &IndexEntries,
) -> Result<(usize, usize)> {
    let mut removed = 0;
    for stale in old.difference(new) {
        txn.delete(stale.clone())?;
        removed += 1;
    }
    let mut added = 0;
    for fresh in new.difference(old) {
        txn.put(fresh.clone(), Vec::new())?;
        added += 1;
    }
    trace!(target: "chronodb::records", removed, added, "Index delta applied");
    Ok((removed, added))
}
