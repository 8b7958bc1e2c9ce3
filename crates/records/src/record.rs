//! The `Record` capability and the query context passed to after-get hooks

use std::collections::BTreeMap;

use chronodb_core::{FieldValue, Schema, Tid};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A persistable record type
///
/// The identifier is part of the record's own state; the store reads and
/// writes it through `id`/`set_id` and never keeps it elsewhere.
///
/// # Example
///
/// ```
/// use chronodb_core::{FieldKind, FieldValue, Schema, Tid};
/// use chronodb_records::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Customer {
///     id: Tid,
///     name: String,
/// }
///
/// impl Record for Customer {
///     fn schema() -> Schema {
///         Schema::builder().field("name", FieldKind::String).build()
///     }
///     fn id(&self) -> Tid {
///         self.id
///     }
///     fn set_id(&mut self, id: Tid) {
///         self.id = id;
///     }
///     fn field(&self, name: &str) -> Option<FieldValue> {
///         match name {
///             "name" => Some(self.name.as_str().into()),
///             _ => None,
///         }
///     }
/// }
///
/// assert_eq!(Customer::type_name(), "customer");
/// ```
pub trait Record: Serialize + DeserializeOwned + Default + Send + 'static {
    /// Key namespace of the type
    ///
    /// Defaults to the last path segment of the Rust type name, lower-cased.
    fn type_name() -> String {
        let full = std::any::type_name::<Self>();
        // Strip generic arguments before taking the last segment
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_lowercase()
    }

    /// Field table; called once per type and cached by the store
    fn schema() -> Schema;

    /// Current identifier, `Tid::ZERO` when unassigned
    fn id(&self) -> Tid;

    /// Replace the identifier
    fn set_id(&mut self, id: Tid);

    /// Value of a declared field, `None` if the field does not exist
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Called after the record is fetched by `get`, `get_ids` or a query
    fn after_get(&mut self, _ctx: &QueryContext) {}
}

/// Caller-supplied values made available to after-get hooks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryContext {
    values: BTreeMap<String, FieldValue>,
}

impl QueryContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous value for `key`
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no values are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
