//! Declarative query options

use chrono::{DateTime, Utc};
use chronodb_core::FieldValue;
use serde::{Deserialize, Serialize};

use super::Query;

/// A query described as data instead of builder calls
///
/// ```ignore
/// let opts = QueryOptions {
///     index_name: "customer".into(),
///     index_params: vec!["jon".into()],
///     reverse: true,
///     limit: 10,
///     ..Default::default()
/// };
/// let orders = store.query::<Order>(opts).run()?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Return at most one record; overrides `limit`
    pub first: bool,
    /// Iterate from the end
    pub reverse: bool,
    /// Maximum number of records, 0 for no limit
    pub limit: usize,
    /// Matches to skip
    pub offset: usize,
    /// Range start when `index_params` is empty
    pub start: FieldValue,
    /// Range end when `index_params` is empty
    pub end: FieldValue,
    /// Lower creation-time bound
    pub from: Option<DateTime<Utc>>,
    /// Upper creation-time bound
    pub to: Option<DateTime<Utc>>,
    /// Index to query; empty for a plain query
    pub index_name: String,
    /// One value for an exact match, two for a range
    pub index_params: Vec<FieldValue>,
}

impl QueryOptions {
    /// Apply the options to a fresh query
    pub fn apply<R>(self, query: Query<R>) -> Query<R> {
        let mut query = if self.first {
            query.first()
        } else {
            query.limit(self.limit)
        };
        if self.offset > 0 {
            query = query.offset(self.offset);
        }
        if self.reverse {
            query = query.reverse();
        }
        if let Some(from) = self.from {
            query = query.from(from);
        }
        if let Some(to) = self.to {
            query = query.to(to);
        }

        if self.index_name.is_empty() {
            return query;
        }
        let mut params = self.index_params.into_iter();
        match (params.next(), params.next(), params.next()) {
            (Some(value), None, None) => query.matching(&self.index_name, value),
            (Some(start), Some(end), None) => query.range(&self.index_name, start, end),
            (None, _, _) if !(self.start.is_null() && self.end.is_null()) => {
                query.range(&self.index_name, self.start, self.end)
            }
            _ => query,
        }
    }
}
