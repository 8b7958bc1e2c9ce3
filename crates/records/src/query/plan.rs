//! Scan planning
//!
//! A query resolves to one ordered scan over a contiguous key range plus a
//! per-key filter. Plain queries walk the primary keys of the type, which
//! are ordered by identifier and therefore by creation time. Index queries
//! walk one index, ordered by encoded value and then identifier.

use std::ops::Bound;

use chronodb_core::encoding::encode_as;
use chronodb_core::key::{
    id_from_key, index_prefix, index_value_prefix, prefix_successor, primary_prefix,
    value_component,
};
use chronodb_core::{Direction, FieldKind, FieldValue, QueryError, Result, SnapshotView, Tid};

use super::IndexFilter;
use crate::registry::RecordType;

/// One key accepted by a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hit {
    pub id: Tid,
    /// Encoded index value; empty for primary scans
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ValueFilter {
    Any,
    Exact(Vec<u8>),
    Between(Option<Vec<u8>>, Option<Vec<u8>>),
    Prefix(Vec<u8>),
}

impl ValueFilter {
    fn accepts(&self, value: &[u8]) -> bool {
        match self {
            ValueFilter::Any => true,
            ValueFilter::Exact(expected) => value == expected.as_slice(),
            ValueFilter::Between(start, end) => {
                start.as_deref().map_or(true, |s| value >= s)
                    && end.as_deref().map_or(true, |e| value <= e)
            }
            ValueFilter::Prefix(prefix) => value.starts_with(prefix),
        }
    }
}

/// Resolved scan of one query
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    lower: Vec<u8>,
    upper: Option<Vec<u8>>,
    upper_inclusive: bool,
    direction: Direction,
    /// Length of the fixed prefix before the value component
    prefix_len: usize,
    index: Option<(FieldKind, ValueFilter)>,
    from: Tid,
    to: Tid,
}

impl Plan {
    /// Resolve the scan for a query over `record_type`
    pub fn resolve(
        record_type: &RecordType,
        filter: Option<&IndexFilter>,
        from: Option<Tid>,
        to: Option<Tid>,
        reverse: bool,
    ) -> std::result::Result<Self, QueryError> {
        let direction = if reverse {
            Direction::Reverse
        } else {
            Direction::Forward
        };
        let from = from.unwrap_or(Tid::ZERO);
        let to = to.unwrap_or(Tid::MAX);

        let Some(filter) = filter else {
            let prefix = primary_prefix(&record_type.type_name);
            let mut lower = prefix.clone();
            lower.extend_from_slice(&from.to_bytes());
            let mut upper = prefix.clone();
            upper.extend_from_slice(&to.to_bytes());
            return Ok(Self {
                lower,
                upper: Some(upper),
                upper_inclusive: true,
                direction,
                prefix_len: prefix.len(),
                index: None,
                from,
                to,
            });
        };

        let index = filter.index();
        let spec = record_type
            .schema
            .index(index)
            .ok_or_else(|| QueryError::UnknownIndex(index.to_string()))?;
        let kind = spec.kind;
        let prefix = index_prefix(&record_type.type_name, index);
        let encode = |value: &FieldValue| {
            encode_as(kind, value).ok_or_else(|| QueryError::InvalidParam {
                index: index.to_string(),
                reason: format!("{:?} cannot be encoded as {}", value, kind),
            })
        };

        let (lower, upper, value_filter) = match filter {
            IndexFilter::Match { value, .. } => {
                let encoded = encode(value)?;
                let lower = index_value_prefix(&record_type.type_name, index, &encoded);
                let upper = prefix_successor(&lower);
                (lower, upper, ValueFilter::Exact(encoded))
            }
            IndexFilter::Range { start, end, .. } => {
                let start = (!start.is_null()).then(|| encode(start)).transpose()?;
                let end = (!end.is_null()).then(|| encode(end)).transpose()?;
                let lower = match &start {
                    Some(s) => index_value_prefix(&record_type.type_name, index, s),
                    None => prefix.clone(),
                };
                let upper = match &end {
                    Some(e) => prefix_successor(&index_value_prefix(
                        &record_type.type_name,
                        index,
                        e,
                    )),
                    None => prefix_successor(&prefix),
                };
                (lower, upper, ValueFilter::Between(start, end))
            }
            IndexFilter::StartsWith { prefix: text, .. } => {
                if kind != FieldKind::String {
                    return Err(QueryError::InvalidParam {
                        index: index.to_string(),
                        reason: format!("starts-with needs a string index, not {}", kind),
                    });
                }
                let encoded = encode(&FieldValue::String(text.clone()))?;
                let lower = index_value_prefix(&record_type.type_name, index, &encoded);
                let upper = prefix_successor(&lower);
                (lower, upper, ValueFilter::Prefix(encoded))
            }
            IndexFilter::OrderBy { .. } => {
                let upper = prefix_successor(&prefix);
                (prefix.clone(), upper, ValueFilter::Any)
            }
        };

        Ok(Self {
            lower,
            upper,
            upper_inclusive: false,
            direction,
            prefix_len: prefix.len(),
            index: Some((kind, value_filter)),
            from,
            to,
        })
    }

    /// Kind of the scanned index, `None` for primary scans
    pub fn index_kind(&self) -> Option<FieldKind> {
        self.index.as_ref().map(|(kind, _)| *kind)
    }

    /// Run the scan, passing every accepted key to `visit` in order
    ///
    /// `visit` returns false to stop the scan early.
    pub fn scan(
        &self,
        snapshot: &dyn SnapshotView,
        mut visit: impl FnMut(Hit) -> bool,
    ) -> Result<()> {
        let upper = match (&self.upper, self.upper_inclusive) {
            (Some(u), true) => Bound::Included(u.as_slice()),
            (Some(u), false) => Bound::Excluded(u.as_slice()),
            (None, _) => Bound::Unbounded,
        };
        let iter = snapshot.scan(Bound::Included(self.lower.as_slice()), upper, self.direction)?;

        for (key, _) in iter {
            let Some(hit) = self.accept(key) else {
                continue;
            };
            if !visit(hit) {
                break;
            }
        }
        Ok(())
    }

    fn accept(&self, key: &[u8]) -> Option<Hit> {
        let id = id_from_key(key)?;
        if id < self.from || id > self.to {
            return None;
        }
        let value = value_component(key, self.prefix_len)?;
        match &self.index {
            None if value.is_empty() => Some(Hit {
                id,
                value: Vec::new(),
            }),
            None => None,
            Some((_, filter)) if filter.accepts(value) => Some(Hit {
                id,
                value: value.to_vec(),
            }),
            Some(_) => None,
        }
    }
}
