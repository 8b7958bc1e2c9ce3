//! Query builder
//!
//! A [`Query`] is built by chaining calls on a value and executed by
//! `run`, `count`, `quick_sum` or `ids`. Builder calls never fail: the first
//! invalid call records a sticky error, later builder calls leave the query
//! unchanged, and every execution returns that error.
//!
//! ```ignore
//! let orders = store
//!     .find::<Order>()
//!     .range("total", 10.0, 100.0)
//!     .from(last_week)
//!     .reverse()
//!     .limit(20)
//!     .run()?;
//! ```
//!
//! Executing does not consume the query; running the same query twice gives
//! the same result unless the data changed in between.

mod combine;
mod execute;
mod options;
mod plan;

pub use combine::{and, or};
pub use execute::QuickSumTarget;
pub use options::QueryOptions;

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use chronodb_core::tid::millis_of;
use chronodb_core::{FieldValue, QueryError, Tid};

use crate::record::QueryContext;
use crate::store::RecordStore;

/// Index constraint of a query
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum IndexFilter {
    /// Entries whose value equals `value`
    Match { index: String, value: FieldValue },
    /// Entries whose value is within `[start, end]`; `Null` is unbounded
    Range {
        index: String,
        start: FieldValue,
        end: FieldValue,
    },
    /// String entries starting with `prefix`
    StartsWith { index: String, prefix: String },
    /// Every entry, in index value order
    OrderBy { index: String },
}

impl IndexFilter {
    pub(crate) fn index(&self) -> &str {
        match self {
            IndexFilter::Match { index, .. }
            | IndexFilter::Range { index, .. }
            | IndexFilter::StartsWith { index, .. }
            | IndexFilter::OrderBy { index } => index,
        }
    }
}

/// A query over records of type `R`
pub struct Query<R> {
    pub(crate) store: RecordStore,
    pub(crate) limit: usize,
    pub(crate) offset: usize,
    pub(crate) reverse: bool,
    pub(crate) from: Option<Tid>,
    pub(crate) to: Option<Tid>,
    pub(crate) filter: Option<IndexFilter>,
    pub(crate) context: QueryContext,
    /// Identifier set of an `or`/`and` result, ascending
    pub(crate) combined: Option<Vec<Tid>>,
    pub(crate) error: Option<QueryError>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Query<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            limit: self.limit,
            offset: self.offset,
            reverse: self.reverse,
            from: self.from,
            to: self.to,
            filter: self.filter.clone(),
            context: self.context.clone(),
            combined: self.combined.clone(),
            error: self.error.clone(),
            _record: PhantomData,
        }
    }
}

impl<R> std::fmt::Debug for Query<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("type", &std::any::type_name::<R>())
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("reverse", &self.reverse)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("filter", &self.filter)
            .field("combined", &self.combined.as_ref().map(Vec::len))
            .field("error", &self.error)
            .finish()
    }
}

impl<R> Query<R> {
    pub(crate) fn new(store: RecordStore) -> Self {
        Self {
            store,
            limit: 0,
            offset: 0,
            reverse: false,
            from: None,
            to: None,
            filter: None,
            context: QueryContext::new(),
            combined: None,
            error: None,
            _record: PhantomData,
        }
    }

    fn fail(mut self, error: QueryError) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    /// The sticky error, if a builder call was invalid
    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// Return at most one record
    pub fn first(self) -> Self {
        self.limit(1)
    }

    /// Return at most `n` records; 0 means no limit
    pub fn limit(mut self, n: usize) -> Self {
        if self.error.is_none() {
            self.limit = n;
        }
        self
    }

    /// Skip the first `n` matches, in iteration order
    pub fn offset(mut self, n: usize) -> Self {
        if self.error.is_none() {
            self.offset = n;
        }
        self
    }

    /// Iterate from the end: newest first, or highest index value first
    pub fn reverse(mut self) -> Self {
        if self.error.is_none() {
            self.reverse = true;
        }
        self
    }

    /// Attach a value for after-get hooks
    pub fn set_context(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        if self.error.is_none() {
            self.context.insert(key, value);
        }
        self
    }

    /// Context values attached with `set_context`
    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// Records whose `index` equals `value` (case-insensitive for strings)
    ///
    /// A `Null` value records [`QueryError::NilMatchParam`].
    pub fn matching(mut self, index: &str, value: impl Into<FieldValue>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let value = value.into();
        if value.is_null() {
            return self.fail(QueryError::NilMatchParam);
        }
        self.filter = Some(IndexFilter::Match {
            index: index.to_lowercase(),
            value,
        });
        self
    }

    /// Records whose `index` lies within `[start, end]`
    ///
    /// Either bound may be `Null` for an open end; both `Null` records
    /// [`QueryError::NilRangeParams`].
    pub fn range(
        mut self,
        index: &str,
        start: impl Into<FieldValue>,
        end: impl Into<FieldValue>,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        let (start, end) = (start.into(), end.into());
        if start.is_null() && end.is_null() {
            return self.fail(QueryError::NilRangeParams);
        }
        self.filter = Some(IndexFilter::Range {
            index: index.to_lowercase(),
            start,
            end,
        });
        self
    }

    /// Records whose string `index` starts with `prefix` (case-insensitive)
    ///
    /// An empty prefix records [`QueryError::BlankStartsWith`].
    pub fn starts_with(mut self, index: &str, prefix: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        if prefix.is_empty() {
            return self.fail(QueryError::BlankStartsWith);
        }
        self.filter = Some(IndexFilter::StartsWith {
            index: index.to_lowercase(),
            prefix: prefix.to_lowercase(),
        });
        self
    }

    /// Order results by `index` without constraining them
    ///
    /// Replaces any match, range or prefix constraint.
    pub fn order_by(mut self, index: &str) -> Self {
        if self.error.is_none() {
            self.filter = Some(IndexFilter::OrderBy {
                index: index.to_lowercase(),
            });
        }
        self
    }

    /// Only records created at or after `t`
    ///
    /// Times at or before the epoch remove the lower bound's effect.
    pub fn from(mut self, t: DateTime<Utc>) -> Self {
        if self.error.is_none() {
            self.from = Some(lower_bound_of(t));
        }
        self
    }

    /// Only records created at or before `t`
    pub fn to(mut self, t: DateTime<Utc>) -> Self {
        if self.error.is_none() {
            self.to = Some(Tid::ceiling_of(millis_of(t)));
        }
        self
    }

    /// Set exact, inclusive identifier bounds
    pub fn manual_from_to(mut self, from: Tid, to: Tid) -> Self {
        if self.error.is_none() {
            self.from = Some(from);
            self.to = Some(to);
        }
        self
    }

    /// True for match, range, prefix and order-by queries
    ///
    /// Combined queries never are, whatever constraint was set on them.
    pub fn is_index_query(&self) -> bool {
        self.filter.is_some() && self.combined.is_none()
    }
}

/// Inclusive identifier lower bound for records created at or after `t`
///
/// Every identifier minted in millisecond `ms` sorts above the largest
/// identifier of `ms - 1`.
fn lower_bound_of(t: DateTime<Utc>) -> Tid {
    match millis_of(t) {
        0 => Tid::ZERO,
        ms => Tid::ceiling_of(ms - 1),
    }
}
