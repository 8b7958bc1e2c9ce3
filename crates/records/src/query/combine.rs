//! Query combination
//!
//! `or` and `and` execute their input queries, each with its own window,
//! and merge the selected identifiers. The result is a query holding that
//! identifier set, ordered by identifier (creation time). It accepts
//! `reverse`, `limit`, `offset` and date bounds, and can be combined again.
//! Index constraints set on a combined query are ignored.

use std::collections::BTreeSet;

use chronodb_core::{QueryError, Result, Tid};
use tracing::debug;

use super::Query;
use crate::record::Record;

/// Records selected by any of `queries`
///
/// # Errors
///
/// [`QueryError::EmptyCombination`] when `queries` is empty, or the first
/// error any input query returns.
pub fn or<R: Record>(queries: impl IntoIterator<Item = Query<R>>) -> Result<Query<R>> {
    combine(queries, "or", |acc, ids| {
        acc.extend(ids);
    })
}

/// Records selected by every one of `queries`
///
/// # Errors
///
/// [`QueryError::EmptyCombination`] when `queries` is empty, or the first
/// error any input query returns.
pub fn and<R: Record>(queries: impl IntoIterator<Item = Query<R>>) -> Result<Query<R>> {
    combine(queries, "and", |acc, ids| {
        acc.retain(|id| ids.contains(id));
    })
}

fn combine<R: Record>(
    queries: impl IntoIterator<Item = Query<R>>,
    op: &'static str,
    merge: impl Fn(&mut BTreeSet<Tid>, BTreeSet<Tid>),
) -> Result<Query<R>> {
    let mut queries = queries.into_iter();
    let first = queries.next().ok_or(QueryError::EmptyCombination)?;

    let mut acc: BTreeSet<Tid> = first.ids()?.into_iter().collect();
    let mut inputs = 1;
    for query in queries {
        let ids = query.ids()?.into_iter().collect();
        merge(&mut acc, ids);
        inputs += 1;
    }

    debug!(target: "chronodb::records", op, inputs, selected = acc.len(), "Queries combined");

    let mut combined = Query::new(first.store);
    combined.context = first.context;
    combined.combined = Some(acc.into_iter().collect());
    Ok(combined)
}
