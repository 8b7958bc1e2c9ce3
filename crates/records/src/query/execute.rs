//! Query execution
//!
//! Every execution reads from one snapshot taken when it starts. Index
//! queries may meet the same record more than once (one entry per list
//! element or word); results and counts report each record once, at its
//! first position in iteration order. Offset and limit apply after that.

use std::collections::HashSet;

use chronodb_core::encoding::decode_numeric;
use chronodb_core::{Error, FieldValue, QueryError, Result, SnapshotView, Tid};
use tracing::{debug, trace};

use super::plan::Plan;
use super::Query;
use crate::record::Record;

/// Numeric type a [`Query::quick_sum`] can accumulate into
pub trait QuickSumTarget: Default + Copy {
    /// Add one decoded index value
    fn accumulate(&mut self, value: &FieldValue);
}

impl QuickSumTarget for i64 {
    fn accumulate(&mut self, value: &FieldValue) {
        let v = match value {
            FieldValue::Int(v) => *v,
            FieldValue::UInt(v) => i64::try_from(*v).unwrap_or(i64::MAX),
            FieldValue::Float(v) => *v as i64,
            _ => return,
        };
        *self = self.saturating_add(v);
    }
}

impl QuickSumTarget for u64 {
    fn accumulate(&mut self, value: &FieldValue) {
        let v = match value {
            FieldValue::UInt(v) => *v,
            FieldValue::Int(v) => u64::try_from(*v).unwrap_or(0),
            FieldValue::Float(v) if *v > 0.0 => *v as u64,
            _ => return,
        };
        *self = self.saturating_add(v);
    }
}

impl QuickSumTarget for f64 {
    fn accumulate(&mut self, value: &FieldValue) {
        if let Some(v) = value.as_f64() {
            *self += v;
        }
    }
}

impl<R: Record> Query<R> {
    fn check(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(Error::Query(e.clone())),
            None => Ok(()),
        }
    }

    /// Identifiers the query selects, in result order
    pub fn ids(&self) -> Result<Vec<Tid>> {
        self.check()?;
        let snapshot = self.store.db().snapshot();
        self.ids_in(&snapshot)
    }

    fn ids_in(&self, snapshot: &dyn SnapshotView) -> Result<Vec<Tid>> {
        if let Some(combined) = &self.combined {
            return Ok(self.window_combined(combined));
        }

        let record_type = self.store.record_type::<R>()?;
        let plan = Plan::resolve(
            &record_type,
            self.filter.as_ref(),
            self.from,
            self.to,
            self.reverse,
        )?;

        let mut seen = HashSet::new();
        let mut skipped = 0;
        let mut ids = Vec::new();
        plan.scan(snapshot, |hit| {
            if !seen.insert(hit.id) {
                return true;
            }
            if skipped < self.offset {
                skipped += 1;
                return true;
            }
            ids.push(hit.id);
            self.limit == 0 || ids.len() < self.limit
        })?;

        trace!(
            target: "chronodb::records",
            type_name = %record_type.type_name,
            index = self.filter.as_ref().map(|f| f.index()),
            matched = ids.len(),
            "Scan finished"
        );
        Ok(ids)
    }

    fn window_combined(&self, combined: &[Tid]) -> Vec<Tid> {
        let from = self.from.unwrap_or(Tid::ZERO);
        let to = self.to.unwrap_or(Tid::MAX);
        let in_bounds = |id: &&Tid| **id >= from && **id <= to;
        let take = if self.limit == 0 {
            usize::MAX
        } else {
            self.limit
        };

        if self.reverse {
            combined
                .iter()
                .rev()
                .filter(in_bounds)
                .skip(self.offset)
                .take(take)
                .copied()
                .collect()
        } else {
            combined
                .iter()
                .filter(in_bounds)
                .skip(self.offset)
                .take(take)
                .copied()
                .collect()
        }
    }

    /// Execute the query and return the matching records
    ///
    /// Each record's after-get hook runs once with the query context.
    pub fn run(&self) -> Result<Vec<R>> {
        let mut out = Vec::new();
        self.run_into(&mut out)?;
        Ok(out)
    }

    /// Execute the query into `out`, replacing its contents
    ///
    /// Returns the number of records.
    pub fn run_into(&self, out: &mut Vec<R>) -> Result<usize> {
        out.clear();
        self.check()?;

        let record_type = self.store.record_type::<R>()?;
        let snapshot = self.store.db().snapshot();
        let ids = self.ids_in(&snapshot)?;

        out.reserve(ids.len());
        for id in ids {
            if let Some(record) = self.store.fetch::<R>(&snapshot, &record_type, id)? {
                out.push(record);
            }
        }
        for record in out.iter_mut() {
            record.after_get(&self.context);
        }

        debug!(
            target: "chronodb::records",
            type_name = %record_type.type_name,
            returned = out.len(),
            version = snapshot.version(),
            "Query executed"
        );
        Ok(out.len())
    }

    /// Execute the query and return the first record, if any
    pub fn run_first(&self) -> Result<Option<R>> {
        let mut out = Vec::with_capacity(1);
        self.clone().limit(1).run_into(&mut out)?;
        Ok(out.pop())
    }

    /// Number of records the query selects, without reading them
    pub fn count(&self) -> Result<usize> {
        self.ids().map(|ids| ids.len())
    }

    /// Sum the index values the query visits, without reading records
    ///
    /// Every visited entry counts, so a record with several entries in a
    /// list index contributes each of them. Offset and limit apply to
    /// entries.
    ///
    /// # Errors
    ///
    /// [`QueryError::QuickSumRequiresIndex`] for plain and combined queries,
    /// [`QueryError::NotSummable`] for non-numeric indexes.
    pub fn quick_sum<T: QuickSumTarget>(&self) -> Result<T> {
        self.check()?;
        let filter = match (&self.filter, &self.combined) {
            (Some(filter), None) => filter,
            _ => return Err(QueryError::QuickSumRequiresIndex.into()),
        };

        let record_type = self.store.record_type::<R>()?;
        let plan = Plan::resolve(&record_type, Some(filter), self.from, self.to, self.reverse)?;
        let kind = match plan.index_kind() {
            Some(kind) if kind.is_numeric() => kind,
            _ => {
                return Err(QueryError::NotSummable {
                    index: filter.index().to_string(),
                }
                .into())
            }
        };

        let snapshot = self.store.db().snapshot();
        let mut sum = T::default();
        let mut skipped = 0;
        let mut taken = 0;
        plan.scan(&snapshot, |hit| {
            if skipped < self.offset {
                skipped += 1;
                return true;
            }
            if let Some(value) = decode_numeric(kind, &hit.value) {
                sum.accumulate(&value);
            }
            taken += 1;
            self.limit == 0 || taken < self.limit
        })?;

        debug!(
            target: "chronodb::records",
            type_name = %record_type.type_name,
            index = filter.index(),
            entries = taken,
            "Quick sum executed"
        );
        Ok(sum)
    }
}
