//! Window invariants over random offset, limit and direction

use crate::common::*;
use proptest::prelude::*;

const ORDERS: usize = 12;

/// Twelve orders; order `i` has department `i % 4` and total `i`.
fn seeded() -> (TestStore, Vec<Order>) {
    let ts = TestStore::cache();
    let mut orders: Vec<Order> = (0..ORDERS)
        .map(|i| Order::new(&format!("c{}", i % 3), (i % 4) as i64, i as f64))
        .collect();
    ts.save(&mut orders).unwrap();
    (ts, orders)
}

/// Expected ids: the selected orders in creation order, then the window
fn window(
    orders: &[Order],
    keep: impl Fn(usize) -> bool,
    offset: usize,
    limit: usize,
    reverse: bool,
) -> Vec<Tid> {
    let mut ids: Vec<Tid> = (0..orders.len())
        .filter(|&i| keep(i))
        .map(|i| orders[i].id)
        .collect();
    if reverse {
        ids.reverse();
    }
    let take = if limit == 0 { usize::MAX } else { limit };
    ids.into_iter().skip(offset).take(take).collect()
}

fn shaped(query: Query<Order>, offset: usize, limit: usize, reverse: bool) -> Query<Order> {
    let query = query.offset(offset).limit(limit);
    if reverse {
        query.reverse()
    } else {
        query
    }
}

fn check(query: Query<Order>, expected: Vec<Tid>) -> Result<(), TestCaseError> {
    let ids = query.ids().unwrap();
    prop_assert_eq!(query.count().unwrap(), ids.len());
    prop_assert_eq!(query.run().unwrap().len(), ids.len());
    prop_assert_eq!(ids, expected);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn count_agrees_with_run(
        offset in 0..ORDERS + 3,
        limit in 0..ORDERS + 3,
        reverse in any::<bool>(),
        dept in 0i64..4,
        lo in 0..ORDERS,
        span in 0..ORDERS,
    ) {
        let (ts, orders) = seeded();
        let hi = lo + span;
        let in_dept = |i: usize| (i % 4) as i64 == dept;
        let in_range = |i: usize| i >= lo && i <= hi;

        check(
            shaped(ts.find::<Order>(), offset, limit, reverse),
            window(&orders, |_| true, offset, limit, reverse),
        )?;
        check(
            shaped(ts.find::<Order>().matching("department", dept), offset, limit, reverse),
            window(&orders, in_dept, offset, limit, reverse),
        )?;
        check(
            shaped(
                ts.find::<Order>().range("total", lo as f64, hi as f64),
                offset,
                limit,
                reverse,
            ),
            window(&orders, in_range, offset, limit, reverse),
        )?;

        let union = or([
            ts.find::<Order>().matching("department", dept),
            ts.find::<Order>().range("total", lo as f64, hi as f64),
        ])
        .unwrap();
        check(
            shaped(union, offset, limit, reverse),
            window(&orders, |i| in_dept(i) || in_range(i), offset, limit, reverse),
        )?;
    }
}
