//! Declarative queries built from QueryOptions

use crate::common::*;

fn seeded() -> (TestStore, Vec<Order>) {
    let ts = TestStore::cache();
    let mut orders: Vec<Order> = (0..6)
        .map(|i| Order::new(if i % 2 == 0 { "even" } else { "odd" }, i, i as f64))
        .collect();
    ts.save(&mut orders).unwrap();
    (ts, orders)
}

#[test]
fn default_options_select_everything() {
    let (ts, _) = seeded();
    let found = ts.query::<Order>(QueryOptions::default()).run().unwrap();
    assert_eq!(found.len(), 6);
}

#[test]
fn one_param_is_a_match() {
    let (ts, orders) = seeded();
    let opts = QueryOptions {
        index_name: "Customer".into(),
        index_params: vec!["ODD".into()],
        reverse: true,
        ..Default::default()
    };
    let ids = ts.query::<Order>(opts).ids().unwrap();
    assert_eq!(ids, vec![orders[5].id, orders[3].id, orders[1].id]);
}

#[test]
fn two_params_are_a_range() {
    let (ts, _) = seeded();
    let opts = QueryOptions {
        index_name: "department".into(),
        index_params: vec![1.into(), 4.into()],
        offset: 1,
        limit: 2,
        ..Default::default()
    };
    let found = ts.query::<Order>(opts).run().unwrap();
    assert_eq!(found.iter().map(|o| o.department).collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn start_and_end_without_params() {
    let (ts, _) = seeded();
    let opts = QueryOptions {
        index_name: "total".into(),
        start: 3.into(),
        ..Default::default()
    };
    assert_eq!(ts.query::<Order>(opts).count().unwrap(), 3);
}

#[test]
fn first_wins_over_limit() {
    let (ts, orders) = seeded();
    let opts = QueryOptions {
        first: true,
        limit: 5,
        reverse: true,
        ..Default::default()
    };
    let found = ts.query::<Order>(opts).run().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, orders[5].id);
}

#[test]
fn date_bounds_from_options() {
    let (ts, _) = seeded();
    let opts = QueryOptions {
        to: Some(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()),
        ..Default::default()
    };
    assert_eq!(ts.query::<Order>(opts).count().unwrap(), 0);

    let opts = QueryOptions {
        from: Some(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()),
        ..Default::default()
    };
    assert_eq!(ts.query::<Order>(opts).count().unwrap(), 6);
}

#[test]
fn null_match_param_surfaces_on_run() {
    let (ts, _) = seeded();
    let opts = QueryOptions {
        index_name: "customer".into(),
        index_params: vec![FieldValue::Null],
        ..Default::default()
    };
    let err = ts.query::<Order>(opts).run().unwrap_err();
    assert_eq!(err.query(), Some(&QueryError::NilMatchParam));
}
