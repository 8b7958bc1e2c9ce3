//! Repository tests: save, get, get_ids, delete

use crate::common::*;
use std::sync::Arc;
use std::thread;

// ============================================================================
// Save
// ============================================================================

#[test]
fn save_assigns_ordered_identifiers() {
    let ts = TestStore::cache();
    let orders = save_customers(&ts, &["a", "b", "c"]);

    assert!(orders.iter().all(|o| !o.id.is_zero()));
    assert!(orders.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(ts.find::<Order>().count().unwrap(), 3);
}

#[test]
fn save_empty_batch_is_noop() {
    let ts = TestStore::cache();
    let mut none: Vec<Order> = Vec::new();
    assert_eq!(ts.save(&mut none).unwrap(), 0);
    assert_eq!(ts.db().current_version(), 0);
}

#[test]
fn save_with_existing_id_updates_in_place() {
    let ts = TestStore::cache();
    let mut order = Order::new("jon", 1, 10.0);
    ts.save_one(&mut order).unwrap();
    let id = order.id;

    order.total = 20.0;
    ts.save_one(&mut order).unwrap();
    assert_eq!(order.id, id);

    let stored = ts.get_by_id::<Order>(id).unwrap().unwrap();
    assert_eq!(stored.total, 20.0);
    assert_eq!(ts.find::<Order>().count().unwrap(), 1);
}

#[test]
fn batch_is_atomic_when_a_record_fails() {
    let ts = TestStore::cache();
    let mut readings = vec![
        Reading::new("a", "1.5"),
        Reading::new("b", "2.5"),
        Reading::new("c", "not a number"),
    ];

    let err = ts.save(&mut readings).unwrap_err();
    assert!(matches!(err, Error::Schema(_)));

    assert_eq!(ts.find::<Reading>().count().unwrap(), 0);
    assert_eq!(
        ts.find::<Reading>().matching("sensor", "a").count().unwrap(),
        0
    );
    // Identifiers were assigned before the batch failed
    assert!(!readings[0].id.is_zero());
    assert_eq!(ts.get_by_id::<Reading>(readings[0].id).unwrap(), None);
}

#[test]
fn update_removes_stale_index_entries() {
    let ts = TestStore::cache();
    let mut order = Order::new("jon", 1, 10.0);
    order.tags = vec!["red".into(), "blue".into()];
    ts.save_one(&mut order).unwrap();

    order.customer = "pablo".into();
    order.tags = vec!["blue".into(), "green".into()];
    ts.save_one(&mut order).unwrap();

    let count = |index: &str, value: &str| {
        ts.find::<Order>().matching(index, value).count().unwrap()
    };
    assert_eq!(count("customer", "jon"), 0);
    assert_eq!(count("customer", "pablo"), 1);
    assert_eq!(count("tags", "red"), 0);
    assert_eq!(count("tags", "blue"), 1);
    assert_eq!(count("tags", "green"), 1);
}

#[test]
fn noindex_field_is_not_queryable() {
    let ts = TestStore::cache();
    let mut order = Order::new("jon", 1, 10.0);
    order.internal = "secret".into();
    ts.save_one(&mut order).unwrap();

    let err = ts
        .find::<Order>()
        .matching("internal", "secret")
        .run()
        .unwrap_err();
    assert_eq!(
        err.query(),
        Some(&QueryError::UnknownIndex("internal".into()))
    );
}

#[test]
fn concurrent_saves_all_land() {
    let ts = TestStore::cache();
    let store = Arc::new(ts.store.clone());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    let mut order = Order::new(&format!("c{}", t), i, i as f64);
                    store.save_one(&mut order).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(ts.find::<Order>().count().unwrap(), 100);
    assert_eq!(ts.find::<Order>().matching("customer", "c2").count().unwrap(), 25);
}

// ============================================================================
// Get
// ============================================================================

#[test]
fn get_reloads_record_and_runs_hook() {
    let ts = TestStore::cache();
    let saved = save_customers(&ts, &["jon"]).remove(0);

    let mut lookup = Order {
        id: saved.id,
        ..Default::default()
    };
    assert!(ts.get(&mut lookup).unwrap());
    assert_eq!(lookup.customer, "jon");
    assert!(lookup.retrieved);
}

#[test]
fn get_with_zero_id_finds_nothing() {
    let ts = TestStore::cache();
    save_customers(&ts, &["jon"]);

    let mut lookup = Order::new("untouched", 0, 0.0);
    assert!(!ts.get(&mut lookup).unwrap());
    assert_eq!(lookup.customer, "untouched");
    assert!(!lookup.retrieved);
}

#[test]
fn get_unknown_id_finds_nothing() {
    let ts = TestStore::cache();
    let mut lookup = Order {
        id: Tid::new(),
        ..Default::default()
    };
    assert!(!ts.get(&mut lookup).unwrap());
}

#[test]
fn get_does_not_cross_record_types() {
    let ts = TestStore::cache();
    let order = save_customers(&ts, &["jon"]).remove(0);
    assert_eq!(ts.get_by_id::<Note>(order.id).unwrap(), None);
}

#[test]
fn get_ids_keeps_requested_order() {
    let ts = TestStore::cache();
    let orders = save_customers(&ts, &["a", "b", "c", "d"]);

    let ids = vec![orders[2].id, Tid::new(), orders[0].id, Tid::ZERO, orders[3].id];
    let mut out = vec![Order::new("stale", 0, 0.0)];
    let n = ts.get_ids(&mut out, &ids).unwrap();

    assert_eq!(n, 3);
    assert_eq!(customers(&out), vec!["c", "a", "d"]);
    assert!(out.iter().all(|o| o.retrieved));
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn delete_removes_record_and_index_entries() {
    let ts = TestStore::cache();
    let mut orders = save_customers(&ts, &["jon", "pablo"]);
    orders[0].tags = vec!["x".into()];
    ts.save_one(&mut orders[0]).unwrap();

    assert!(ts.delete::<Order>(orders[0].id).unwrap());
    assert!(!ts.delete::<Order>(orders[0].id).unwrap());
    assert!(!ts.delete::<Order>(Tid::ZERO).unwrap());

    assert_eq!(ts.find::<Order>().count().unwrap(), 1);
    assert_eq!(ts.find::<Order>().matching("customer", "jon").count().unwrap(), 0);
    assert_eq!(ts.find::<Order>().matching("tags", "x").count().unwrap(), 0);
    assert_eq!(ts.find::<Order>().order_by("department").count().unwrap(), 1);
}

// ============================================================================
// Codec
// ============================================================================

#[test]
fn json_codec_store_reads_back() {
    let ts = TestStore::cache();
    let store = ts.store.clone().with_codec(RecordCodec::Json);
    let mut order = Order::new("jon", 3, 9.5);
    order.tags = vec!["a".into()];
    store.save_one(&mut order).unwrap();

    let stored = store.get_by_id::<Order>(order.id).unwrap().unwrap();
    assert_eq!(stored.customer, "jon");
    assert_eq!(stored.tags, vec!["a".to_string()]);
}
