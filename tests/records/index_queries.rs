//! Index queries: match, range, starts-with, order-by and quick sum

use crate::common::*;

fn departments(orders: &[Order]) -> Vec<i64> {
    orders.iter().map(|o| o.department).collect()
}

/// Ten orders, department i and total i * 1.5 for i in 0..10.
fn ten_orders() -> TestStore {
    let ts = TestStore::cache();
    let mut orders: Vec<Order> = (0..10)
        .map(|i| Order::new(&format!("c{}", i % 3), i, i as f64 * 1.5))
        .collect();
    ts.save(&mut orders).unwrap();
    ts
}

// ============================================================================
// Starts-with
// ============================================================================

#[test]
fn starts_with_counts() {
    let ts = TestStore::cache();
    save_customers(&ts, &["j", "jo", "jon", "jonathan", "job", "pablo"]);
    // Same values on another type
    let mut notes = vec![
        Note { customer: "jo".into(), ..Default::default() },
        Note { customer: "jon".into(), ..Default::default() },
    ];
    ts.save(&mut notes).unwrap();

    let cases = [
        ("nocustomerwiththisname", 0),
        ("pablo", 1),
        ("jonathan", 1),
        ("job", 1),
        ("j", 5),
        ("jo", 4),
        ("jon", 2),
        ("JON", 2),
    ];

    for reverse in [false, true] {
        for (prefix, expected) in cases {
            let mut query = ts.find::<Order>().starts_with("customer", prefix);
            if reverse {
                query = query.reverse();
            }
            assert_eq!(query.run().unwrap().len(), expected, "{} reverse={}", prefix, reverse);
            assert_eq!(query.count().unwrap(), expected, "{} reverse={}", prefix, reverse);
        }
    }
}

#[test]
fn starts_with_blank_fails_every_execution() {
    let ts = TestStore::cache();
    save_customers(&ts, &["jon"]);

    let query = ts.find::<Order>().starts_with("customer", "").reverse();
    let expected = Some(&QueryError::BlankStartsWith);
    assert_eq!(query.run().unwrap_err().query(), expected);
    assert_eq!(query.count().unwrap_err().query(), expected);
    assert_eq!(query.ids().unwrap_err().query(), expected);
}

#[test]
fn starts_with_orders_by_value() {
    let ts = TestStore::cache();
    save_customers(&ts, &["jonathan", "job", "jo", "pablo"]);

    let found = ts.find::<Order>().starts_with("customer", "jo").run().unwrap();
    assert_eq!(customers(&found), vec!["jo", "job", "jonathan"]);

    let found = ts.find::<Order>().starts_with("customer", "jo").reverse().run().unwrap();
    assert_eq!(customers(&found), vec!["jonathan", "job", "jo"]);
}

#[test]
fn starts_with_on_numeric_index_is_invalid() {
    let ts = ten_orders();
    let err = ts.find::<Order>().starts_with("department", "1").count().unwrap_err();
    assert!(matches!(err.query(), Some(QueryError::InvalidParam { .. })));
}

// ============================================================================
// Match
// ============================================================================

#[test]
fn match_strings_ignore_case() {
    let ts = TestStore::cache();
    save_customers(&ts, &["Jon", "jon", "jonathan", "JO"]);

    assert_eq!(ts.find::<Order>().matching("Customer", "JON").count().unwrap(), 2);
    assert_eq!(ts.find::<Order>().matching("customer", "jo").count().unwrap(), 1);
}

#[test]
fn match_numbers_coerce_to_index_kind() {
    let ts = ten_orders();

    assert_eq!(ts.find::<Order>().matching("department", 4).count().unwrap(), 1);
    assert_eq!(ts.find::<Order>().matching("department", 4u8).count().unwrap(), 1);
    // Integer parameter on a float index
    assert_eq!(ts.find::<Order>().matching("total", 3).count().unwrap(), 1);
    assert_eq!(ts.find::<Order>().matching("total", 3.0).count().unwrap(), 1);
    assert_eq!(ts.find::<Order>().matching("total", 3.1).count().unwrap(), 0);
}

#[test]
fn match_rejects_unconvertible_param() {
    let ts = ten_orders();
    let err = ts.find::<Order>().matching("department", "four").run().unwrap_err();
    assert!(matches!(err.query(), Some(QueryError::InvalidParam { .. })));

    let err = ts.find::<Order>().matching("department", 1.5).run().unwrap_err();
    assert!(matches!(err.query(), Some(QueryError::InvalidParam { .. })));
}

#[test]
fn match_null_is_sticky_error() {
    let ts = ten_orders();
    let query = ts.find::<Order>().matching("customer", FieldValue::Null).limit(3);
    assert_eq!(query.error(), Some(&QueryError::NilMatchParam));
    assert!(query.run().is_err());
}

#[test]
fn match_results_are_in_creation_order() {
    let ts = ten_orders();
    let found = ts.find::<Order>().matching("customer", "c1").run().unwrap();
    assert_eq!(departments(&found), vec![1, 4, 7]);

    let found = ts.find::<Order>().matching("customer", "c1").reverse().run().unwrap();
    assert_eq!(departments(&found), vec![7, 4, 1]);
}

#[test]
fn match_bool_and_unsigned() {
    let ts = TestStore::cache();
    let mut orders = vec![Order::new("a", 1, 1.0), Order::new("b", 2, 2.0), Order::new("c", 3, 3.0)];
    orders[0].shipped = true;
    orders[2].shipped = true;
    orders[1].quantity = u64::MAX;
    ts.save(&mut orders).unwrap();

    assert_eq!(ts.find::<Order>().matching("shipped", true).count().unwrap(), 2);
    assert_eq!(ts.find::<Order>().matching("shipped", false).count().unwrap(), 1);
    assert_eq!(ts.find::<Order>().matching("quantity", u64::MAX).count().unwrap(), 1);
}

#[test]
fn match_time_index_at_millisecond_resolution() {
    let ts = TestStore::cache();
    let due = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut orders = vec![Order::new("a", 1, 1.0), Order::new("b", 2, 2.0), Order::new("c", 3, 3.0)];
    orders[0].due = Some(due);
    orders[1].due = Some(due + Duration::days(1));
    ts.save(&mut orders).unwrap();

    assert_eq!(ts.find::<Order>().matching("due", due).count().unwrap(), 1);

    let found = ts
        .find::<Order>()
        .range("due", due, FieldValue::Null)
        .run()
        .unwrap();
    assert_eq!(customers(&found), vec!["a", "b"]);
}

#[test]
fn negative_zero_total_is_zero() {
    let ts = TestStore::cache();
    let mut orders = vec![Order::new("neg", 1, -0.0), Order::new("pos", 2, 0.0)];
    ts.save(&mut orders).unwrap();

    assert_eq!(ts.find::<Order>().matching("total", 0.0).count().unwrap(), 2);
    assert_eq!(ts.find::<Order>().matching("total", -0.0).count().unwrap(), 2);
    assert_eq!(ts.find::<Order>().range("total", 0.0, 1.0).count().unwrap(), 2);
    assert_eq!(ts.find::<Order>().range("total", -1.0, -0.0).count().unwrap(), 2);
}

#[test]
fn due_outside_identifier_range_is_refused() {
    let ts = TestStore::cache();
    let y1950 = Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap();
    let y1960 = Utc.with_ymd_and_hms(1960, 6, 1, 0, 0, 0).unwrap();

    let mut kept = Order::new("kept", 1, 1.0);
    kept.due = Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    ts.save_one(&mut kept).unwrap();

    for due in [y1950, y1960] {
        let mut order = Order::new("old", 2, 2.0);
        order.due = Some(due);
        assert!(matches!(ts.save_one(&mut order), Err(Error::Schema(_))));
    }
    assert_eq!(ts.find::<Order>().count().unwrap(), 1);

    let err = ts.find::<Order>().matching("due", y1950).count().unwrap_err();
    assert!(matches!(err.query(), Some(QueryError::InvalidParam { .. })));
    let err = ts
        .find::<Order>()
        .range("due", y1960, FieldValue::Null)
        .count()
        .unwrap_err();
    assert!(matches!(err.query(), Some(QueryError::InvalidParam { .. })));
}

// ============================================================================
// Range
// ============================================================================

#[test]
fn range_is_inclusive() {
    let ts = ten_orders();

    let found = ts.find::<Order>().range("department", 3, 6).run().unwrap();
    assert_eq!(departments(&found), vec![3, 4, 5, 6]);

    let found = ts.find::<Order>().range("total", 3.0, 6.0).run().unwrap();
    assert_eq!(departments(&found), vec![2, 3, 4]);
}

#[test]
fn range_open_ends() {
    let ts = ten_orders();

    let found = ts.find::<Order>().range("department", 7, FieldValue::Null).run().unwrap();
    assert_eq!(departments(&found), vec![7, 8, 9]);

    let found = ts.find::<Order>().range("department", FieldValue::Null, 1).run().unwrap();
    assert_eq!(departments(&found), vec![0, 1]);

    let query = ts.find::<Order>().range("department", FieldValue::Null, FieldValue::Null);
    assert_eq!(query.count().unwrap_err().query(), Some(&QueryError::NilRangeParams));
}

#[test]
fn range_reverse_limit_offset() {
    let ts = ten_orders();

    let found = ts
        .find::<Order>()
        .range("department", 2, 8)
        .reverse()
        .offset(1)
        .limit(3)
        .run()
        .unwrap();
    assert_eq!(departments(&found), vec![7, 6, 5]);
}

#[test]
fn range_orders_negative_numbers_first() {
    let ts = TestStore::cache();
    let mut orders: Vec<Order> = [100.0, -5.5, 2.25, -1.0, 0.0]
        .into_iter()
        .enumerate()
        .map(|(i, total)| Order::new("x", -(i as i64) * 10, total))
        .collect();
    ts.save(&mut orders).unwrap();

    let totals: Vec<f64> = ts
        .find::<Order>()
        .range("total", -10.0, 10.0)
        .run()
        .unwrap()
        .iter()
        .map(|o| o.total)
        .collect();
    assert_eq!(totals, vec![-5.5, -1.0, 0.0, 2.25]);

    let found = ts.find::<Order>().order_by("department").run().unwrap();
    assert_eq!(departments(&found), vec![-40, -30, -20, -10, 0]);
}

#[test]
fn range_over_strings() {
    let ts = TestStore::cache();
    save_customers(&ts, &["alice", "bob", "carol", "dave", "erin"]);

    let found = ts.find::<Order>().range("customer", "b", "d").run().unwrap();
    assert_eq!(customers(&found), vec!["bob", "carol"]);

    let found = ts.find::<Order>().range("customer", "Bob", "DAVE").run().unwrap();
    assert_eq!(customers(&found), vec!["bob", "carol", "dave"]);
}

#[test]
fn range_respects_date_bounds() {
    let ts = TestStore::cache();
    let mut old = Order::created_at(Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap());
    old.department = 5;
    let mut recent = Order::new("x", 5, 0.0);
    ts.save_one(&mut old).unwrap();
    ts.save_one(&mut recent).unwrap();

    let since_2020 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let ids = ts
        .find::<Order>()
        .matching("department", 5)
        .from(since_2020)
        .ids()
        .unwrap();
    assert_eq!(ids, vec![recent.id]);

    let ids = ts
        .find::<Order>()
        .range("department", 0, 10)
        .to(since_2020)
        .ids()
        .unwrap();
    assert_eq!(ids, vec![old.id]);
}

// ============================================================================
// Order-by, lists and words
// ============================================================================

#[test]
fn order_by_walks_whole_index() {
    let ts = TestStore::cache();
    save_customers(&ts, &["carol", "alice", "bob"]);

    let found = ts.find::<Order>().order_by("customer").run().unwrap();
    assert_eq!(customers(&found), vec!["alice", "bob", "carol"]);

    let found = ts.find::<Order>().order_by("customer").reverse().first().run().unwrap();
    assert_eq!(customers(&found), vec!["carol"]);
}

#[test]
fn list_field_reports_each_record_once() {
    let ts = TestStore::cache();
    let mut orders = vec![Order::new("a", 1, 1.0), Order::new("b", 2, 2.0), Order::new("c", 3, 3.0)];
    orders[0].tags = vec!["red".into(), "blue".into(), "green".into()];
    orders[1].tags = vec!["Blue".into()];
    ts.save(&mut orders).unwrap();

    assert_eq!(ts.find::<Order>().matching("tags", "blue").count().unwrap(), 2);
    assert_eq!(ts.find::<Order>().order_by("tags").count().unwrap(), 2);

    let found = ts.find::<Order>().order_by("tags").run().unwrap();
    // "a" first appears under "blue", ahead of "b"'s own "blue" entry
    assert_eq!(customers(&found), vec!["a", "b"]);
    assert_eq!(ts.find::<Order>().order_by("tags").offset(1).ids().unwrap(), vec![orders[1].id]);
}

#[test]
fn split_field_matches_single_words() {
    let ts = TestStore::cache();
    let mut order = Order::new("a", 1, 1.0);
    order.notes = "Leave at the Back door".into();
    ts.save_one(&mut order).unwrap();

    assert_eq!(ts.find::<Order>().matching("notes", "back").count().unwrap(), 1);
    assert_eq!(ts.find::<Order>().matching("notes", "back door").count().unwrap(), 0);
    assert_eq!(ts.find::<Order>().starts_with("notes", "do").count().unwrap(), 1);
}

#[test]
fn unknown_index_fails_at_execution() {
    let ts = ten_orders();
    let query = ts.find::<Order>().order_by("nope");
    assert!(query.error().is_none());
    assert_eq!(
        query.run().unwrap_err().query(),
        Some(&QueryError::UnknownIndex("nope".into()))
    );
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn context_reaches_after_get() {
    let ts = ten_orders();
    let found = ts
        .find::<Order>()
        .matching("customer", "c0")
        .set_context("session", "abc")
        .run()
        .unwrap();
    assert_eq!(found.len(), 4);
    assert!(found.iter().all(|o| o.retrieved && o.session.as_deref() == Some("abc")));

    let plain = ts.find::<Order>().first().run().unwrap();
    assert_eq!(plain[0].session, None);
}

// ============================================================================
// Quick sum
// ============================================================================

#[test]
fn quick_sum_over_index_values() {
    let ts = ten_orders();

    let low: i64 = ts.find::<Order>().range("department", 0, 3).quick_sum().unwrap();
    assert_eq!(low, 6);

    let total: f64 = ts.find::<Order>().range("total", 0, 3).quick_sum().unwrap();
    assert_eq!(total, 4.5);

    let departments: i64 = ts.find::<Order>().order_by("department").quick_sum().unwrap();
    assert_eq!(departments, 45);

    let top_two: u64 = ts
        .find::<Order>()
        .order_by("department")
        .reverse()
        .limit(2)
        .quick_sum()
        .unwrap();
    assert_eq!(top_two, 17);
}

#[test]
fn quick_sum_needs_numeric_index_query() {
    let ts = ten_orders();

    let err = ts.find::<Order>().quick_sum::<f64>().unwrap_err();
    assert_eq!(err.query(), Some(&QueryError::QuickSumRequiresIndex));

    let err = ts.find::<Order>().matching("customer", "c1").quick_sum::<f64>().unwrap_err();
    assert_eq!(
        err.query(),
        Some(&QueryError::NotSummable {
            index: "customer".into()
        })
    );
}
