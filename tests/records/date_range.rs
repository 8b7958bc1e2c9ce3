//! Creation-time range queries over the primary keys

use crate::common::*;
use chrono::Datelike;

fn ymd(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 1, 1, 1, 0, 0).unwrap()
}

/// Thirteen orders: now, one per day over the last week, and 2009..=2013.
fn seeded() -> (TestStore, DateTime<Utc>) {
    let ts = TestStore::cache();
    let now = Utc::now();

    let mut dates = vec![now];
    dates.extend((1..=7).map(|d| now - Duration::days(d)));
    dates.extend((2009..=2013).map(ymd));

    let mut orders: Vec<Order> = dates.into_iter().map(Order::created_at).collect();
    ts.save(&mut orders).unwrap();

    // Another type in the same store must not leak into order scans
    let mut note = Note {
        customer: "001".into(),
        total: 999.99,
        ..Default::default()
    };
    ts.save_one(&mut note).unwrap();

    // Let "now" move past the newest identifier
    std::thread::sleep(std::time::Duration::from_millis(5));
    (ts, now)
}

struct Case {
    name: &'static str,
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
    limit: usize,
    offset: usize,
    expected: usize,
}

#[test]
fn date_range_cases() {
    let (ts, _) = seeded();
    assert_eq!(ts.find::<Order>().run().unwrap().len(), 13);

    let beginning = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap();
    let now = Utc::now();
    let hour_ago = now - Duration::hours(1);

    let cases = [
        Case { name: "from now", from: now, to: None, limit: 0, offset: 0, expected: 0 },
        Case { name: "from the beginning", from: beginning, to: None, limit: 0, offset: 0, expected: 13 },
        Case { name: "offset 1", from: beginning, to: None, limit: 0, offset: 1, expected: 12 },
        Case { name: "offset 2", from: beginning, to: None, limit: 0, offset: 2, expected: 11 },
        Case { name: "from 2014", from: ymd(2014), to: None, limit: 0, offset: 0, expected: 8 },
        Case { name: "from an hour ago", from: hour_ago, to: None, limit: 0, offset: 0, expected: 1 },
        Case { name: "to now", from: beginning, to: Some(now), limit: 0, offset: 0, expected: 13 },
        Case { name: "to 2014", from: beginning, to: Some(ymd(2014)), limit: 0, offset: 0, expected: 5 },
        Case { name: "to an hour ago", from: beginning, to: Some(hour_ago), limit: 0, offset: 0, expected: 12 },
        Case { name: "limit 1", from: beginning, to: None, limit: 1, offset: 0, expected: 1 },
        Case { name: "limit 10", from: beginning, to: None, limit: 10, offset: 0, expected: 10 },
        Case { name: "limit 10 offset 2", from: beginning, to: None, limit: 10, offset: 2, expected: 10 },
        Case { name: "limit above total", from: beginning, to: None, limit: 100, offset: 0, expected: 13 },
    ];

    for case in cases {
        let mut query = ts.find::<Order>().from(case.from).limit(case.limit).offset(case.offset);
        if let Some(to) = case.to {
            query = query.to(to);
        }

        let forward = query.run().unwrap();
        assert_eq!(forward.len(), case.expected, "{} (run)", case.name);
        assert_eq!(query.count().unwrap(), case.expected, "{} (count)", case.name);

        let reversed = query.clone().reverse();
        assert_eq!(reversed.run().unwrap().len(), case.expected, "{} (reverse run)", case.name);
        assert_eq!(reversed.count().unwrap(), case.expected, "{} (reverse count)", case.name);
    }
}

#[test]
fn results_are_ordered_by_creation_time() {
    let (ts, _) = seeded();

    let forward = ts.find::<Order>().run().unwrap();
    assert!(forward.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(forward[0].id.time().year(), 2009);

    let backward = ts.find::<Order>().reverse().run().unwrap();
    let mut expected = forward.clone();
    expected.reverse();
    assert_eq!(
        backward.iter().map(|o| o.id).collect::<Vec<_>>(),
        expected.iter().map(|o| o.id).collect::<Vec<_>>()
    );
}

#[test]
fn offset_skips_from_the_iteration_start() {
    let (ts, _) = seeded();
    let all = ts.find::<Order>().ids().unwrap();

    assert_eq!(ts.find::<Order>().offset(2).limit(3).ids().unwrap(), all[2..5].to_vec());

    let newest_first = ts.find::<Order>().reverse().offset(1).first().ids().unwrap();
    assert_eq!(newest_first, vec![all[11]]);
}

#[test]
fn manual_bounds_are_inclusive() {
    let (ts, _) = seeded();
    let all = ts.find::<Order>().ids().unwrap();

    let ids = ts.find::<Order>().manual_from_to(all[3], all[5]).ids().unwrap();
    assert_eq!(ids, all[3..=5].to_vec());
}

#[test]
fn run_first_returns_oldest_or_newest() {
    let (ts, now) = seeded();

    let oldest = ts.first::<Order>().run_first().unwrap().unwrap();
    assert_eq!(oldest.id.time().year(), 2009);
    assert!(oldest.retrieved);

    let newest = ts.find::<Order>().reverse().run_first().unwrap().unwrap();
    assert!(newest.id.timestamp_ms() <= now.timestamp_millis() as u64);
    assert!(newest.id.time() > now - Duration::seconds(1));
}

#[test]
fn empty_store_returns_nothing() {
    let ts = TestStore::cache();
    assert!(ts.find::<Order>().run().unwrap().is_empty());
    assert_eq!(ts.find::<Order>().reverse().count().unwrap(), 0);
    assert_eq!(ts.first::<Order>().run_first().unwrap(), None);
}
