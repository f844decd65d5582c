//! Lifecycle walk-throughs for the order tracker across several cycles.

use chrono::{Duration, Utc};
use core_types::{OrderSide, PendingOrder};
use executor::OrderTracker;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

fn buy(symbol: &str, id: &str, locked: Decimal, age_secs: i64) -> PendingOrder {
    PendingOrder {
        order_id: id.into(),
        symbol: symbol.into(),
        side: OrderSide::Buy,
        quantity: 5,
        locked_amount: locked,
        submitted_at: Utc::now() - Duration::seconds(age_secs),
        exchange: None,
    }
}

fn open(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn a_lock_is_released_exactly_once_over_its_lifetime() {
    let mut tracker = OrderTracker::new(60);
    tracker.record(buy("AAA", "1", dec!(100000), 0)).unwrap();
    assert_eq!(tracker.locked_total(), dec!(100000));

    // Cycle 1: still on the book, young. Nothing moves.
    let r = tracker.resolve(&open(&["1"]), Utc::now());
    assert!(r.filled.is_empty() && r.timed_out.is_empty());
    assert_eq!(tracker.locked_total(), dec!(100000));

    // Cycle 2: gone from the book. Filled, lock released.
    let r = tracker.resolve(&open(&[]), Utc::now());
    assert_eq!(r.filled.len(), 1);
    assert_eq!(tracker.locked_total(), Decimal::ZERO);

    // Cycle 3: resolving again finds nothing to release.
    let r = tracker.resolve(&open(&[]), Utc::now());
    assert!(r.filled.is_empty() && r.timed_out.is_empty());
}

#[test]
fn a_timed_out_order_is_reported_exactly_once() {
    let mut tracker = OrderTracker::new(60);
    tracker.record(buy("AAA", "1", dec!(100000), 120)).unwrap();

    let r = tracker.resolve(&open(&["1"]), Utc::now());
    assert_eq!(r.timed_out.len(), 1);
    assert_eq!(tracker.locked_total(), Decimal::ZERO);

    // Even if the broker keeps listing the order (cancel failed), the
    // tracker has let go and never reports it again.
    let r = tracker.resolve(&open(&["1"]), Utc::now());
    assert!(r.timed_out.is_empty());
}

#[test]
fn mixed_outcomes_resolve_independently() {
    let mut tracker = OrderTracker::new(60);
    tracker.record(buy("AAA", "1", dec!(100000), 120)).unwrap();
    tracker.record(buy("BBB", "2", dec!(50000), 10)).unwrap();
    tracker.record(buy("CCC", "3", dec!(25000), 10)).unwrap();

    // 1 still open and stale, 2 still open and fresh, 3 off the book.
    let r = tracker.resolve(&open(&["1", "2"]), Utc::now());

    assert_eq!(r.timed_out.len(), 1);
    assert_eq!(r.timed_out[0].symbol, "AAA");
    assert_eq!(r.filled.len(), 1);
    assert_eq!(r.filled[0].symbol, "CCC");
    assert!(tracker.has_pending("BBB"));
    assert_eq!(tracker.locked_total(), dec!(50000));
}

#[test]
fn overbuy_cancel_and_resolution_cannot_double_release() {
    let mut tracker = OrderTracker::new(60);
    tracker.record(buy("AAA", "1", dec!(100000), 0)).unwrap();

    // The overbuy guard pulls the order for an explicit cancel.
    let taken = tracker.take("AAA").unwrap();
    assert_eq!(taken.locked_amount, dec!(100000));

    // A later resolve pass sees nothing, so the lock cannot be counted twice.
    let r = tracker.resolve(&open(&[]), Utc::now());
    assert!(r.filled.is_empty() && r.timed_out.is_empty());
    assert_eq!(tracker.locked_total(), Decimal::ZERO);
}

#[test]
fn symbol_is_free_for_a_new_order_after_resolution() {
    let mut tracker = OrderTracker::new(60);
    tracker.record(buy("AAA", "1", dec!(100000), 0)).unwrap();
    tracker.resolve(&open(&[]), Utc::now());

    // Filled and released: a fresh order for the same symbol is accepted.
    tracker.record(buy("AAA", "2", dec!(40000), 0)).unwrap();
    assert_eq!(tracker.locked_buy("AAA"), dec!(40000));
}
