//! Concurrency stress tests for last-ticket scenarios.
//!
//! These tests verify that under heavy concurrent load, the engine correctly
//! handles race conditions and never oversells a pool.
//!
//! Run with: `cargo test --test concurrency_stress_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use boxoffice_core::booking::BookingStatus;
use boxoffice_core::error::BookingError;
use boxoffice_testing::EngineTest;
use futures::future::join_all;
use std::sync::Arc;

/// Test: 100 concurrent booking attempts for 1 ticket.
///
/// Verifies that:
/// - Exactly 1 booking succeeds
/// - Exactly 99 bookings fail with `InsufficientCapacity`
/// - The pool ends committed at exactly its capacity
#[tokio::test]
async fn test_last_ticket_concurrency_100_requests() {
    let t = Arc::new(EngineTest::new());
    let key = t.given_pool(1, 2_500).await;

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let t = Arc::clone(&t);
            tokio::spawn(async move {
                t.engine()
                    .create_booking(key, 1, EngineTest::buyer())
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(successes, 1, "exactly one winner for the last ticket");
    assert_eq!(failures.len(), 99);
    assert!(
        failures
            .iter()
            .all(|e| matches!(e, BookingError::InsufficientCapacity { .. })),
        "every loser sees a capacity rejection, not a fault"
    );

    t.assert_committed(key, 1).await;
    assert_eq!(t.store().booking_count(), 1);
}

/// Test: two concurrent 6-ticket requests against a 10-ticket pool.
///
/// The requests overlap (6 + 6 > 10), so exactly one can win; the loser must
/// observe a clean `InsufficientCapacity` and the pool must settle at 6.
#[tokio::test]
async fn test_overlapping_requests_have_one_winner() {
    let t = Arc::new(EngineTest::new());
    let key = t.given_pool(10, 2_500).await;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let t = Arc::clone(&t);
            tokio::spawn(async move {
                t.engine()
                    .create_booking(key, 6, EngineTest::buyer())
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "6 + 6 cannot both fit in 10");

    let rejection = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one request must lose");
    assert!(matches!(
        rejection,
        BookingError::InsufficientCapacity {
            requested: 6,
            available: 4,
            ..
        }
    ));

    t.assert_committed(key, 6).await;
}

/// Test: 50 concurrent single-ticket requests for 3 tickets.
///
/// Exactly 3 must win and the pool must end fully committed.
#[tokio::test]
async fn test_three_tickets_fifty_concurrent_requests() {
    let t = Arc::new(EngineTest::new());
    let key = t.given_pool(3, 1_500).await;

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let t = Arc::clone(&t);
            tokio::spawn(async move {
                t.engine()
                    .create_booking(key, 1, EngineTest::buyer())
                    .await
                    .is_ok()
            })
        })
        .collect();

    let successes = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .filter(|won| *won)
        .count();

    assert_eq!(successes, 3, "exactly capacity many winners");
    t.assert_committed(key, 3).await;
}

/// Test: concurrent create-then-cancel churn conserves capacity.
///
/// 40 tasks each book 2 tickets and immediately cancel. Whatever interleaving
/// happens, every successful reserve is paired with a release, so the pool
/// must end back at zero committed.
#[tokio::test]
async fn test_create_cancel_churn_returns_to_zero() {
    let t = Arc::new(EngineTest::new());
    let key = t.given_pool(20, 2_000).await;

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let t = Arc::clone(&t);
            tokio::spawn(async move {
                let created = t
                    .engine()
                    .create_booking(key, 2, EngineTest::buyer())
                    .await;
                if let Ok(record) = created {
                    t.engine()
                        .set_status(record.id, BookingStatus::Cancelled)
                        .await
                        .expect("cancelling an own pending booking succeeds");
                    true
                } else {
                    false
                }
            })
        })
        .collect();

    let wins = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .filter(|won| *won)
        .count();

    assert!(wins >= 10, "capacity 20 admits at least 10 two-ticket bookings");
    t.assert_committed(key, 0).await;
}

/// Test: operations on distinct pools proceed independently.
///
/// Saturating one pool must not affect its neighbour's accounting.
#[tokio::test]
async fn test_distinct_pools_do_not_interfere() {
    let t = Arc::new(EngineTest::new());
    let busy = t.given_pool(5, 2_500).await;
    let quiet = t.given_pool(50, 2_500).await;

    let handles: Vec<_> = (0..30)
        .map(|i| {
            let t = Arc::clone(&t);
            let key = if i % 2 == 0 { busy } else { quiet };
            tokio::spawn(async move {
                t.engine()
                    .create_booking(key, 1, EngineTest::buyer())
                    .await
                    .is_ok()
            })
        })
        .collect();

    join_all(handles).await;

    t.assert_committed(busy, 5).await;
    t.assert_committed(quiet, 15).await;
}
