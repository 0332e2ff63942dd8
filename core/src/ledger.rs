//! The reservation ledger: atomic capacity operations on a pool.
//!
//! Every change to a pool's `committed` count goes through here. Each
//! operation is a single compare-and-exchange step on the pool's counter, so
//! concurrent calls on the same pool resolve to a total order and a naive
//! read-check-write race cannot oversell. Operations on different pools
//! share no state and never block each other.
//!
//! The ledger holds no lock while an operation runs and never touches
//! storage; durability is the engine's job, with an explicit compensating
//! release/reserve when persistence fails after the in-memory step.

use crate::error::BookingError;
use crate::metrics;
use crate::pool::TicketPool;

/// Atomic reserve/release/adjust operations against a [`TicketPool`].
///
/// The ledger is stateless; it exists so that every `committed` mutation in
/// the crate funnels through one audited surface. No FIFO fairness is
/// guaranteed between racing calls: the first to complete the atomic step
/// wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ledger;

impl Ledger {
    /// Creates a ledger
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Atomically checks `available() >= quantity` and commits the tickets.
    ///
    /// On rejection nothing changes and the observed availability is reported
    /// back to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InsufficientCapacity`] when the pool cannot
    /// satisfy the request at the atomic step.
    pub fn reserve(self, pool: &TicketPool, quantity: u32) -> Result<(), BookingError> {
        debug_assert!(quantity > 0, "reserve precondition: quantity > 0");

        match pool.try_commit(quantity) {
            Ok(committed) => {
                tracing::debug!(
                    pool = %pool.key(),
                    quantity,
                    committed,
                    "reserved capacity"
                );
                metrics::record_reservation_committed(quantity);
                Ok(())
            }
            Err(available) => {
                tracing::debug!(
                    pool = %pool.key(),
                    requested = quantity,
                    available,
                    "reservation rejected"
                );
                metrics::record_reservation_rejected();
                Err(BookingError::InsufficientCapacity {
                    key: pool.key(),
                    requested: quantity,
                    available,
                })
            }
        }
    }

    /// Returns `quantity` tickets to the pool, flooring `committed` at zero.
    ///
    /// Releasing more than is committed is a caller bug (e.g. a double
    /// release for one booking); the ledger floors rather than underflows and
    /// logs the discrepancy.
    pub fn release(self, pool: &TicketPool, quantity: u32) {
        let previous = pool.release_commit(quantity);
        let after = previous.saturating_sub(quantity);
        if quantity > previous {
            tracing::warn!(
                pool = %pool.key(),
                quantity,
                committed = after,
                "release floored at zero"
            );
        } else {
            tracing::debug!(
                pool = %pool.key(),
                quantity,
                committed = after,
                "released capacity"
            );
        }
        metrics::record_release(quantity);
    }

    /// Applies a signed capacity change as one atomic step.
    ///
    /// Positive deltas behave as [`reserve`](Self::reserve) and fail cleanly
    /// with no partial effect; negative deltas behave as
    /// [`release`](Self::release) and always succeed; zero is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InsufficientCapacity`] when a positive delta
    /// cannot be satisfied.
    pub fn adjust(self, pool: &TicketPool, delta: i64) -> Result<(), BookingError> {
        match delta {
            0 => Ok(()),
            d if d > 0 => {
                let quantity = u32::try_from(d).unwrap_or(u32::MAX);
                self.reserve(pool, quantity)
            }
            d => {
                let quantity = u32::try_from(d.unsigned_abs()).unwrap_or(u32::MAX);
                self.release(pool, quantity);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{Capacity, EventId, Money, PoolKey, TicketTypeId};

    fn pool(capacity: u32) -> TicketPool {
        TicketPool::new(
            PoolKey::new(EventId::new(), TicketTypeId::new()),
            Capacity::new(capacity),
            Money::from_cents(1_000),
        )
    }

    #[test]
    fn reserve_rejects_without_side_effect() {
        let p = pool(10);
        let ledger = Ledger::new();

        ledger.reserve(&p, 6).expect("6 of 10 fits");
        let err = ledger.reserve(&p, 6).expect_err("only 4 left");
        assert!(matches!(
            err,
            BookingError::InsufficientCapacity {
                requested: 6,
                available: 4,
                ..
            }
        ));
        assert_eq!(p.committed(), 6);
    }

    #[test]
    fn adjust_signs_map_to_reserve_and_release() {
        let p = pool(10);
        let ledger = Ledger::new();

        ledger.reserve(&p, 3).expect("initial reserve");
        ledger.adjust(&p, 5).expect("3 -> 8 fits");
        assert_eq!(p.committed(), 8);

        ledger.adjust(&p, 9).expect_err("only 2 available");
        assert_eq!(p.committed(), 8, "failed increase leaves pool untouched");

        ledger.adjust(&p, -5).expect("decrease always succeeds");
        assert_eq!(p.committed(), 3);

        ledger.adjust(&p, 0).expect("zero delta is a no-op");
        assert_eq!(p.committed(), 3);
    }

    #[test]
    fn threads_never_oversell() {
        use std::sync::Arc;

        let p = Arc::new(pool(50));
        let ledger = Ledger::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let p = Arc::clone(&p);
                std::thread::spawn(move || {
                    let mut won = 0_u32;
                    for _ in 0..10 {
                        if ledger.reserve(&p, 1).is_ok() {
                            won += 1;
                        }
                    }
                    won
                })
            })
            .collect();

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50, "exactly capacity wins across all threads");
        assert_eq!(p.committed(), 50);
    }
}
