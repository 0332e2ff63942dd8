//! Capacity accounting for one (event, ticket type) pair.
//!
//! A [`TicketPool`] owns two numbers: an immutable `capacity` and the
//! `committed` count of tickets held by non-cancelled bookings. The invariant
//! `0 <= committed <= capacity` holds at every observable instant; `committed`
//! is only ever changed through the ledger, which performs the capacity check
//! and the update as one compare-and-exchange step.

use crate::types::{Capacity, Money, PoolKey};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Capacity pool for one (event, ticket type) pair.
///
/// The public surface is read-only; mutation of `committed` is reserved to
/// the [`Ledger`](crate::ledger::Ledger). The unit price is the only field a
/// pool owner may change after creation, and repricing never affects
/// existing bookings (they keep their snapshot).
#[derive(Debug)]
pub struct TicketPool {
    key: PoolKey,
    capacity: Capacity,
    committed: AtomicU32,
    /// Current asking price, in cents
    unit_price: AtomicU64,
}

impl TicketPool {
    /// Creates a pool with nothing committed
    #[must_use]
    pub const fn new(key: PoolKey, capacity: Capacity, unit_price: Money) -> Self {
        Self {
            key,
            capacity,
            committed: AtomicU32::new(0),
            unit_price: AtomicU64::new(unit_price.cents()),
        }
    }

    /// Restores a pool at a known committed count (storage rehydration).
    ///
    /// # Panics
    ///
    /// Panics if `committed > capacity`, which would mean the stored state
    /// already violates the pool invariant.
    #[must_use]
    pub fn restore(key: PoolKey, capacity: Capacity, unit_price: Money, committed: u32) -> Self {
        assert!(
            committed <= capacity.value(),
            "pool {key} restored with committed {committed} > capacity {capacity}"
        );
        Self {
            key,
            capacity,
            committed: AtomicU32::new(committed),
            unit_price: AtomicU64::new(unit_price.cents()),
        }
    }

    /// The pool's key
    #[must_use]
    pub const fn key(&self) -> PoolKey {
        self.key
    }

    /// Total sellable capacity
    #[must_use]
    pub const fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Tickets currently held by non-cancelled bookings
    #[must_use]
    pub fn committed(&self) -> u32 {
        self.committed.load(Ordering::SeqCst)
    }

    /// Tickets still available, `capacity - committed`
    #[must_use]
    pub fn available(&self) -> u32 {
        self.capacity.value() - self.committed()
    }

    /// Current asking price for one ticket
    #[must_use]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price.load(Ordering::SeqCst))
    }

    /// Reprices the pool.
    ///
    /// Only affects bookings created after the call; existing bookings keep
    /// the snapshot taken at creation.
    pub fn set_unit_price(&self, unit_price: Money) {
        self.unit_price.store(unit_price.cents(), Ordering::SeqCst);
    }

    /// Read-only snapshot for reporting and serialization
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        let committed = self.committed();
        PoolSnapshot {
            key: self.key,
            capacity: self.capacity,
            committed,
            available: self.capacity.value() - committed,
            unit_price: self.unit_price(),
        }
    }

    /// Atomically checks availability and commits `quantity` tickets.
    ///
    /// Returns the availability observed at the losing step on failure, so
    /// the rejection can be reported with real numbers.
    pub(crate) fn try_commit(&self, quantity: u32) -> Result<u32, u32> {
        let capacity = self.capacity.value();
        self.committed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if capacity - current >= quantity {
                    Some(current + quantity)
                } else {
                    None
                }
            })
            .map(|previous| previous + quantity)
            .map_err(|current| capacity - current)
    }

    /// Atomically returns `quantity` tickets, flooring at zero.
    ///
    /// Returns the committed count observed immediately before the release.
    pub(crate) fn release_commit(&self, quantity: u32) -> u32 {
        let mut current = self.committed.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_sub(quantity);
            match self.committed.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(previous) => return previous,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Serializable point-in-time view of a pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// The pool's key
    pub key: PoolKey,
    /// Total sellable capacity
    pub capacity: Capacity,
    /// Tickets held by non-cancelled bookings
    pub committed: u32,
    /// Tickets still available
    pub available: u32,
    /// Current asking price
    pub unit_price: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventId, TicketTypeId};

    fn pool(capacity: u32) -> TicketPool {
        TicketPool::new(
            PoolKey::new(EventId::new(), TicketTypeId::new()),
            Capacity::new(capacity),
            Money::from_cents(1_000),
        )
    }

    #[test]
    fn commit_is_bounded_by_capacity() {
        let p = pool(10);
        assert_eq!(p.try_commit(6), Ok(6));
        assert_eq!(p.try_commit(6), Err(4));
        assert_eq!(p.committed(), 6);
        assert_eq!(p.available(), 4);
    }

    #[test]
    fn release_floors_at_zero() {
        let p = pool(10);
        assert_eq!(p.try_commit(3), Ok(3));
        assert_eq!(p.release_commit(5), 3, "returns the pre-release count");
        assert_eq!(p.committed(), 0);
    }

    #[test]
    fn repricing_does_not_touch_accounting() {
        let p = pool(10);
        assert_eq!(p.try_commit(4), Ok(4));
        p.set_unit_price(Money::from_cents(9_900));
        assert_eq!(p.committed(), 4);
        assert_eq!(p.unit_price(), Money::from_cents(9_900));
    }

    #[test]
    fn restore_rehydrates_committed_count() {
        let key = PoolKey::new(EventId::new(), TicketTypeId::new());
        let p = TicketPool::restore(key, Capacity::new(10), Money::from_cents(100), 7);
        assert_eq!(p.committed(), 7);
        assert_eq!(p.available(), 3);
        assert_eq!(p.try_commit(4), Err(3));
    }

    #[test]
    #[should_panic(expected = "committed")]
    fn restore_rejects_corrupt_state() {
        let key = PoolKey::new(EventId::new(), TicketTypeId::new());
        let _ = TicketPool::restore(key, Capacity::new(2), Money::from_cents(100), 3);
    }
}
