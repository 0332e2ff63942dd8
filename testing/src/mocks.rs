//! Mock implementations of the engine's environment and storage traits.
//!
//! Everything here is deterministic: fixed time, sequential confirmation
//! codes, and an in-memory store whose fault injection is explicit. The
//! in-memory store doubles as the reference implementation of the
//! [`InventoryStore`] contract for integration tests and demos.

use async_trait::async_trait;
use boxoffice_core::booking::BookingRecord;
use boxoffice_core::environment::{Clock, ConfirmationCodes};
use boxoffice_core::error::StoreError;
use boxoffice_core::pool::TicketPool;
use boxoffice_core::store::InventoryStore;
use boxoffice_core::types::{BookingId, ConfirmationCode, PoolKey};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

// ============================================================================
// Clock
// ============================================================================

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-06-01 12:00:00 UTC)
///
/// # Panics
///
/// This function will panic if the hardcoded timestamp fails to parse,
/// which should never happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

// ============================================================================
// Confirmation codes
// ============================================================================

/// Sequential confirmation codes: `BOX00000001`, `BOX00000002`, ...
///
/// Predictable and collision-free, so tests can assert on codes.
#[derive(Debug, Default)]
pub struct SequentialCodes {
    counter: AtomicU64,
}

impl SequentialCodes {
    /// Creates a source starting at 1
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl ConfirmationCodes for SequentialCodes {
    fn issue(&self) -> ConfirmationCode {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        ConfirmationCode::new(format!("BOX{n:08}"))
    }
}

/// Always issues the same code; used to force duplicate-code handling
#[derive(Debug, Clone)]
pub struct FixedCodes {
    code: ConfirmationCode,
}

impl FixedCodes {
    /// Creates a source stuck on `code`
    #[must_use]
    pub const fn new(code: ConfirmationCode) -> Self {
        Self { code }
    }
}

impl ConfirmationCodes for FixedCodes {
    fn issue(&self) -> ConfirmationCode {
        self.code.clone()
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory reference implementation of [`InventoryStore`].
///
/// Pools are shared handles; `persist_pool` records the committed count into
/// a separate "durable" map so tests can assert what was actually persisted,
/// independently of the live counter.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    pools: RwLock<HashMap<PoolKey, Arc<TicketPool>>>,
    bookings: RwLock<HashMap<BookingId, BookingRecord>>,
    persisted: RwLock<HashMap<PoolKey, u32>>,
}

impl InMemoryInventoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed count last recorded durably for a pool, if any
    #[must_use]
    pub fn persisted_committed(&self, key: PoolKey) -> Option<u32> {
        read(&self.persisted).get(&key).copied()
    }

    /// Number of stored bookings
    #[must_use]
    pub fn booking_count(&self) -> usize {
        read(&self.bookings).len()
    }

    /// All stored bookings, in unspecified order
    #[must_use]
    pub fn bookings(&self) -> Vec<BookingRecord> {
        read(&self.bookings).values().cloned().collect()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn insert_pool(&self, pool: TicketPool) -> Result<Arc<TicketPool>, StoreError> {
        let key = pool.key();
        let mut pools = write(&self.pools);
        if pools.contains_key(&key) {
            return Err(StoreError::Conflict {
                reason: format!("pool already registered: {key}"),
            });
        }
        let pool = Arc::new(pool);
        pools.insert(key, Arc::clone(&pool));
        drop(pools);
        write(&self.persisted).insert(key, pool.committed());
        Ok(pool)
    }

    async fn load_pool(&self, key: PoolKey) -> Result<Option<Arc<TicketPool>>, StoreError> {
        Ok(read(&self.pools).get(&key).cloned())
    }

    async fn persist_pool(&self, pool: &TicketPool) -> Result<(), StoreError> {
        write(&self.persisted).insert(pool.key(), pool.committed());
        Ok(())
    }

    async fn remove_pool(&self, key: PoolKey) -> Result<(), StoreError> {
        write(&self.pools).remove(&key);
        write(&self.persisted).remove(&key);
        Ok(())
    }

    async fn load_booking(&self, id: BookingId) -> Result<Option<BookingRecord>, StoreError> {
        Ok(read(&self.bookings).get(&id).cloned())
    }

    async fn insert_booking(&self, record: &BookingRecord) -> Result<(), StoreError> {
        let mut bookings = write(&self.bookings);
        if bookings.contains_key(&record.id) {
            return Err(StoreError::Conflict {
                reason: format!("booking already stored: {}", record.id),
            });
        }
        if bookings
            .values()
            .any(|existing| existing.confirmation_code == record.confirmation_code)
        {
            return Err(StoreError::DuplicateCode {
                code: record.confirmation_code.as_str().to_string(),
            });
        }
        bookings.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_booking(&self, record: &BookingRecord) -> Result<(), StoreError> {
        let mut bookings = write(&self.bookings);
        if !bookings.contains_key(&record.id) {
            return Err(StoreError::Conflict {
                reason: format!("booking not stored: {}", record.id),
            });
        }
        bookings.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete_booking(&self, id: BookingId) -> Result<(), StoreError> {
        write(&self.bookings).remove(&id);
        Ok(())
    }
}

// ============================================================================
// Fault injection
// ============================================================================

/// Wraps a store and fails a configurable number of upcoming calls per
/// operation, for exercising the engine's rollback paths.
pub struct FlakyStore {
    inner: Arc<dyn InventoryStore>,
    fail_persist_pool: AtomicU32,
    fail_insert_booking: AtomicU32,
    fail_update_booking: AtomicU32,
    fail_delete_booking: AtomicU32,
}

impl FlakyStore {
    /// Wraps `inner` with no faults armed
    #[must_use]
    pub fn new(inner: Arc<dyn InventoryStore>) -> Self {
        Self {
            inner,
            fail_persist_pool: AtomicU32::new(0),
            fail_insert_booking: AtomicU32::new(0),
            fail_update_booking: AtomicU32::new(0),
            fail_delete_booking: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` calls to `persist_pool`
    pub fn fail_persist_pool(&self, n: u32) {
        self.fail_persist_pool.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` calls to `insert_booking`
    pub fn fail_insert_booking(&self, n: u32) {
        self.fail_insert_booking.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` calls to `update_booking`
    pub fn fail_update_booking(&self, n: u32) {
        self.fail_update_booking.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` calls to `delete_booking`
    pub fn fail_delete_booking(&self, n: u32) {
        self.fail_delete_booking.store(n, Ordering::SeqCst);
    }

    fn trip(counter: &AtomicU32, operation: &str) -> Result<(), StoreError> {
        let armed = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            Err(StoreError::Unavailable {
                reason: format!("injected fault: {operation}"),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl InventoryStore for FlakyStore {
    async fn insert_pool(&self, pool: TicketPool) -> Result<Arc<TicketPool>, StoreError> {
        self.inner.insert_pool(pool).await
    }

    async fn load_pool(&self, key: PoolKey) -> Result<Option<Arc<TicketPool>>, StoreError> {
        self.inner.load_pool(key).await
    }

    async fn persist_pool(&self, pool: &TicketPool) -> Result<(), StoreError> {
        Self::trip(&self.fail_persist_pool, "persist_pool")?;
        self.inner.persist_pool(pool).await
    }

    async fn remove_pool(&self, key: PoolKey) -> Result<(), StoreError> {
        self.inner.remove_pool(key).await
    }

    async fn load_booking(&self, id: BookingId) -> Result<Option<BookingRecord>, StoreError> {
        self.inner.load_booking(id).await
    }

    async fn insert_booking(&self, record: &BookingRecord) -> Result<(), StoreError> {
        Self::trip(&self.fail_insert_booking, "insert_booking")?;
        self.inner.insert_booking(record).await
    }

    async fn update_booking(&self, record: &BookingRecord) -> Result<(), StoreError> {
        Self::trip(&self.fail_update_booking, "update_booking")?;
        self.inner.update_booking(record).await
    }

    async fn delete_booking(&self, id: BookingId) -> Result<(), StoreError> {
        Self::trip(&self.fail_delete_booking, "delete_booking")?;
        self.inner.delete_booking(id).await
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use boxoffice_core::booking::{BookingRecord, BookingStatus};
    use boxoffice_core::types::{
        BookingId, Buyer, Capacity, EventId, Money, TicketTypeId,
    };

    #[test]
    fn fixed_clock_always_returns_the_same_time() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn sequential_codes_never_collide() {
        let codes = SequentialCodes::new();
        let a = codes.issue();
        let b = codes.issue();
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "BOX00000001");
    }

    fn record(code: &str) -> BookingRecord {
        BookingRecord {
            id: BookingId::new(),
            event_id: EventId::new(),
            ticket_type_id: TicketTypeId::new(),
            buyer: Buyer::new("Test".to_string(), "test@example.com".to_string()),
            quantity: 1,
            unit_price: Money::from_cents(1_000),
            total_price: Money::from_cents(1_000),
            status: BookingStatus::Pending,
            confirmation_code: ConfirmationCode::new(code.to_string()),
            created_at: test_clock().now(),
        }
    }

    #[test]
    fn insert_rejects_duplicate_codes() {
        tokio_test::block_on(async {
            let store = InMemoryInventoryStore::new();
            store.insert_booking(&record("SAME0001")).await.unwrap();

            let err = store
                .insert_booking(&record("SAME0001"))
                .await
                .expect_err("same code twice");
            assert!(matches!(err, StoreError::DuplicateCode { .. }));
            assert_eq!(store.booking_count(), 1);
        });
    }

    #[test]
    fn persist_records_the_committed_count() {
        tokio_test::block_on(async {
            let store = InMemoryInventoryStore::new();
            let key = PoolKey::new(EventId::new(), TicketTypeId::new());
            let pool = store
                .insert_pool(TicketPool::new(key, Capacity::new(5), Money::from_cents(100)))
                .await
                .unwrap();

            assert_eq!(store.persisted_committed(key), Some(0));
            store.persist_pool(&pool).await.unwrap();
            assert_eq!(store.persisted_committed(key), Some(pool.committed()));
        });
    }
}
