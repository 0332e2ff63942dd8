//! Storage contract the engine requires from a persistence layer.
//!
//! # Design
//!
//! The [`InventoryStore`] trait is deliberately minimal and focused. It
//! provides exactly what the engine needs to keep its invariants:
//!
//! - Pool lifecycle and lookup by [`PoolKey`]
//! - Durable recording of a pool's committed count (`persist_pool` must
//!   succeed before a reserve or release is reported successful)
//! - Booking CRUD, with duplicate confirmation codes rejected at insert
//!
//! The store does NOT perform capacity checks - that is the ledger's job,
//! and splitting the check from the write is exactly the race this engine
//! exists to close. A database-backed implementation would typically map
//! `persist_pool` onto a row update inside the same transaction as the
//! booking write.
//!
//! # Implementations
//!
//! - `InMemoryInventoryStore` (in `boxoffice-testing`): reference
//!   implementation used by the integration tests and the demo binary.

use crate::booking::BookingRecord;
use crate::error::StoreError;
use crate::pool::TicketPool;
use crate::types::{BookingId, PoolKey};
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence operations the engine consumes.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine shares one store across
/// concurrent request handlers.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Registers a new pool and returns the shared handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if a pool already exists under the
    /// same key, or [`StoreError::Unavailable`] on storage faults.
    async fn insert_pool(&self, pool: TicketPool) -> Result<Arc<TicketPool>, StoreError>;

    /// Looks up the pool for a key, `None` if no such pool exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on storage faults.
    async fn load_pool(&self, key: PoolKey) -> Result<Option<Arc<TicketPool>>, StoreError>;

    /// Durably records the pool's current committed count.
    ///
    /// The engine calls this after every ledger step and treats failure as
    /// "the operation never happened", rolling the in-memory counter back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the count could not be
    /// recorded durably.
    async fn persist_pool(&self, pool: &TicketPool) -> Result<(), StoreError>;

    /// Removes a pool. The engine only calls this once the pool's committed
    /// count is zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on storage faults.
    async fn remove_pool(&self, key: PoolKey) -> Result<(), StoreError>;

    /// Looks up a booking by id, `None` if no such booking exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on storage faults.
    async fn load_booking(&self, id: BookingId) -> Result<Option<BookingRecord>, StoreError>;

    /// Inserts a new booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateCode`] when another stored booking
    /// already carries the same confirmation code (the engine retries with a
    /// fresh code), [`StoreError::Conflict`] on id collisions, or
    /// [`StoreError::Unavailable`] on storage faults.
    async fn insert_booking(&self, record: &BookingRecord) -> Result<(), StoreError>;

    /// Overwrites an existing booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on storage faults.
    async fn update_booking(&self, record: &BookingRecord) -> Result<(), StoreError>;

    /// Deletes a booking. Deleting a missing booking is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on storage faults.
    async fn delete_booking(&self, id: BookingId) -> Result<(), StoreError>;
}
