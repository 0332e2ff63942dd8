//! The booking engine: lifecycle transitions paired with ledger effects.
//!
//! Every operation follows the same discipline:
//!
//! 1. Validate the request against the transition table and configuration,
//!    before any side effect.
//! 2. Take the pool's transition gate, so no other transition on the same
//!    pool can interleave between "ledger succeeds" and "record updated".
//!    Pools have independent gates; operations on different pools proceed in
//!    parallel.
//! 3. Apply the ledger step (a single atomic check-and-update), then persist.
//!    A persistence failure rolls the ledger step back and the operation is
//!    reported as if it never happened.
//!
//! Cross-pool moves are the documented exception: they are two independent
//! single-pool steps with explicit compensation, never one atomic unit.

use crate::booking::{BookingRecord, BookingStatus, TransitionEffect};
use crate::config::Config;
use crate::environment::{Clock, ConfirmationCodes, RandomCodes, SystemClock};
use crate::error::{BookingError, StoreError};
use crate::ledger::Ledger;
use crate::metrics;
use crate::pool::{PoolSnapshot, TicketPool};
use crate::pricing;
use crate::store::InventoryStore;
use crate::types::{BookingId, Buyer, Capacity, Money, PoolKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Injected dependencies for the engine
#[derive(Clone)]
pub struct EngineEnvironment {
    /// Clock for booking timestamps
    pub clock: Arc<dyn Clock>,
    /// Source of confirmation codes
    pub codes: Arc<dyn ConfirmationCodes>,
    /// Persistence collaborator
    pub store: Arc<dyn InventoryStore>,
}

impl EngineEnvironment {
    /// Creates a new `EngineEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        codes: Arc<dyn ConfirmationCodes>,
        store: Arc<dyn InventoryStore>,
    ) -> Self {
        Self {
            clock,
            codes,
            store,
        }
    }
}

/// Ticket inventory and booking lifecycle engine.
///
/// Shared across request handlers behind an `Arc`; all operations take
/// `&self`.
pub struct BookingEngine {
    env: EngineEnvironment,
    config: Config,
    ledger: Ledger,
    /// Per-pool transition gates; created lazily, removed with the pool
    gates: Mutex<HashMap<PoolKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl BookingEngine {
    /// Creates an engine with the production environment (system clock,
    /// random confirmation codes) over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn InventoryStore>, config: Config) -> Self {
        let codes = RandomCodes::new(config.code_length);
        Self::with_environment(
            EngineEnvironment::new(Arc::new(SystemClock), Arc::new(codes), store),
            config,
        )
    }

    /// Creates an engine with explicit dependencies (used by tests)
    #[must_use]
    pub fn with_environment(env: EngineEnvironment, config: Config) -> Self {
        Self {
            env,
            config,
            ledger: Ledger::new(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// The engine's configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    // ========================================================================
    // Pool lifecycle
    // ========================================================================

    /// Registers the capacity pool for a newly defined ticket type.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] when the store rejects the pool
    /// (key already registered, or storage fault).
    pub async fn open_pool(
        &self,
        key: PoolKey,
        capacity: Capacity,
        unit_price: Money,
    ) -> Result<Arc<TicketPool>, BookingError> {
        let pool = self
            .env
            .store
            .insert_pool(TicketPool::new(key, capacity, unit_price))
            .await
            .map_err(storage)?;
        tracing::info!(pool = %key, %capacity, %unit_price, "pool opened");
        Ok(pool)
    }

    /// Removes the pool backing a deleted ticket type.
    ///
    /// Only permitted while no non-cancelled booking holds capacity against
    /// it; retiring never cascades cancellations.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::PoolNotFound`], [`BookingError::PoolInUse`]
    /// while bookings still hold capacity, or [`BookingError::Storage`].
    pub async fn retire_pool(&self, key: PoolKey) -> Result<(), BookingError> {
        let pool = self.load_pool(key).await?;
        let gate = self.gate(key);
        let _guard = gate.lock().await;

        let committed = pool.committed();
        if committed != 0 {
            return Err(BookingError::PoolInUse { key, committed });
        }

        self.env.store.remove_pool(key).await.map_err(storage)?;
        self.drop_gate(key);
        tracing::info!(pool = %key, "pool retired");
        Ok(())
    }

    /// Read-only availability snapshot of a pool.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::PoolNotFound`] or [`BookingError::Storage`].
    pub async fn availability(&self, key: PoolKey) -> Result<PoolSnapshot, BookingError> {
        Ok(self.load_pool(key).await?.snapshot())
    }

    // ========================================================================
    // Booking lifecycle
    // ========================================================================

    /// Creates a booking: atomically reserves capacity, snapshots the unit
    /// price, and stores a `Pending` record under a fresh confirmation code.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::PoolNotFound`],
    /// [`BookingError::InvalidQuantity`] /
    /// [`BookingError::QuantityLimitExceeded`],
    /// [`BookingError::InsufficientCapacity`],
    /// [`BookingError::DuplicateConfirmationCode`] once code retries are
    /// exhausted, or [`BookingError::Storage`]. Nothing is reserved on any
    /// error path.
    pub async fn create_booking(
        &self,
        key: PoolKey,
        quantity: u32,
        buyer: Buyer,
    ) -> Result<BookingRecord, BookingError> {
        self.validate_quantity(quantity)?;
        let pool = self.load_pool(key).await?;

        let unit_price = pool.unit_price();
        let total_price = pricing::total_price(unit_price, quantity).ok_or(
            BookingError::PriceOverflow {
                unit_price,
                quantity,
            },
        )?;

        let gate = self.gate(key);
        let _guard = gate.lock().await;

        self.ledger.reserve(&pool, quantity)?;
        if let Err(source) = self.env.store.persist_pool(&pool).await {
            self.ledger.release(&pool, quantity);
            return Err(storage(source));
        }

        let mut record = BookingRecord {
            id: BookingId::new(),
            event_id: key.event_id,
            ticket_type_id: key.ticket_type_id,
            buyer,
            quantity,
            unit_price,
            total_price,
            status: BookingStatus::Pending,
            confirmation_code: self.env.codes.issue(),
            created_at: self.env.clock.now(),
        };

        let mut attempts: u32 = 1;
        loop {
            match self.env.store.insert_booking(&record).await {
                Ok(()) => break,
                Err(StoreError::DuplicateCode { code }) if attempts < self.config.code_retries => {
                    tracing::warn!(booking = %record.id, %code, attempts, "confirmation code collision, retrying");
                    attempts += 1;
                    record.confirmation_code = self.env.codes.issue();
                }
                Err(StoreError::DuplicateCode { .. }) => {
                    self.rollback_reserve(&pool, quantity).await;
                    return Err(BookingError::DuplicateConfirmationCode { attempts });
                }
                Err(source) => {
                    self.rollback_reserve(&pool, quantity).await;
                    return Err(storage(source));
                }
            }
        }

        metrics::record_booking("pending");
        tracing::info!(
            booking = %record.id,
            pool = %key,
            quantity,
            total = %record.total_price,
            code = %record.confirmation_code,
            "booking created"
        );
        Ok(record)
    }

    /// Changes a booking's quantity, adjusting its pool by the signed delta.
    ///
    /// Increases fail cleanly when the pool cannot cover the delta, leaving
    /// the old quantity and price intact; decreases always succeed. The total
    /// is recomputed from the unit price snapshot, never from the pool's
    /// current price.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`],
    /// [`BookingError::InvalidQuantity`] /
    /// [`BookingError::QuantityLimitExceeded`],
    /// [`BookingError::InvalidTransition`] for cancelled bookings,
    /// [`BookingError::InsufficientCapacity`], or [`BookingError::Storage`].
    pub async fn change_quantity(
        &self,
        id: BookingId,
        new_quantity: u32,
    ) -> Result<BookingRecord, BookingError> {
        self.validate_quantity(new_quantity)?;
        let mut record = self.load_booking(id).await?;

        if !record.holds_capacity() {
            // Quantity edits apply to Pending and Confirmed bookings only.
            return Err(BookingError::InvalidTransition {
                from: record.status,
                to: record.status,
            });
        }

        let total_price = pricing::total_price(record.unit_price, new_quantity).ok_or(
            BookingError::PriceOverflow {
                unit_price: record.unit_price,
                quantity: new_quantity,
            },
        )?;

        let key = record.pool_key();
        let pool = self.load_pool(key).await?;
        let gate = self.gate(key);
        let _guard = gate.lock().await;

        let delta = i64::from(new_quantity) - i64::from(record.quantity);
        self.ledger.adjust(&pool, delta)?;

        if delta != 0 {
            if let Err(source) = self.env.store.persist_pool(&pool).await {
                self.undo_adjust(&pool, delta);
                return Err(storage(source));
            }
        }

        record.quantity = new_quantity;
        record.total_price = total_price;
        if let Err(source) = self.env.store.update_booking(&record).await {
            self.undo_adjust(&pool, delta);
            self.persist_or_log(&pool).await;
            return Err(storage(source));
        }

        tracing::info!(
            booking = %record.id,
            pool = %key,
            quantity = new_quantity,
            delta,
            total = %record.total_price,
            "booking quantity changed"
        );
        Ok(record)
    }

    /// Drives a booking through the status transition table.
    ///
    /// Re-activating a cancelled booking re-reserves its full quantity and
    /// fails with `InsufficientCapacity` if the pool has since filled.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`],
    /// [`BookingError::InvalidTransition`] for any pair not in the table,
    /// [`BookingError::InsufficientCapacity`], or [`BookingError::Storage`].
    /// On every error path the record keeps its prior status.
    pub async fn set_status(
        &self,
        id: BookingId,
        new_status: BookingStatus,
    ) -> Result<BookingRecord, BookingError> {
        let mut record = self.load_booking(id).await?;

        let effect = record.status.transition_effect(new_status).ok_or(
            BookingError::InvalidTransition {
                from: record.status,
                to: new_status,
            },
        )?;

        let key = record.pool_key();
        let pool = self.load_pool(key).await?;
        let gate = self.gate(key);
        let _guard = gate.lock().await;

        match effect {
            TransitionEffect::None => {}
            TransitionEffect::Reserve => {
                self.ledger.reserve(&pool, record.quantity)?;
                if let Err(source) = self.env.store.persist_pool(&pool).await {
                    self.ledger.release(&pool, record.quantity);
                    return Err(storage(source));
                }
            }
            TransitionEffect::Release => {
                self.ledger.release(&pool, record.quantity);
                if let Err(source) = self.env.store.persist_pool(&pool).await {
                    // Un-release; under the gate the capacity cannot have
                    // been taken by anyone else.
                    let _ = self.ledger.reserve(&pool, record.quantity);
                    return Err(storage(source));
                }
            }
        }

        let old_status = record.status;
        record.status = new_status;
        if let Err(source) = self.env.store.update_booking(&record).await {
            match effect {
                TransitionEffect::None => {}
                TransitionEffect::Reserve => {
                    self.ledger.release(&pool, record.quantity);
                    self.persist_or_log(&pool).await;
                }
                TransitionEffect::Release => {
                    let _ = self.ledger.reserve(&pool, record.quantity);
                    self.persist_or_log(&pool).await;
                }
            }
            return Err(storage(source));
        }

        metrics::record_booking(&new_status.to_string());
        tracing::info!(
            booking = %record.id,
            pool = %key,
            from = %old_status,
            to = %new_status,
            "booking status changed"
        );
        Ok(record)
    }

    /// Cancels a booking and deletes its record, releasing held capacity.
    ///
    /// Mirrors a delete endpoint: an already-cancelled booking is deleted
    /// without touching the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`],
    /// [`BookingError::PoolNotFound`] if the backing pool vanished, or
    /// [`BookingError::Storage`].
    pub async fn cancel_booking(&self, id: BookingId) -> Result<BookingRecord, BookingError> {
        let mut record = self.load_booking(id).await?;

        if record.holds_capacity() {
            let key = record.pool_key();
            let pool = self.load_pool(key).await?;
            let gate = self.gate(key);
            let _guard = gate.lock().await;

            self.ledger.release(&pool, record.quantity);
            if let Err(source) = self.env.store.persist_pool(&pool).await {
                let _ = self.ledger.reserve(&pool, record.quantity);
                return Err(storage(source));
            }

            if let Err(source) = self.env.store.delete_booking(id).await {
                let _ = self.ledger.reserve(&pool, record.quantity);
                self.persist_or_log(&pool).await;
                return Err(storage(source));
            }
        } else if let Err(source) = self.env.store.delete_booking(id).await {
            return Err(storage(source));
        }

        record.status = BookingStatus::Cancelled;
        metrics::record_booking("cancelled");
        tracing::info!(booking = %record.id, "booking cancelled and deleted");
        Ok(record)
    }

    /// Updates the buyer's contact details. Never touches inventory.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`] or [`BookingError::Storage`].
    pub async fn update_buyer(
        &self,
        id: BookingId,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<BookingRecord, BookingError> {
        let mut record = self.load_booking(id).await?;
        if let Some(name) = name {
            record.buyer.name = name;
        }
        if let Some(email) = email {
            record.buyer.email = email;
        }
        self.env
            .store
            .update_booking(&record)
            .await
            .map_err(storage)?;
        Ok(record)
    }

    /// Moves a booking to a different pool (e.g. another ticket type).
    ///
    /// This is deliberately not atomic: pools are independently serialized
    /// and there is no cross-pool transaction. The engine releases the old
    /// pool, reserves the new one, and compensates by re-reserving the old
    /// pool if the second step fails. On success the unit price is
    /// re-snapshotted from the new pool and the total recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`] /
    /// [`BookingError::PoolNotFound`], [`BookingError::InvalidTransition`]
    /// for cancelled bookings, [`BookingError::InsufficientCapacity`] when
    /// the new pool is full (the old reservation is restored), or
    /// [`BookingError::MoveCompensationFailed`] when even the compensating
    /// re-reserve lost its capacity - the booking is then left cancelled and
    /// the partial effect is the caller's to resolve.
    #[allow(clippy::too_many_lines)] // Compensation paths are spelled out one by one
    pub async fn move_booking(
        &self,
        id: BookingId,
        new_key: PoolKey,
    ) -> Result<BookingRecord, BookingError> {
        let mut record = self.load_booking(id).await?;

        if !record.holds_capacity() {
            return Err(BookingError::InvalidTransition {
                from: record.status,
                to: record.status,
            });
        }

        let old_key = record.pool_key();
        if old_key == new_key {
            return Ok(record);
        }

        let old_pool = self.load_pool(old_key).await?;
        let new_pool = self.load_pool(new_key).await?;

        let unit_price = new_pool.unit_price();
        let total_price = pricing::total_price(unit_price, record.quantity).ok_or(
            BookingError::PriceOverflow {
                unit_price,
                quantity: record.quantity,
            },
        )?;

        // Lock both gates in key order so concurrent moves cannot deadlock.
        let (first, second) = if old_key < new_key {
            (old_key, new_key)
        } else {
            (new_key, old_key)
        };
        let first_gate = self.gate(first);
        let second_gate = self.gate(second);
        let _first_guard = first_gate.lock().await;
        let _second_guard = second_gate.lock().await;

        let quantity = record.quantity;
        self.ledger.release(&old_pool, quantity);
        if let Err(source) = self.env.store.persist_pool(&old_pool).await {
            let _ = self.ledger.reserve(&old_pool, quantity);
            return Err(storage(source));
        }

        if let Err(rejection) = self.ledger.reserve(&new_pool, quantity) {
            // Put the booking back where it was. Under both gates the old
            // capacity cannot have been taken, but the ledger is also used
            // directly by embedding applications, so the failure path stays.
            if self.ledger.reserve(&old_pool, quantity).is_err() {
                tracing::error!(
                    booking = %record.id,
                    from = %old_key,
                    to = %new_key,
                    "move compensation failed; cancelling booking"
                );
                record.status = BookingStatus::Cancelled;
                if let Err(source) = self.env.store.update_booking(&record).await {
                    tracing::error!(booking = %record.id, error = %source, "could not persist cancellation");
                }
                self.persist_or_log(&old_pool).await;
                return Err(BookingError::MoveCompensationFailed {
                    from: old_key,
                    to: new_key,
                });
            }
            self.persist_or_log(&old_pool).await;
            return Err(rejection);
        }

        if let Err(source) = self.env.store.persist_pool(&new_pool).await {
            self.ledger.release(&new_pool, quantity);
            let _ = self.ledger.reserve(&old_pool, quantity);
            self.persist_or_log(&old_pool).await;
            return Err(storage(source));
        }

        record.event_id = new_key.event_id;
        record.ticket_type_id = new_key.ticket_type_id;
        record.unit_price = unit_price;
        record.total_price = total_price;
        if let Err(source) = self.env.store.update_booking(&record).await {
            self.ledger.release(&new_pool, quantity);
            self.persist_or_log(&new_pool).await;
            let _ = self.ledger.reserve(&old_pool, quantity);
            self.persist_or_log(&old_pool).await;
            return Err(storage(source));
        }

        tracing::info!(
            booking = %record.id,
            from = %old_key,
            to = %new_key,
            quantity,
            total = %record.total_price,
            "booking moved"
        );
        Ok(record)
    }

    /// Loads a booking by id.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`] or [`BookingError::Storage`].
    pub async fn booking(&self, id: BookingId) -> Result<BookingRecord, BookingError> {
        self.load_booking(id).await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn validate_quantity(&self, quantity: u32) -> Result<(), BookingError> {
        if quantity == 0 {
            return Err(BookingError::InvalidQuantity { quantity });
        }
        if let Some(limit) = self.config.max_quantity {
            if quantity > limit {
                return Err(BookingError::QuantityLimitExceeded { quantity, limit });
            }
        }
        Ok(())
    }

    async fn load_pool(&self, key: PoolKey) -> Result<Arc<TicketPool>, BookingError> {
        self.env
            .store
            .load_pool(key)
            .await
            .map_err(storage)?
            .ok_or(BookingError::PoolNotFound { key })
    }

    async fn load_booking(&self, id: BookingId) -> Result<BookingRecord, BookingError> {
        self.env
            .store
            .load_booking(id)
            .await
            .map_err(storage)?
            .ok_or(BookingError::BookingNotFound { id })
    }

    /// Transition gate for a pool, created on first use
    fn gate(&self, key: PoolKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(gates.entry(key).or_default())
    }

    fn drop_gate(&self, key: PoolKey) {
        let mut gates = self.gates.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        gates.remove(&key);
    }

    /// Reverses a just-committed reserve after a downstream failure
    async fn rollback_reserve(&self, pool: &TicketPool, quantity: u32) {
        self.ledger.release(pool, quantity);
        self.persist_or_log(pool).await;
    }

    /// Reverses a just-applied adjust after a downstream failure
    fn undo_adjust(&self, pool: &TicketPool, delta: i64) {
        // The reverse of a decrease is an increase of capacity we just
        // freed; under the pool gate it cannot fail.
        let _ = self.ledger.adjust(pool, -delta);
    }

    /// Best-effort persist on a compensation path; the primary error has
    /// already been chosen, so a second failure is only logged.
    async fn persist_or_log(&self, pool: &TicketPool) {
        if let Err(error) = self.env.store.persist_pool(pool).await {
            tracing::error!(pool = %pool.key(), %error, "failed to persist compensated pool state");
        }
    }
}

fn storage(source: StoreError) -> BookingError {
    BookingError::Storage { source }
}
