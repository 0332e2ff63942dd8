//! # Boxoffice Core
//!
//! Ticket inventory accounting and booking lifecycle engine.
//!
//! The crate guards one invariant: for every capacity pool (one per
//! event / ticket-type pair), the tickets held by non-cancelled bookings
//! never exceed the pool's capacity - under any interleaving of concurrent
//! bookings, edits, and cancellations.
//!
//! # Architecture
//!
//! ```text
//!          CreateBooking / ChangeQuantity / SetStatus / CancelBooking
//!                                  │
//!                                  ▼
//!                        ┌──────────────────┐
//!                        │  BookingEngine   │  transition table +
//!                        │  (state machine) │  per-pool serialization
//!                        └────────┬─────────┘
//!                     ┌───────────┼──────────────┐
//!                     ▼           ▼              ▼
//!              ┌───────────┐ ┌─────────┐  ┌─────────────────┐
//!              │  Ledger   │ │ Pricing │  │ InventoryStore  │
//!              │ (atomic   │ │ (price  │  │ (persistence    │
//!              │  CAS step)│ │snapshot)│  │  contract)      │
//!              └─────┬─────┘ └─────────┘  └─────────────────┘
//!                    ▼
//!              ┌───────────┐
//!              │TicketPool │  capacity / committed
//!              └───────────┘
//! ```
//!
//! # Key Design Points
//!
//! ## 1. Check-and-reserve is one atomic step
//!
//! A naive `available()` read followed by a write loses races for the last
//! tickets. The [`ledger::Ledger`] collapses the check and the increment
//! into a single compare-and-exchange on the pool's committed counter:
//!
//! ```text
//! committed: fetch_update(|c| (capacity - c >= qty).then(|| c + qty))
//! ```
//!
//! Concurrent reserves for the last unit resolve so that at most one wins;
//! the losers observe the availability that beat them.
//!
//! ## 2. Ledger effects and record updates travel together
//!
//! Every status row in the transition table carries at most one ledger
//! effect. The engine holds a per-pool gate across "ledger step, persist,
//! record update", so readers never observe a booking whose capacity is
//! unaccounted for. A storage failure rolls the ledger step back and the
//! operation reports as if it never happened.
//!
//! ## 3. Prices are snapshots
//!
//! A booking captures the unit price at creation; repricing a pool never
//! changes what existing bookings pay.
//!
//! # Usage
//!
//! ```ignore
//! use boxoffice_core::{BookingEngine, Buyer, Capacity, Config, Money, PoolKey};
//!
//! let engine = BookingEngine::new(store, Config::from_env());
//! let key = PoolKey::new(event_id, ticket_type_id);
//! engine.open_pool(key, Capacity::new(100), Money::from_cents(2_500)).await?;
//!
//! let booking = engine
//!     .create_booking(key, 2, Buyer::new("Ada".into(), "ada@example.com".into()))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod booking;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod pool;
pub mod pricing;
pub mod store;
pub mod types;

pub use booking::{BookingRecord, BookingStatus, TransitionEffect};
pub use config::Config;
pub use engine::{BookingEngine, EngineEnvironment};
pub use environment::{Clock, ConfirmationCodes, RandomCodes, SystemClock};
pub use error::{BookingError, StoreError};
pub use ledger::Ledger;
pub use pool::{PoolSnapshot, TicketPool};
pub use store::InventoryStore;
pub use types::{
    BookingId, Buyer, Capacity, ConfirmationCode, EventId, Money, PoolKey, TicketTypeId,
};
