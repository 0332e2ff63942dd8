//! # Boxoffice Testing
//!
//! Testing utilities and helpers for the boxoffice engine.
//!
//! This crate provides:
//! - Deterministic mock implementations of the environment traits
//!   ([`FixedClock`], [`mocks::SequentialCodes`], [`mocks::FixedCodes`])
//! - The in-memory reference implementation of the storage contract
//!   ([`mocks::InMemoryInventoryStore`]) and a fault-injecting wrapper
//!   ([`mocks::FlakyStore`]) for rollback-path tests
//! - The [`EngineTest`] harness for scenario-style integration tests
//!
//! ## Example
//!
//! ```ignore
//! use boxoffice_testing::EngineTest;
//!
//! #[tokio::test]
//! async fn last_ticket_has_one_winner() {
//!     let t = EngineTest::new();
//!     let key = t.given_pool(1, 2_500).await;
//!
//!     let first = t.engine().create_booking(key, 1, EngineTest::buyer()).await;
//!     let second = t.engine().create_booking(key, 1, EngineTest::buyer()).await;
//!
//!     assert!(first.is_ok());
//!     assert!(second.is_err());
//!     t.assert_committed(key, 1).await;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod mocks;

pub use engine_test::EngineTest;
pub use mocks::{FixedClock, FlakyStore, InMemoryInventoryStore, SequentialCodes, test_clock};
