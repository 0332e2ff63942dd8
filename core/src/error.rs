//! Error taxonomy for the boxoffice engine.
//!
//! Capacity and transition rejections are expected, recoverable outcomes and
//! carry enough context for a caller to report the reason. Storage failures
//! mean the operation did not happen: the engine rolls back any in-memory
//! ledger step before surfacing them.

use crate::booking::BookingStatus;
use crate::types::{BookingId, Money, PoolKey};
use thiserror::Error;

/// Errors reported by the storage collaborator.
///
/// The engine treats any of these as "the write did not happen durably" and
/// compensates accordingly; it never retries storage operations itself.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A booking with the same confirmation code already exists.
    ///
    /// The engine retries with a freshly issued code a bounded number of
    /// times before giving up.
    #[error("confirmation code already in use: {code}")]
    DuplicateCode {
        /// The colliding code
        code: String,
    },

    /// A record conflicts with existing state (e.g. a pool key registered twice).
    #[error("conflict: {reason}")]
    Conflict {
        /// What conflicted
        reason: String,
    },

    /// The store could not durably record the write.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Underlying cause
        reason: String,
    },
}

/// Errors reported by engine operations.
#[derive(Error, Debug)]
pub enum BookingError {
    /// No pool is registered under the given key.
    #[error("pool not found: {key}")]
    PoolNotFound {
        /// The missing pool's key
        key: PoolKey,
    },

    /// No booking exists with the given id.
    #[error("booking not found: {id}")]
    BookingNotFound {
        /// The missing booking's id
        id: BookingId,
    },

    /// A reserve (or upward adjust) could not be satisfied.
    ///
    /// No capacity was taken; the pool and the booking are unchanged.
    #[error("insufficient capacity on {key}: requested {requested}, available {available}")]
    InsufficientCapacity {
        /// Pool that rejected the reservation
        key: PoolKey,
        /// Quantity that was asked for
        requested: u32,
        /// Quantity that was actually available at the atomic step
        available: u32,
    },

    /// The requested status change is not in the transition table.
    ///
    /// Quantity edits on a cancelled booking surface as the (rejected)
    /// cancelled self-transition.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the booking is in
        from: BookingStatus,
        /// Status that was requested
        to: BookingStatus,
    },

    /// Booking quantities must be positive.
    #[error("invalid quantity: {quantity}")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: u32,
    },

    /// The requested quantity exceeds the configured per-booking limit.
    #[error("quantity {quantity} exceeds the per-booking limit of {limit}")]
    QuantityLimitExceeded {
        /// The rejected quantity
        quantity: u32,
        /// Configured limit
        limit: u32,
    },

    /// `unit_price × quantity` does not fit in a money value.
    #[error("price overflow: {unit_price} x {quantity}")]
    PriceOverflow {
        /// Unit price snapshot
        unit_price: Money,
        /// Quantity that overflowed
        quantity: u32,
    },

    /// Confirmation code generation kept colliding with stored bookings.
    ///
    /// The reservation was rolled back; the caller may simply retry.
    #[error("could not issue a unique confirmation code after {attempts} attempts")]
    DuplicateConfirmationCode {
        /// How many codes were tried
        attempts: u32,
    },

    /// The pool still has committed capacity and cannot be retired.
    #[error("pool {key} still holds {committed} committed tickets")]
    PoolInUse {
        /// Pool that was asked to retire
        key: PoolKey,
        /// Tickets still committed against it
        committed: u32,
    },

    /// A cross-pool move released the old pool but could neither reserve the
    /// new pool nor re-reserve the old one.
    ///
    /// The booking is left cancelled; the partial effect is deliberately
    /// caller-visible because pools are independently serialized and there is
    /// no cross-pool atomic primitive.
    #[error("move from {from} to {to} failed and could not be compensated")]
    MoveCompensationFailed {
        /// Pool the booking was released from
        from: PoolKey,
        /// Pool that rejected the reservation
        to: PoolKey,
    },

    /// The storage collaborator failed; the operation did not happen.
    #[error("storage failure: {source}")]
    Storage {
        /// The underlying store error
        #[source]
        source: StoreError,
    },
}

impl BookingError {
    /// True for rejections a caller can recover from by changing the request
    /// (capacity, transition, validation), as opposed to faults.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCapacity { .. }
                | Self::InvalidTransition { .. }
                | Self::InvalidQuantity { .. }
                | Self::QuantityLimitExceeded { .. }
                | Self::PoolInUse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventId, TicketTypeId};

    #[test]
    fn capacity_rejection_reports_context() {
        let key = PoolKey::new(EventId::new(), TicketTypeId::new());
        let err = BookingError::InsufficientCapacity {
            key,
            requested: 6,
            available: 4,
        };
        let message = err.to_string();
        assert!(message.contains("requested 6"));
        assert!(message.contains("available 4"));
        assert!(err.is_rejection());
    }

    #[test]
    fn storage_failures_are_not_rejections() {
        let err = BookingError::Storage {
            source: StoreError::Unavailable {
                reason: "disk full".to_string(),
            },
        };
        assert!(!err.is_rejection());
    }
}
