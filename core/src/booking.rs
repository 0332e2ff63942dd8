//! Booking records and the status state machine.
//!
//! A [`BookingRecord`] is one reservation attempt and its lifecycle state. The
//! legal status transitions form a small closed table; everything not in the
//! table is rejected without side effects. Each legal transition maps to at
//! most one ledger effect, which the engine pairs with the record update.

use crate::types::{BookingId, Buyer, ConfirmationCode, EventId, Money, PoolKey, TicketTypeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Created and holding capacity, awaiting confirmation
    Pending,
    /// Confirmed by the buyer; still holding capacity
    Confirmed,
    /// Cancelled; holds no capacity
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Ledger side effect required by a legal status transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionEffect {
    /// No capacity change
    None,
    /// The booking's full quantity must be reserved before the status changes
    Reserve,
    /// The booking's full quantity is released once the status changes
    Release,
}

impl BookingStatus {
    /// Resolves the status transition table.
    ///
    /// Returns the ledger effect a legal transition requires, or `None` when
    /// the `(self, next)` pair is not in the table. Self-transitions are not
    /// in the table.
    #[must_use]
    pub const fn transition_effect(self, next: Self) -> Option<TransitionEffect> {
        match (self, next) {
            (Self::Pending, Self::Confirmed) => Some(TransitionEffect::None),
            (Self::Pending | Self::Confirmed, Self::Cancelled) => Some(TransitionEffect::Release),
            (Self::Cancelled, Self::Pending | Self::Confirmed) => Some(TransitionEffect::Reserve),
            _ => None,
        }
    }

    /// True while the booking's quantity counts against its pool
    #[must_use]
    pub const fn holds_capacity(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

/// One reservation and its lifecycle state.
///
/// The unit price is snapshotted when the booking is created; later repricing
/// of the pool never changes what an existing booking pays. The total is
/// always `unit_price × quantity` from that snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    /// Unique booking identifier
    pub id: BookingId,
    /// Event the tickets are for
    pub event_id: EventId,
    /// Ticket type the tickets are drawn from
    pub ticket_type_id: TicketTypeId,
    /// Who holds the booking
    pub buyer: Buyer,
    /// Number of tickets held (always positive)
    pub quantity: u32,
    /// Unit price captured at creation
    pub unit_price: Money,
    /// Derived total, `unit_price × quantity`
    pub total_price: Money,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// Opaque unique reference handed to the buyer
    pub confirmation_code: ConfirmationCode,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
}

impl BookingRecord {
    /// Key of the pool this booking draws from
    #[must_use]
    pub const fn pool_key(&self) -> PoolKey {
        PoolKey::new(self.event_id, self.ticket_type_id)
    }

    /// True while the booking's quantity counts against its pool
    #[must_use]
    pub const fn holds_capacity(&self) -> bool {
        self.status.holds_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
    ];

    #[test]
    fn transition_table_matches_design() {
        use BookingStatus::{Cancelled, Confirmed, Pending};
        use TransitionEffect::{None, Release, Reserve};

        assert_eq!(Pending.transition_effect(Confirmed), Some(None));
        assert_eq!(Pending.transition_effect(Cancelled), Some(Release));
        assert_eq!(Confirmed.transition_effect(Cancelled), Some(Release));
        assert_eq!(Cancelled.transition_effect(Pending), Some(Reserve));
        assert_eq!(Cancelled.transition_effect(Confirmed), Some(Reserve));
    }

    #[test]
    fn off_table_pairs_are_rejected() {
        // Everything not listed above is closed: self-transitions and
        // Confirmed -> Pending in particular.
        let legal = [
            (BookingStatus::Pending, BookingStatus::Confirmed),
            (BookingStatus::Pending, BookingStatus::Cancelled),
            (BookingStatus::Confirmed, BookingStatus::Cancelled),
            (BookingStatus::Cancelled, BookingStatus::Pending),
            (BookingStatus::Cancelled, BookingStatus::Confirmed),
        ];

        for from in ALL {
            for to in ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.transition_effect(to).is_some(),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn cancelled_holds_no_capacity() {
        assert!(BookingStatus::Pending.holds_capacity());
        assert!(BookingStatus::Confirmed.holds_capacity());
        assert!(!BookingStatus::Cancelled.holds_capacity());
    }
}
