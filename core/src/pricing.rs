//! Price computation for bookings.
//!
//! Totals are always derived from the unit price snapshot captured when the
//! booking was created, never from the pool's current price.

use crate::types::Money;

/// Computes `unit_price × quantity`, or `None` on overflow
#[must_use]
pub const fn total_price(unit_price: Money, quantity: u32) -> Option<Money> {
    unit_price.checked_multiply(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_scales_with_quantity() {
        let unit = Money::from_cents(2_500);
        assert_eq!(total_price(unit, 1), Some(Money::from_cents(2_500)));
        assert_eq!(total_price(unit, 8), Some(Money::from_cents(20_000)));
    }

    #[test]
    fn zero_quantity_is_zero_total() {
        // The engine validates quantity > 0 before pricing; the function
        // itself is total over its domain.
        assert_eq!(
            total_price(Money::from_cents(2_500), 0),
            Some(Money::from_cents(0))
        );
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        assert_eq!(total_price(Money::from_cents(u64::MAX), 2), None);
    }
}
