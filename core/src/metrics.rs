//! Business metrics for the boxoffice engine.
//!
//! Recording uses the `metrics` facade, so a host application can install
//! whichever exporter it likes. Nothing here is required for correctness.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `boxoffice_reservations_total{outcome}` - Ledger reserve attempts by outcome
//! - `boxoffice_releases_total` - Tickets returned to pools
//! - `boxoffice_bookings_total{status}` - Booking lifecycle events by resulting status
//!
//! ## Gauges
//! - `boxoffice_tickets_committed` - Tickets currently held by non-cancelled bookings

use metrics::{describe_counter, describe_gauge};

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are
/// recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "boxoffice_reservations_total",
        "Ledger reserve attempts by outcome (committed, rejected)"
    );
    describe_counter!(
        "boxoffice_releases_total",
        "Tickets returned to pools by release or downsizing"
    );
    describe_counter!(
        "boxoffice_bookings_total",
        "Booking lifecycle events by resulting status (pending, confirmed, cancelled)"
    );
    describe_gauge!(
        "boxoffice_tickets_committed",
        "Tickets currently held by non-cancelled bookings across all pools"
    );

    tracing::info!("Business metrics registered");
}

/// Record a successful reserve of `quantity` tickets
pub fn record_reservation_committed(quantity: u32) {
    metrics::counter!("boxoffice_reservations_total", "outcome" => "committed").increment(1);
    metrics::gauge!("boxoffice_tickets_committed").increment(f64::from(quantity));
}

/// Record a reserve rejected for insufficient capacity
pub fn record_reservation_rejected() {
    metrics::counter!("boxoffice_reservations_total", "outcome" => "rejected").increment(1);
}

/// Record `quantity` tickets returned to a pool
pub fn record_release(quantity: u32) {
    metrics::counter!("boxoffice_releases_total").increment(u64::from(quantity));
    metrics::gauge!("boxoffice_tickets_committed").decrement(f64::from(quantity));
}

/// Record a booking reaching `status`
pub fn record_booking(status: &str) {
    metrics::counter!("boxoffice_bookings_total", "status" => status.to_string()).increment(1);
}
