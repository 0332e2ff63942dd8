//! Boxoffice Engine Demo
//!
//! Interactive demonstration of the booking lifecycle engine showing:
//! - Pool creation for an event's ticket types
//! - A concurrent on-sale rush that cannot oversell
//! - Quantity edits, confirmation, and cancellation releasing capacity
//! - Price snapshots surviving a pool repricing
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin booking-demo
//! ```

use boxoffice_core::booking::BookingStatus;
use boxoffice_core::metrics::register_business_metrics;
use boxoffice_core::types::{Buyer, Money, PoolKey, EventId, TicketTypeId};
use boxoffice_core::{BookingEngine, Config, InventoryStore};
use boxoffice_testing::InMemoryInventoryStore;
use futures::future::join_all;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boxoffice_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    register_business_metrics();

    println!("\n🎫 ============================================");
    println!("   Boxoffice Engine - Live Demo");
    println!("============================================\n");

    let config = Config::from_env();
    let store = Arc::new(InMemoryInventoryStore::new());
    let engine = Arc::new(BookingEngine::new(
        Arc::clone(&store) as Arc<dyn InventoryStore>,
        config,
    ));

    println!("📋 Demo Scenario: Summer Music Festival");
    println!("   Ticket type: General Admission");
    println!("   Capacity: 100 tickets at $25.00\n");

    // Step 1: open the pool for the on-sale
    let event_id = EventId::new();
    let general = PoolKey::new(event_id, TicketTypeId::new());
    engine
        .open_pool(
            general,
            boxoffice_core::Capacity::new(100),
            Money::from_cents(2_500),
        )
        .await?;

    // Step 2: on-sale rush - 150 buyers race for 100 tickets
    println!("1️⃣  On-sale rush: 150 concurrent buyers, 1-4 tickets each...");
    let handles: Vec<_> = (0..150)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let quantity = i % 4 + 1;
                let buyer = Buyer::new(format!("Buyer {i}"), format!("buyer{i}@example.com"));
                engine.create_booking(general, quantity, buyer).await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    let winners: Vec<_> = results.into_iter().filter_map(Result::ok).collect();

    let snapshot = engine.availability(general).await?;
    println!("   ✅ {} bookings won tickets", winners.len());
    println!(
        "   📈 committed {}/{} (available {})",
        snapshot.committed,
        snapshot.capacity,
        snapshot.available
    );
    assert!(snapshot.committed <= snapshot.capacity.value());

    // Step 3: lifecycle - confirm one booking, grow another, cancel a third
    println!("\n2️⃣  Lifecycle: confirm, resize, cancel...");
    let confirmed = engine
        .set_status(winners[0].id, BookingStatus::Confirmed)
        .await?;
    println!(
        "   ✔ confirmed booking {} ({})",
        confirmed.id, confirmed.confirmation_code
    );

    match engine.change_quantity(winners[1].id, winners[1].quantity + 1).await {
        Ok(resized) => println!(
            "   ↗ resized booking {} to {} tickets ({})",
            resized.id, resized.quantity, resized.total_price
        ),
        Err(error) => println!("   ↗ resize rejected: {error}"),
    }

    let cancelled = engine
        .set_status(winners[2].id, BookingStatus::Cancelled)
        .await?;
    println!("   ✖ cancelled booking {}", cancelled.id);

    let snapshot = engine.availability(general).await?;
    println!(
        "   📈 committed {}/{} after lifecycle churn",
        snapshot.committed, snapshot.capacity
    );

    // Step 4: repricing never rewrites existing bookings
    println!("\n3️⃣  Repricing: GA goes to $40.00...");
    if let Some(pool) = store.load_pool(general).await? {
        pool.set_unit_price(Money::from_cents(4_000));
    }
    let record_after = engine.booking(winners[0].id).await?;
    println!(
        "   💵 booking {} still pays {} (snapshot {})",
        record_after.id, record_after.total_price, record_after.unit_price
    );

    println!("\n📦 Final state:");
    println!("{}", serde_json::to_string_pretty(&engine.availability(general).await?)?);

    println!("\n✅ Demo complete: no oversell, every release accounted for.\n");
    Ok(())
}
