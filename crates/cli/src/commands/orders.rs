//! Order tracking commands.

use chrono::Utc;
use pizzeria_core::{CurrencyCode, OrderId, format_currency};
use pizzeria_storefront::models::Order;
use pizzeria_storefront::{Storefront, SyncError};

/// Show one order.
pub async fn show(storefront: &Storefront, id: &OrderId) -> Result<(), SyncError> {
    let order = storefront.fetch_order(id).await?;
    print_order(&order);
    Ok(())
}

/// Upgrade an order to priority and show it.
pub async fn prioritize(storefront: &Storefront, id: &OrderId) -> Result<(), SyncError> {
    let order = storefront.upgrade_priority(id).await?;
    print_order(&order);
    Ok(())
}

/// List the signed-in user's recent orders.
pub async fn history(storefront: &Storefront) -> Result<(), SyncError> {
    let orders = storefront.fetch_history().await?;
    if orders.is_empty() {
        tracing::info!("No orders yet");
    }

    #[allow(clippy::print_stdout)]
    for order in &orders {
        println!(
            "{:<10} {:<18} {:>10}  {}",
            order.id,
            order.status.label(),
            format_currency(order.total_price(), CurrencyCode::default()),
            order.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_order(order: &Order) {
    let meta = order.status.meta();
    let currency = CurrencyCode::default();

    println!("Order {} - {} ({})", order.id, meta.label, meta.description);
    for line in &order.cart_snapshot {
        println!(
            "  {}x {:<24} {:>10}",
            line.quantity,
            line.name,
            format_currency(line.total_price, currency)
        );
    }
    println!("  Price:    {}", format_currency(order.order_price, currency));
    if order.priority {
        println!("  Priority: {}", format_currency(order.priority_price, currency));
    }
    println!("  Total:    {}", format_currency(order.total_price(), currency));

    match order.time_remaining(Utc::now()) {
        Some(remaining) => println!("  Arrives in about {} min", remaining.num_minutes()),
        None => println!("  Estimated delivery has passed"),
    }
}
