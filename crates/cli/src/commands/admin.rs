//! Operator ledger commands.
//!
//! All commands need `--user-id`, `--admin` and `PIZZERIA_API_TOKEN`.

use pizzeria_core::{CurrencyCode, OrderId, OrderStatus, format_currency};
use pizzeria_storefront::{AdminStats, Storefront, SyncError};

/// Refresh the ledger and print its statistics.
pub async fn stats(storefront: &Storefront) -> Result<(), SyncError> {
    let stats = storefront.fetch_admin().await?;
    print_stats(&stats);
    Ok(())
}

/// Set an order's status.
pub async fn set_status(
    storefront: &Storefront,
    id: &OrderId,
    status: OrderStatus,
) -> Result<(), SyncError> {
    if !status.is_known() {
        tracing::warn!(status = %status.as_str(), "Status is not in the registry");
    }
    let order = storefront.update_status_admin(id, status).await?;
    tracing::info!(order_id = %order.id, status = %order.status.label(), "Status updated");
    print_stats(&storefront.orders().admin_stats());
    Ok(())
}

/// Delete an order.
pub async fn delete(storefront: &Storefront, id: &OrderId) -> Result<(), SyncError> {
    storefront.delete_admin(id).await?;
    print_stats(&storefront.orders().admin_stats());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_stats(stats: &AdminStats) {
    println!("Orders:    {}", stats.total_orders);
    println!("Active:    {}", stats.active_orders);
    println!("Completed: {}", stats.completed_orders);
    println!(
        "Revenue:   {}",
        format_currency(stats.total_revenue, CurrencyCode::default())
    );
}
