//! Menu listing.

use pizzeria_core::{CurrencyCode, format_currency};
use pizzeria_storefront::{MenuSort, Storefront, SyncError};

/// Print the menu in the requested order, with average ratings.
pub async fn list(storefront: &Storefront, sort: MenuSort) -> Result<(), SyncError> {
    if let Err(e) = storefront.fetch_ratings().await {
        tracing::warn!(error = %e, "Ratings unavailable, listing without them");
    }
    let menu = storefront.fetch_menu(sort).await?;

    #[allow(clippy::print_stdout)]
    for item in &menu {
        let rating = storefront
            .ratings()
            .aggregate(item.id)
            .map_or_else(String::new, |a| {
                format!("  {:.1}★ ({})", a.average(), a.count())
            });
        let sold_out = if item.sold_out { "  [sold out]" } else { "" };
        println!(
            "{:>4}  {:<24} {:>10}{rating}{sold_out}",
            item.id,
            item.name,
            format_currency(item.unit_price, CurrencyCode::default()),
        );
    }

    Ok(())
}
