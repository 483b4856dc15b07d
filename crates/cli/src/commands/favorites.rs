//! Favorites listing.

use pizzeria_core::{CurrencyCode, format_currency};
use pizzeria_storefront::{Storefront, SyncError};

/// Print the current identity's favorites.
pub async fn list(storefront: &Storefront) -> Result<(), SyncError> {
    storefront.fetch_favorites().await?;

    #[allow(clippy::print_stdout)]
    for favorite in storefront.favorites().list() {
        println!(
            "{:>4}  {:<24} {:>10}",
            favorite.product_id,
            favorite.name,
            format_currency(favorite.unit_price, CurrencyCode::default()),
        );
    }
    Ok(())
}
