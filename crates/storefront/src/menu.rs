//! Menu ordering utilities.
//!
//! Pure functions; no state. Sorts are stable and break ties by name so the
//! menu does not reshuffle between renders.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use pizzeria_core::ProductId;

use crate::models::MenuItem;

/// Menu orderings offered to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuSort {
    /// Backend order.
    #[default]
    Featured,
    PriceAscending,
    PriceDescending,
    /// Highest average rating first; unrated products last.
    RatingDescending,
    Name,
}

impl std::str::FromStr for MenuSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "featured" => Ok(Self::Featured),
            "price-asc" | "price_ascending" => Ok(Self::PriceAscending),
            "price-desc" | "price_descending" => Ok(Self::PriceDescending),
            "rating" | "rating_descending" => Ok(Self::RatingDescending),
            "name" => Ok(Self::Name),
            _ => Err(format!("invalid menu sort: {s}")),
        }
    }
}

/// Sort `items` in place.
///
/// `average_of` supplies a product's average rating for
/// [`MenuSort::RatingDescending`]; other orderings ignore it.
pub fn sort_menu(
    items: &mut [MenuItem],
    sort: MenuSort,
    average_of: impl Fn(ProductId) -> Option<f64>,
) {
    match sort {
        MenuSort::Featured => {}
        MenuSort::PriceAscending => sort_by_price(items, true),
        MenuSort::PriceDescending => sort_by_price(items, false),
        MenuSort::RatingDescending => sort_by_rating(items, average_of),
        MenuSort::Name => items.sort_by(|a, b| a.name.cmp(&b.name)),
    }
}

/// Sort by unit price, cheapest first when `ascending`.
pub fn sort_by_price(items: &mut [MenuItem], ascending: bool) {
    items.sort_by(|a, b| {
        let by_price = a.unit_price.cmp(&b.unit_price);
        let by_price = if ascending { by_price } else { by_price.reverse() };
        by_price.then_with(|| a.name.cmp(&b.name))
    });
}

/// Sort by average rating, best first. Unrated products go last.
pub fn sort_by_rating(items: &mut [MenuItem], average_of: impl Fn(ProductId) -> Option<f64>) {
    items.sort_by(|a, b| {
        let by_rating = match (average_of(a.id), average_of(b.id)) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_rating.then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(id: i32, name: &str, price: i64) -> MenuItem {
        MenuItem {
            id: ProductId::new(id),
            name: name.to_string(),
            unit_price: Decimal::new(price, 0),
            ingredients: Vec::new(),
            sold_out: false,
            image_url: None,
        }
    }

    fn names(items: &[MenuItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    fn menu() -> Vec<MenuItem> {
        vec![
            item(1, "Margherita", 12),
            item(2, "Diavola", 16),
            item(3, "Capricciosa", 14),
            item(4, "Romana", 12),
        ]
    }

    #[test]
    fn test_price_ascending_breaks_ties_by_name() {
        let mut items = menu();
        sort_menu(&mut items, MenuSort::PriceAscending, |_| None);
        assert_eq!(names(&items), ["Margherita", "Romana", "Capricciosa", "Diavola"]);
    }

    #[test]
    fn test_price_descending() {
        let mut items = menu();
        sort_menu(&mut items, MenuSort::PriceDescending, |_| None);
        assert_eq!(names(&items), ["Diavola", "Capricciosa", "Margherita", "Romana"]);
    }

    #[test]
    fn test_rating_descending_puts_unrated_last() {
        let mut items = menu();
        sort_menu(&mut items, MenuSort::RatingDescending, |id| match id.as_i32() {
            1 => Some(3.5),
            3 => Some(4.8),
            _ => None,
        });
        assert_eq!(names(&items), ["Capricciosa", "Margherita", "Diavola", "Romana"]);
    }

    #[test]
    fn test_featured_keeps_backend_order() {
        let mut items = menu();
        sort_menu(&mut items, MenuSort::Featured, |_| None);
        assert_eq!(names(&items), names(&menu()));
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!("price-asc".parse::<MenuSort>(), Ok(MenuSort::PriceAscending));
        assert_eq!("rating".parse::<MenuSort>(), Ok(MenuSort::RatingDescending));
        assert!("spiciest".parse::<MenuSort>().is_err());
    }
}
