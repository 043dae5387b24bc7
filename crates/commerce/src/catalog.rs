//! Catalog item projection.
//!
//! Catalog listing, search and ranking live outside the commerce core. The
//! core only consumes this minimal immutable snapshot of a book when it is
//! added to the cart.

use ataka_core::{ItemId, Price};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a catalog item, supplied by the catalog lookup.
///
/// The core never mutates a `CatalogItem`; cart lines copy the display
/// fields they need so later catalog edits don't rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable catalog identifier.
    pub id: ItemId,
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Current selling price.
    pub unit_price: Price,
    /// Pre-discount list price, when the item is on sale.
    pub list_price: Option<Price>,
    /// Cover image reference for display.
    pub image_url: String,
    /// URL slug for the item's detail page.
    pub slug: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ataka_core::CurrencyCode;
    use rust_decimal_macros::dec;

    #[test]
    fn test_serde_round_trip() {
        let item = CatalogItem {
            id: ItemId::new("book-midnight-library"),
            title: "The Midnight Library".to_owned(),
            author: "Matt Haig".to_owned(),
            unit_price: Price::new(dec!(299), CurrencyCode::INR),
            list_price: Some(Price::new(dec!(399), CurrencyCode::INR)),
            image_url: "/covers/midnight-library.jpg".to_owned(),
            slug: "the-midnight-library".to_owned(),
        };

        let json = serde_json::to_string(&item).unwrap();
        let parsed: CatalogItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item);
    }
}
