//! Shopping cart state and persistence.
//!
//! The [`CartStore`] owns the shopper's in-progress selection. It is
//! constructed once at process start, rehydrated from the persistence port,
//! and handed by reference to every consumer - there are no ambient
//! singletons.
//!
//! Every mutation persists the updated line set before returning. Derived
//! reads (`item_count`, `total`) are recomputed from the lines on every
//! call, never cached.

use std::sync::Arc;

use ataka_core::{CurrencyCode, ItemId, Price};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::catalog::CatalogItem;
use crate::storage::{StorageBackend, StorageError};

/// Storage key for the persisted cart document.
const CART_KEY: &str = "cart";

/// One catalog item and its requested quantity within the cart.
///
/// Display fields are copied from the catalog snapshot at add time so the
/// cart (and any order frozen from it) is independent of later catalog
/// edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog identifier; unique within a cart.
    pub item_id: ItemId,
    /// Book title at the time the line was created.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Unit selling price at the time the line was created.
    pub unit_price: Price,
    /// Cover image reference.
    pub image_url: String,
    /// Detail-page slug.
    pub slug: String,
    /// Requested quantity, always >= 1.
    pub quantity: u32,
}

impl CartLine {
    fn from_item(item: &CatalogItem, quantity: u32) -> Self {
        Self {
            item_id: item.id.clone(),
            title: item.title.clone(),
            author: item.author.clone(),
            unit_price: item.unit_price,
            image_url: item.image_url.clone(),
            slug: item.slug.clone(),
            quantity,
        }
    }

    /// Price for this line: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// The full cart: an ordered list of lines, one per distinct item.
///
/// All lines share one currency; the storefront runs single-currency and
/// the checkout orchestrator hands the derived total to the payment
/// gateway verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart lines in insertion order.
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        let currency = self
            .lines
            .first()
            .map_or(CurrencyCode::default(), |line| line.unit_price.currency);
        self.lines.iter().fold(Price::zero(currency), |acc, line| {
            Price::new(acc.amount + line.line_total().amount, currency)
        })
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn line_mut(&mut self, item_id: &ItemId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| &line.item_id == item_id)
    }
}

/// What a cart mutation did, so the caller can notify the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A new line was created for the item.
    Added {
        /// Title of the item, for display.
        title: String,
    },
    /// An existing line's quantity changed.
    Updated {
        /// Title of the item, for display.
        title: String,
        /// The line's quantity after the mutation.
        quantity: u32,
    },
    /// The line was deleted.
    Removed {
        /// Title of the item, for display.
        title: String,
    },
    /// The requested mutation was rejected (e.g., quantity below 1) and the
    /// cart is unchanged.
    Rejected,
    /// The item was not in the cart; nothing changed.
    NotInCart,
}

/// Owns the live cart and keeps it in sync with the persistence port.
///
/// Single-writer per browsing session; the presentation layer is
/// responsible for not submitting two checkouts concurrently.
pub struct CartStore {
    storage: Arc<dyn StorageBackend>,
    cart: RwLock<Cart>,
}

impl CartStore {
    /// Create a store with an empty cart, without touching storage.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            cart: RwLock::new(Cart::empty()),
        }
    }

    /// Create a store rehydrated from the persistence port.
    ///
    /// Malformed or unreadable persisted data degrades to an empty cart;
    /// corruption is logged, never surfaced to the shopper.
    #[instrument(skip(storage))]
    pub async fn load(storage: Arc<dyn StorageBackend>) -> Self {
        let cart = match storage.load(CART_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<CartLine>>(value) {
                Ok(lines) => Cart { lines },
                Err(e) => {
                    warn!(error = %e, "Persisted cart is malformed, starting empty");
                    Cart::empty()
                }
            },
            Ok(None) => Cart::empty(),
            Err(e) => {
                warn!(error = %e, "Failed to load persisted cart, starting empty");
                Cart::empty()
            }
        };

        Self {
            storage,
            cart: RwLock::new(cart),
        }
    }

    /// Add `quantity` units of `item` to the cart.
    ///
    /// If a line for the item already exists its quantity is incremented
    /// (one line per distinct item, always); otherwise a new line is
    /// appended.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if persisting the updated cart fails. The
    /// in-memory cart keeps the mutation either way.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn add_item(
        &self,
        item: &CatalogItem,
        quantity: u32,
    ) -> Result<CartEvent, StorageError> {
        if quantity == 0 {
            return Ok(CartEvent::Rejected);
        }

        let event = {
            let mut cart = self.cart.write().await;
            if let Some(line) = cart.line_mut(&item.id) {
                line.quantity += quantity;
                CartEvent::Updated {
                    title: line.title.clone(),
                    quantity: line.quantity,
                }
            } else {
                cart.lines.push(CartLine::from_item(item, quantity));
                CartEvent::Added {
                    title: item.title.clone(),
                }
            }
        };

        self.persist().await?;
        Ok(event)
    }

    /// Delete the line for `item_id`, if present. Removing an absent item
    /// is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if persisting the updated cart fails.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: &ItemId) -> Result<CartEvent, StorageError> {
        let event = {
            let mut cart = self.cart.write().await;
            let Some(pos) = cart.lines.iter().position(|line| &line.item_id == item_id) else {
                return Ok(CartEvent::NotInCart);
            };
            let line = cart.lines.remove(pos);
            CartEvent::Removed { title: line.title }
        };

        self.persist().await?;
        Ok(event)
    }

    /// Overwrite the quantity of the line for `item_id`.
    ///
    /// Quantities below 1 are rejected and leave the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if persisting the updated cart fails.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<CartEvent, StorageError> {
        if quantity < 1 {
            return Ok(CartEvent::Rejected);
        }

        let event = {
            let mut cart = self.cart.write().await;
            let Some(line) = cart.line_mut(item_id) else {
                return Ok(CartEvent::NotInCart);
            };
            line.quantity = quantity;
            CartEvent::Updated {
                title: line.title.clone(),
                quantity,
            }
        };

        self.persist().await?;
        Ok(event)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if persisting the empty cart fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.cart.write().await.lines.clear();
        self.persist().await
    }

    /// An owned copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.cart.read().await.clone()
    }

    /// Total number of units across all lines.
    pub async fn item_count(&self) -> u32 {
        self.cart.read().await.item_count()
    }

    /// Derived cart total.
    pub async fn total(&self) -> Price {
        self.cart.read().await.total()
    }

    /// Persist the current line set under the `cart` key.
    async fn persist(&self) -> Result<(), StorageError> {
        let lines = self.cart.read().await.lines.clone();
        let value = serde_json::to_value(&lines)?;
        self.storage.save(CART_KEY, &value).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rust_decimal_macros::dec;

    fn book(id: &str, price: rust_decimal::Decimal) -> CatalogItem {
        CatalogItem {
            id: ItemId::new(id),
            title: format!("Book {id}"),
            author: "Test Author".to_owned(),
            unit_price: Price::new(price, CurrencyCode::INR),
            list_price: None,
            image_url: format!("/covers/{id}.jpg"),
            slug: id.to_owned(),
        }
    }

    fn store() -> CartStore {
        CartStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_add_item_creates_line() {
        let cart = store();
        let event = cart.add_item(&book("a", dec!(100)), 1).await.unwrap();
        assert_eq!(
            event,
            CartEvent::Added {
                title: "Book a".to_owned()
            }
        );
        assert_eq!(cart.item_count().await, 1);
    }

    #[tokio::test]
    async fn test_repeated_adds_merge_into_one_line() {
        let cart = store();
        let item = book("a", dec!(100));

        cart.add_item(&item, 1).await.unwrap();
        cart.add_item(&item, 2).await.unwrap();
        cart.add_item(&item, 4).await.unwrap();

        let snapshot = cart.snapshot().await;
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines.first().unwrap().quantity, 7);
        assert_eq!(cart.item_count().await, 7);
    }

    #[tokio::test]
    async fn test_add_existing_item_reports_new_quantity() {
        // Cart has {a: price 100, qty 1}; adding 2 more makes qty 3, total 300.
        let cart = store();
        let item = book("a", dec!(100));

        cart.add_item(&item, 1).await.unwrap();
        let event = cart.add_item(&item, 2).await.unwrap();

        assert_eq!(
            event,
            CartEvent::Updated {
                title: "Book a".to_owned(),
                quantity: 3
            }
        );
        assert_eq!(cart.total().await.amount, dec!(300));
    }

    #[tokio::test]
    async fn test_add_zero_quantity_is_rejected() {
        let cart = store();
        let event = cart.add_item(&book("a", dec!(100)), 0).await.unwrap();
        assert_eq!(event, CartEvent::Rejected);
        assert!(cart.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_item_is_noop() {
        let cart = store();
        cart.add_item(&book("a", dec!(100)), 1).await.unwrap();

        let before = cart.snapshot().await;
        let event = cart.remove_item(&ItemId::new("missing")).await.unwrap();

        assert_eq!(event, CartEvent::NotInCart);
        assert_eq!(cart.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_remove_deletes_line() {
        let cart = store();
        cart.add_item(&book("a", dec!(100)), 1).await.unwrap();
        cart.add_item(&book("b", dec!(50)), 1).await.unwrap();

        let event = cart.remove_item(&ItemId::new("a")).await.unwrap();
        assert_eq!(
            event,
            CartEvent::Removed {
                title: "Book a".to_owned()
            }
        );
        assert_eq!(cart.snapshot().await.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_update_quantity_overwrites() {
        let cart = store();
        cart.add_item(&book("a", dec!(100)), 5).await.unwrap();

        cart.update_quantity(&ItemId::new("a"), 2).await.unwrap();
        assert_eq!(cart.item_count().await, 2);
        assert_eq!(cart.total().await.amount, dec!(200));
    }

    #[tokio::test]
    async fn test_update_quantity_below_one_is_rejected() {
        let cart = store();
        cart.add_item(&book("a", dec!(100)), 3).await.unwrap();

        let event = cart.update_quantity(&ItemId::new("a"), 0).await.unwrap();
        assert_eq!(event, CartEvent::Rejected);
        assert_eq!(cart.item_count().await, 3);
    }

    #[tokio::test]
    async fn test_total_tracks_mutations() {
        let cart = store();
        cart.add_item(&book("a", dec!(100)), 2).await.unwrap();
        cart.add_item(&book("b", dec!(249.5)), 1).await.unwrap();
        assert_eq!(cart.total().await.amount, dec!(449.5));

        cart.remove_item(&ItemId::new("b")).await.unwrap();
        assert_eq!(cart.total().await.amount, dec!(200));

        cart.clear().await.unwrap();
        assert_eq!(cart.total().await.amount, dec!(0));
        assert_eq!(cart.item_count().await, 0);
    }

    #[tokio::test]
    async fn test_persist_then_reload_round_trip() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStore::new());

        let cart = CartStore::new(Arc::clone(&storage));
        cart.add_item(&book("a", dec!(100)), 2).await.unwrap();
        cart.add_item(&book("b", dec!(50)), 3).await.unwrap();
        let before = cart.snapshot().await;

        let reloaded = CartStore::load(storage).await;
        let after = reloaded.snapshot().await;

        assert_eq!(after, before);
        assert_eq!(reloaded.item_count().await, 5);
        assert_eq!(reloaded.total().await.amount, dec!(350));
    }

    #[tokio::test]
    async fn test_malformed_persisted_cart_loads_empty() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStore::new());
        storage
            .save(CART_KEY, &serde_json::json!({"not": "a cart"}))
            .await
            .unwrap();

        let cart = CartStore::load(storage).await;
        assert!(cart.snapshot().await.is_empty());
    }
}
