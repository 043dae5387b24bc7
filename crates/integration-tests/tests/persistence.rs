//! Cart and order persistence through the file-backed storage port.

use std::sync::Arc;

use ataka_commerce::cart::CartStore;
use ataka_commerce::orders::OrderStore;
use ataka_commerce::storage::{JsonFileStore, StorageBackend};
use ataka_core::ItemId;
use ataka_integration_tests::book;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_cart_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn StorageBackend> = Arc::new(JsonFileStore::new(dir.path()));

    // First "session": build up a cart.
    {
        let cart = CartStore::load(Arc::clone(&storage)).await;
        cart.add_item(&book("a", dec!(100)), 2).await.unwrap();
        cart.add_item(&book("b", dec!(249.50)), 1).await.unwrap();
        cart.update_quantity(&ItemId::new("a"), 3).await.unwrap();
    }

    // Second "session": a fresh store over the same directory.
    let cart = CartStore::load(storage).await;
    assert_eq!(cart.item_count().await, 4);
    assert_eq!(cart.total().await.amount, dec!(549.50));
}

#[tokio::test]
async fn test_cleared_cart_stays_cleared_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn StorageBackend> = Arc::new(JsonFileStore::new(dir.path()));

    {
        let cart = CartStore::load(Arc::clone(&storage)).await;
        cart.add_item(&book("a", dec!(100)), 2).await.unwrap();
        cart.clear().await.unwrap();
    }

    let cart = CartStore::load(storage).await;
    assert!(cart.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_cart_document_degrades_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cart.json"), b"{not json").unwrap();

    let storage: Arc<dyn StorageBackend> = Arc::new(JsonFileStore::new(dir.path()));
    let cart = CartStore::load(storage).await;

    // Corruption is logged and swallowed, never surfaced to the shopper.
    assert!(cart.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_orders_document_degrades_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("orders.json"), b"\xff\xfe").unwrap();

    let storage: Arc<dyn StorageBackend> = Arc::new(JsonFileStore::new(dir.path()));
    let orders = OrderStore::load(storage).await;

    assert!(orders.list().await.is_empty());
}

#[tokio::test]
async fn test_cart_and_orders_share_one_backend_without_clashing() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn StorageBackend> = Arc::new(JsonFileStore::new(dir.path()));

    let cart = CartStore::load(Arc::clone(&storage)).await;
    cart.add_item(&book("a", dec!(100)), 1).await.unwrap();

    // Writing the (empty) order collection must not disturb the cart document.
    let orders = OrderStore::load(Arc::clone(&storage)).await;
    drop(orders);

    let reloaded = CartStore::load(storage).await;
    assert_eq!(reloaded.item_count().await, 1);
}
