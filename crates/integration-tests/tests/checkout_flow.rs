//! End-to-end checkout scenarios over the full cart + checkout + orders
//! stack, using fake gateways to drive each failure edge.

use ataka_commerce::checkout::{CheckoutError, CheckoutOutcome};
use ataka_commerce::gateway::GatewayError;
use ataka_core::{ItemId, OrderStatus, PaymentMethod, PaymentStatus};
use ataka_integration_tests::{Behavior, TestContext, book, valid_customer};
use rust_decimal_macros::dec;

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_successful_checkout_freezes_order_and_clears_cart() {
    let ctx = TestContext::new();
    ctx.cart.add_item(&book("a", dec!(100)), 2).await.unwrap();
    ctx.cart.add_item(&book("b", dec!(249.50)), 1).await.unwrap();

    let outcome = ctx
        .checkout
        .place_order(valid_customer(), PaymentMethod::Gateway)
        .await
        .unwrap();

    let CheckoutOutcome::Confirmed { order_id } = outcome else {
        panic!("expected confirmed checkout, got {outcome:?}");
    };

    // The order carries a frozen copy of the two cart lines.
    let order = ctx.orders.get(&order_id).await.unwrap();
    assert_eq!(order.lines.len(), 2);
    assert_eq!(order.total.amount, dec!(449.50));
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment.method, PaymentMethod::Gateway);
    assert!(order.payment.payment_id.is_some());
    assert!(order.shipment.tracking_number.is_some());

    // The cart was cleared only after the order was recorded.
    assert!(ctx.cart.snapshot().await.is_empty());
    assert_eq!(ctx.cart.item_count().await, 0);
}

#[tokio::test]
async fn test_frozen_order_lines_survive_later_cart_mutations() {
    let ctx = TestContext::new();
    ctx.cart.add_item(&book("a", dec!(100)), 2).await.unwrap();

    let outcome = ctx
        .checkout
        .place_order(valid_customer(), PaymentMethod::Gateway)
        .await
        .unwrap();
    let CheckoutOutcome::Confirmed { order_id } = outcome else {
        panic!("expected confirmed checkout");
    };

    // New shopping after checkout must not touch the recorded order.
    ctx.cart.add_item(&book("a", dec!(100)), 5).await.unwrap();
    ctx.cart
        .update_quantity(&ItemId::new("a"), 9)
        .await
        .unwrap();

    let order = ctx.orders.get(&order_id).await.unwrap();
    assert_eq!(order.lines.first().unwrap().quantity, 2);
    assert_eq!(order.total.amount, dec!(200));
}

#[tokio::test]
async fn test_order_id_is_the_idempotency_key_for_both_gateways() {
    let ctx = TestContext::new();
    ctx.cart.add_item(&book("a", dec!(100)), 1).await.unwrap();

    let outcome = ctx
        .checkout
        .place_order(valid_customer(), PaymentMethod::Gateway)
        .await
        .unwrap();
    let CheckoutOutcome::Confirmed { order_id } = outcome else {
        panic!("expected confirmed checkout");
    };

    let keys = ctx.payments.seen_keys();
    assert_eq!(keys, vec![order_id.clone()]);

    // The fake shipment gateway derives its reference from the same key.
    let order = ctx.orders.get(&order_id).await.unwrap();
    assert_eq!(
        order.shipment.shipment_id.as_str(),
        format!("ship_{order_id}")
    );
}

// =============================================================================
// Cash on delivery
// =============================================================================

#[tokio::test]
async fn test_cod_checkout_bypasses_payment_gateway() {
    let ctx = TestContext::new();
    ctx.cart.add_item(&book("a", dec!(100)), 1).await.unwrap();

    let outcome = ctx
        .checkout
        .place_order(valid_customer(), PaymentMethod::CashOnDelivery)
        .await
        .unwrap();

    let CheckoutOutcome::Confirmed { order_id } = outcome else {
        panic!("expected confirmed checkout");
    };
    assert_eq!(ctx.payments.create_calls(), 0);
    assert_eq!(ctx.shipments.create_calls(), 1);

    let order = ctx.orders.get(&order_id).await.unwrap();
    assert_eq!(order.payment.method, PaymentMethod::CashOnDelivery);
    assert!(order.payment.payment_id.is_none());
    assert_eq!(order.payment.status, PaymentStatus::Created);
}

// =============================================================================
// Payment failure
// =============================================================================

#[tokio::test]
async fn test_payment_timeout_leaves_cart_intact_and_skips_shipment() {
    let ctx = TestContext::with_behavior(Behavior::Timeout, Behavior::Succeed);
    ctx.cart.add_item(&book("a", dec!(100)), 2).await.unwrap();

    let outcome = ctx
        .checkout
        .place_order(valid_customer(), PaymentMethod::Gateway)
        .await
        .unwrap();

    let CheckoutOutcome::PaymentFailed { error, .. } = outcome else {
        panic!("expected payment failure, got {outcome:?}");
    };
    assert!(matches!(error, GatewayError::Timeout));

    // No shipment call was made and nothing was recorded.
    assert_eq!(ctx.shipments.create_calls(), 0);
    assert!(ctx.orders.list().await.is_empty());

    // The cart is untouched so the shopper can retry.
    assert_eq!(ctx.cart.item_count().await, 2);
}

#[tokio::test]
async fn test_payment_rejection_reports_gateway_status() {
    let ctx = TestContext::with_behavior(Behavior::Reject, Behavior::Succeed);
    ctx.cart.add_item(&book("a", dec!(100)), 1).await.unwrap();

    let outcome = ctx
        .checkout
        .place_order(valid_customer(), PaymentMethod::Gateway)
        .await
        .unwrap();

    let CheckoutOutcome::PaymentFailed { error, .. } = outcome else {
        panic!("expected payment failure");
    };
    assert!(matches!(error, GatewayError::Rejected { status: 502, .. }));
}

// =============================================================================
// Partial failure
// =============================================================================

#[tokio::test]
async fn test_shipment_failure_after_payment_is_a_distinct_outcome() {
    let ctx = TestContext::with_behavior(Behavior::Succeed, Behavior::Reject);
    ctx.cart.add_item(&book("a", dec!(100)), 1).await.unwrap();

    let outcome = ctx
        .checkout
        .place_order(valid_customer(), PaymentMethod::Gateway)
        .await
        .unwrap();

    // Not a PaymentFailed: the payment step did succeed and its reference
    // must be preserved for operator follow-up.
    let CheckoutOutcome::PartialFailure { payment, error, .. } = outcome else {
        panic!("expected partial failure, got {outcome:?}");
    };
    assert!(payment.payment_id.is_some());
    assert!(matches!(error, GatewayError::Rejected { .. }));
    assert_eq!(ctx.payments.create_calls(), 1);
    assert_eq!(ctx.shipments.create_calls(), 1);

    // No order is recorded and the cart stays intact.
    assert!(ctx.orders.list().await.is_empty());
    assert_eq!(ctx.cart.item_count().await, 1);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_empty_cart_checkout_is_rejected_before_any_gateway_call() {
    let ctx = TestContext::new();

    let result = ctx
        .checkout
        .place_order(valid_customer(), PaymentMethod::Gateway)
        .await;

    assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    assert_eq!(ctx.payments.create_calls(), 0);
    assert_eq!(ctx.shipments.create_calls(), 0);
}

#[tokio::test]
async fn test_incomplete_customer_details_are_rejected_before_any_gateway_call() {
    let ctx = TestContext::new();
    ctx.cart.add_item(&book("a", dec!(100)), 1).await.unwrap();

    let mut customer = valid_customer();
    customer.phone = "12345".to_owned();
    let result = ctx
        .checkout
        .place_order(customer, PaymentMethod::Gateway)
        .await;

    assert!(matches!(result, Err(CheckoutError::Customer(_))));
    assert_eq!(ctx.payments.create_calls(), 0);
    assert_eq!(ctx.shipments.create_calls(), 0);
    assert_eq!(ctx.cart.item_count().await, 1);
}
