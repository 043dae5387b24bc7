//! Checkout orchestration.
//!
//! One checkout attempt walks a strictly sequential state machine:
//!
//! ```text
//! Draft -> PaymentPending -> PaymentConfirmed -> ShipmentPending -> Confirmed
//!              |                                      |
//!              v                                      v
//!        PaymentFailed (terminal)           PartialFailure (terminal,
//!                                           payment already captured)
//! ```
//!
//! Shipment creation is never attempted before payment creation has
//! resolved (or was bypassed for cash on delivery), because the shipment
//! depends on the payment reference. A checkout in flight is not
//! cancellable; the adapter timeout is the only upper bound, and a
//! timed-out attempt is safe to retry because the order reference is the
//! idempotency key for both gateways.
//!
//! Gateway failures are reported as discriminated [`CheckoutOutcome`]
//! variants, never as panics or untyped errors across this boundary.

use std::sync::Arc;

use ataka_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus};
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::cart::{Cart, CartStore};
use crate::customer::{CustomerDetails, CustomerDetailsError};
use crate::gateway::{
    GatewayError, PaymentGateway, ShipmentGateway, ShipmentItem, ShipmentRequest,
};
use crate::orders::{Order, OrderStore, PaymentRecord};
use crate::storage::StorageError;

/// Failures reported before or outside the gateway calls.
///
/// Validation errors are always recoverable by user correction and are
/// raised before any external call is made.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout was attempted with an empty cart.
    #[error("cannot check out an empty cart")]
    EmptyCart,

    /// Customer details failed validation.
    #[error("invalid customer details: {0}")]
    Customer(#[from] CustomerDetailsError),

    /// Persisting the order or cart failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The result of one checkout attempt.
///
/// All three variants are expected outcomes the presentation layer must
/// render; only [`CheckoutError`] is exceptional.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// Payment and shipment both succeeded; the order is persisted and the
    /// cart has been cleared.
    Confirmed {
        /// The persisted order's reference.
        order_id: OrderId,
    },

    /// Payment creation failed; no shipment call was made and the cart is
    /// untouched so the shopper can retry.
    PaymentFailed {
        /// The attempted order reference (reusable as idempotency key on
        /// retry).
        order_id: OrderId,
        /// Why the payment gateway call failed.
        error: GatewayError,
    },

    /// Shipment creation failed after the payment step succeeded.
    ///
    /// This is the partial-failure state: for gateway payments money has
    /// moved but fulfillment has not, so it must be surfaced distinctly
    /// (operator attention, potential refund). No order is persisted and
    /// the cart is untouched. For cash on delivery no money has moved and
    /// a plain retry is safe.
    PartialFailure {
        /// The attempted order reference.
        order_id: OrderId,
        /// The payment that did succeed, including its gateway reference.
        payment: PaymentRecord,
        /// Why the shipment gateway call failed.
        error: GatewayError,
    },
}

impl CheckoutOutcome {
    /// Whether the attempt produced a confirmed order.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// Drives payment creation, shipment creation and order recording for one
/// storefront session.
///
/// Constructed once at process start and handed to the presentation layer;
/// the UI is responsible for not submitting two checkouts concurrently.
pub struct CheckoutService {
    cart: Arc<CartStore>,
    orders: Arc<OrderStore>,
    payments: Arc<dyn PaymentGateway>,
    shipments: Arc<dyn ShipmentGateway>,
}

impl CheckoutService {
    /// Wire up the orchestrator with its collaborators.
    #[must_use]
    pub fn new(
        cart: Arc<CartStore>,
        orders: Arc<OrderStore>,
        payments: Arc<dyn PaymentGateway>,
        shipments: Arc<dyn ShipmentGateway>,
    ) -> Self {
        Self {
            cart,
            orders,
            payments,
            shipments,
        }
    }

    /// Convert the current cart into an order.
    ///
    /// Validates first (no external calls on validation failure), then
    /// creates the payment (unless cash on delivery), then the shipment,
    /// then persists the order and clears the cart. The total handed to
    /// the payment gateway is exactly the cart's derived total at call
    /// time; pricing is never recomputed here.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] for validation failures and storage
    /// failures. Gateway failures are reported inside the
    /// [`CheckoutOutcome`], not as errors.
    #[instrument(skip(self, customer), fields(method = ?method))]
    pub async fn place_order(
        &self,
        customer: CustomerDetails,
        method: PaymentMethod,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        // Draft: validate before any external call.
        let snapshot = self.cart.snapshot().await;
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        customer.validate()?;

        let order_id = OrderId::generate();
        let total = snapshot.total();

        // PaymentPending -> PaymentConfirmed | PaymentFailed.
        let payment = match method {
            PaymentMethod::Gateway => {
                match self.payments.create_order(total, &order_id).await {
                    Ok(payment_order) => PaymentRecord {
                        payment_id: Some(payment_order.id),
                        amount: total,
                        status: payment_order.status,
                        method,
                        instrument: None,
                        transaction_id: None,
                    },
                    Err(e) => {
                        error!(order_id = %order_id, error = %e, "Payment creation failed");
                        return Ok(CheckoutOutcome::PaymentFailed { order_id, error: e });
                    }
                }
            }
            // Cash on delivery bypasses the payment gateway; the courier
            // collects and the payment stays pending until delivery.
            PaymentMethod::CashOnDelivery => PaymentRecord {
                payment_id: None,
                amount: total,
                status: PaymentStatus::Created,
                method,
                instrument: None,
                transaction_id: None,
            },
        };

        // ShipmentPending -> Confirmed | PartialFailure.
        let request = shipment_request(&order_id, &customer, method, &snapshot);
        let shipment = match self.shipments.create_shipment(&request).await {
            Ok(shipment) => shipment,
            Err(e) => {
                warn!(
                    order_id = %order_id,
                    payment_ref = ?payment.payment_id,
                    error = %e,
                    "Shipment creation failed after payment step; reporting partial failure"
                );
                return Ok(CheckoutOutcome::PartialFailure {
                    order_id,
                    payment,
                    error: e,
                });
            }
        };

        // Confirmed: freeze the lines, persist, then clear the cart.
        let order = Order {
            id: order_id.clone(),
            created_at: Utc::now(),
            customer,
            lines: snapshot.lines,
            total,
            payment,
            shipment: shipment.into(),
            status: OrderStatus::Processing,
            notes: None,
        };
        self.orders.record(order).await?;

        if let Err(e) = self.cart.clear().await {
            // The order exists and money may have moved; a stale cart is
            // recoverable on the next session load, so don't fail checkout.
            warn!(order_id = %order_id, error = %e, "Failed to clear cart after checkout");
        }

        info!(order_id = %order_id, "Order confirmed");
        Ok(CheckoutOutcome::Confirmed { order_id })
    }
}

/// Build the shipping gateway request from the frozen cart snapshot.
fn shipment_request(
    order_id: &OrderId,
    customer: &CustomerDetails,
    method: PaymentMethod,
    cart: &Cart,
) -> ShipmentRequest {
    ShipmentRequest {
        order_id: order_id.clone(),
        customer: customer.clone(),
        payment_method: method,
        items: cart
            .lines
            .iter()
            .map(|line| ShipmentItem {
                name: line.title.clone(),
                sku: line.item_id.clone(),
                units: line.quantity,
                selling_price: line.unit_price,
            })
            .collect(),
        subtotal: cart.total(),
    }
}
