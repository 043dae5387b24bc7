//! Payment and shipment gateway contracts.
//!
//! The commerce core talks to the payment gateway (Razorpay) and the
//! shipping gateway (Shiprocket) only through the [`PaymentGateway`] and
//! [`ShipmentGateway`] traits; it never depends on a specific gateway's
//! wire format. Tests substitute fakes implementing the same contracts.
//!
//! # Idempotency
//!
//! Every create operation takes the order reference as an idempotency key.
//! Any real adapter must make a retried call with the same key safe from
//! duplicate effect: no double charges, no duplicate shipments. The
//! adapter-level timeout is the only cancellation mechanism for an
//! in-flight call.

pub mod razorpay;
pub mod shiprocket;

pub use razorpay::RazorpayGateway;
pub use shiprocket::ShiprocketGateway;

use async_trait::async_trait;
use ataka_core::{
    ItemId, OrderId, PaymentId, PaymentInstrument, PaymentMethod, PaymentStatus, Price, RefundId,
    ShipmentId, ShipmentStatus, TransactionId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::customer::CustomerDetails;

/// Which external stage an adapter error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The payment gateway.
    Payment,
    /// The shipping gateway.
    Shipment,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Payment => write!(f, "payment"),
            Self::Shipment => write!(f, "shipment"),
        }
    }
}

/// Errors that can occur when talking to an external gateway.
///
/// These never escape the orchestrator boundary as panics; checkout maps
/// them into discriminated failure outcomes.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request did not complete within the adapter timeout.
    #[error("gateway call timed out")]
    Timeout,

    /// Network-level failure.
    #[error("gateway transport error: {0}")]
    Http(reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The gateway response could not be decoded.
    #[error("gateway response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

// =============================================================================
// Payment gateway
// =============================================================================

/// A payment order created at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Gateway reference for the payment.
    pub id: PaymentId,
    /// Amount and currency the gateway will collect.
    pub amount: Price,
    /// Payment status at creation time (normally `created`).
    pub status: PaymentStatus,
    /// When the gateway created the order.
    pub created_at: DateTime<Utc>,
}

/// Live payment status as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    /// Gateway reference for the payment.
    pub payment_id: PaymentId,
    /// Current status.
    pub status: PaymentStatus,
    /// Instrument used, once an attempt was made.
    pub instrument: PaymentInstrument,
    /// Gateway transaction reference, once captured.
    pub transaction_id: Option<TransactionId>,
}

/// Acknowledgement of a refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    /// Gateway reference for the refund.
    pub refund_id: RefundId,
    /// Gateway-reported refund status (e.g. `processed`).
    pub status: String,
}

/// Capability contract for the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment order for `amount`.
    ///
    /// `idempotency_key` is the order reference; retrying with the same key
    /// must not create a second charge.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on timeout, transport failure or gateway
    /// rejection.
    async fn create_order(
        &self,
        amount: Price,
        idempotency_key: &OrderId,
    ) -> Result<PaymentOrder, GatewayError>;

    /// Query the live status of a payment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on timeout, transport failure or gateway
    /// rejection.
    async fn payment_status(
        &self,
        payment_id: &PaymentId,
    ) -> Result<PaymentStatusReport, GatewayError>;

    /// Request a refund; `amount` of `None` refunds the full payment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on timeout, transport failure or gateway
    /// rejection.
    async fn refund(
        &self,
        payment_id: &PaymentId,
        amount: Option<Price>,
    ) -> Result<RefundReceipt, GatewayError>;
}

// =============================================================================
// Shipment gateway
// =============================================================================

/// One order line in a shipment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentItem {
    /// Display name.
    pub name: String,
    /// Catalog identifier, used as the SKU.
    pub sku: ItemId,
    /// Number of units.
    pub units: u32,
    /// Per-unit selling price.
    pub selling_price: Price,
}

/// Everything the shipping gateway needs to create a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    /// Order reference; doubles as the idempotency key.
    pub order_id: OrderId,
    /// Recipient name, contact and address.
    pub customer: CustomerDetails,
    /// Whether the shipment is prepaid or collect-on-delivery.
    pub payment_method: PaymentMethod,
    /// Lines being shipped.
    pub items: Vec<ShipmentItem>,
    /// Order subtotal, declared to the courier.
    pub subtotal: Price,
}

/// A shipment record created at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    /// Gateway reference for the shipment.
    pub id: ShipmentId,
    /// Shipment status at creation time.
    pub status: ShipmentStatus,
    /// Courier tracking number, once assigned.
    pub tracking_number: Option<String>,
    /// Courier company name.
    pub courier: Option<String>,
    /// Estimated delivery date.
    pub estimated_delivery: Option<DateTime<Utc>>,
}

/// One event in a shipment's tracking history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Status at this point in the journey.
    pub status: ShipmentStatus,
    /// Location reported by the courier.
    pub location: Option<String>,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Free-form courier comment.
    pub comment: Option<String>,
}

/// Live tracking state as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingReport {
    /// Gateway reference for the shipment.
    pub shipment_id: ShipmentId,
    /// Current status.
    pub status: ShipmentStatus,
    /// Last known location.
    pub current_location: Option<String>,
    /// Journey so far, oldest first.
    pub history: Vec<TrackingEvent>,
}

/// Acknowledgement of a shipment cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReceipt {
    /// Gateway reference for the shipment.
    pub shipment_id: ShipmentId,
    /// Status after cancellation.
    pub status: ShipmentStatus,
    /// When the gateway recorded the cancellation.
    pub cancelled_at: DateTime<Utc>,
}

/// Capability contract for the shipping gateway.
#[async_trait]
pub trait ShipmentGateway: Send + Sync {
    /// Create a shipment for an order.
    ///
    /// The request's `order_id` is the idempotency key; retrying with the
    /// same key must not create a second shipment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on timeout, transport failure or gateway
    /// rejection.
    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<Shipment, GatewayError>;

    /// Query live tracking state for a shipment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on timeout, transport failure or gateway
    /// rejection.
    async fn tracking(&self, shipment_id: &ShipmentId) -> Result<TrackingReport, GatewayError>;

    /// Cancel a shipment that has not left the warehouse.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on timeout, transport failure or gateway
    /// rejection.
    async fn cancel(
        &self,
        shipment_id: &ShipmentId,
        reason: Option<&str>,
    ) -> Result<CancellationReceipt, GatewayError>;
}
