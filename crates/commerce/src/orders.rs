//! Persisted orders and their evolving status.
//!
//! The [`OrderStore`] is the single source of truth for administrative
//! display. Manual status overrides never re-validate against the gateways;
//! reconciliation ([`OrderStore::check_payment_status`],
//! [`OrderStore::refresh_tracking`]) is pull-based and user/admin
//! triggered, with last-write-wins semantics between concurrent checks.

use std::sync::Arc;

use ataka_core::{
    OrderId, OrderStatus, PaymentId, PaymentInstrument, PaymentMethod, PaymentStatus, Price,
    ShipmentId, ShipmentStatus, TransactionId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::cart::CartLine;
use crate::customer::CustomerDetails;
use crate::gateway::{
    GatewayError, PaymentGateway, PaymentStatusReport, Shipment, ShipmentGateway, Stage,
    TrackingEvent, TrackingReport,
};
use crate::storage::{StorageBackend, StorageError};

/// Storage key for the persisted order collection.
const ORDERS_KEY: &str = "orders";

/// Errors from order-store operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order with the given id.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The order was paid on delivery; there is no gateway payment to query.
    #[error("order {0} has no gateway payment to reconcile")]
    NoGatewayPayment(OrderId),

    /// Persisting the order collection failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A reconciliation query against a gateway failed.
    #[error("{stage} gateway error: {source}")]
    Gateway {
        /// Which gateway failed.
        stage: Stage,
        /// The underlying adapter error.
        #[source]
        source: GatewayError,
    },
}

/// Payment state frozen into an order, refreshed by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Gateway payment reference. `None` for cash-on-delivery orders.
    pub payment_id: Option<PaymentId>,
    /// Amount the order was placed for.
    pub amount: Price,
    /// Current payment status.
    pub status: PaymentStatus,
    /// How the customer chose to pay.
    pub method: PaymentMethod,
    /// Instrument used, once reported by the gateway.
    pub instrument: Option<PaymentInstrument>,
    /// Gateway transaction reference, once captured.
    pub transaction_id: Option<TransactionId>,
}

/// Shipment state frozen into an order, refreshed by tracking queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    /// Gateway shipment reference.
    pub shipment_id: ShipmentId,
    /// Current shipment status.
    pub status: ShipmentStatus,
    /// Courier tracking number, once assigned.
    pub tracking_number: Option<String>,
    /// Courier company name.
    pub courier: Option<String>,
    /// Estimated delivery date.
    pub estimated_delivery: Option<DateTime<Utc>>,
    /// Tracking events seen so far, oldest first.
    pub history: Vec<TrackingEvent>,
}

impl From<Shipment> for ShipmentRecord {
    fn from(shipment: Shipment) -> Self {
        Self {
            shipment_id: shipment.id,
            status: shipment.status,
            tracking_number: shipment.tracking_number,
            courier: shipment.courier,
            estimated_delivery: shipment.estimated_delivery,
            history: Vec::new(),
        }
    }
}

/// A confirmed order.
///
/// The lines are a frozen copy taken at checkout; later cart mutations
/// never touch them. Orders are never deleted - cancellation is a status
/// transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order reference; also the idempotency key used with both gateways.
    pub id: OrderId,
    /// When the order was confirmed.
    pub created_at: DateTime<Utc>,
    /// Customer and shipping details as entered at checkout.
    pub customer: CustomerDetails,
    /// Frozen copy of the cart lines.
    pub lines: Vec<CartLine>,
    /// Order total as charged.
    pub total: Price,
    /// Payment state.
    pub payment: PaymentRecord,
    /// Shipment state.
    pub shipment: ShipmentRecord,
    /// Composite status for administrative display.
    pub status: OrderStatus,
    /// Free-form operator notes.
    pub notes: Option<String>,
}

/// Persists created orders and their evolving status.
pub struct OrderStore {
    storage: Arc<dyn StorageBackend>,
    orders: RwLock<Vec<Order>>,
}

impl OrderStore {
    /// Create a store with an empty collection, without touching storage.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            orders: RwLock::new(Vec::new()),
        }
    }

    /// Create a store rehydrated from the persistence port.
    ///
    /// Malformed or unreadable persisted data degrades to an empty
    /// collection; corruption is logged, never surfaced to the caller.
    #[instrument(skip(storage))]
    pub async fn load(storage: Arc<dyn StorageBackend>) -> Self {
        let orders = match storage.load(ORDERS_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<Order>>(value) {
                Ok(orders) => orders,
                Err(e) => {
                    warn!(error = %e, "Persisted orders are malformed, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to load persisted orders, starting empty");
                Vec::new()
            }
        };

        Self {
            storage,
            orders: RwLock::new(orders),
        }
    }

    /// Append a newly confirmed order and persist the collection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if persisting fails.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn record(&self, order: Order) -> Result<(), StorageError> {
        self.orders.write().await.push(order);
        self.persist().await
    }

    /// Look up one order by id.
    pub async fn get(&self, order_id: &OrderId) -> Option<Order> {
        self.orders
            .read()
            .await
            .iter()
            .find(|order| &order.id == order_id)
            .cloned()
    }

    /// All orders, newest first.
    pub async fn list(&self) -> Vec<Order> {
        let mut orders = self.orders.read().await.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Overwrite an order's composite status.
    ///
    /// This is a manual override for administrative tooling; it does not
    /// re-validate against the payment or shipment gateways.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] for an unknown id, or
    /// [`OrderError::Storage`] if persisting fails.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let updated = {
            let mut orders = self.orders.write().await;
            let order = find_mut(&mut orders, order_id)?;
            order.status = status;
            order.clone()
        };

        info!(order_id = %order_id, status = %status, "Order status updated");
        self.persist().await?;
        Ok(updated)
    }

    /// Replace an order's operator notes.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] for an unknown id, or
    /// [`OrderError::Storage`] if persisting fails.
    #[instrument(skip(self, notes))]
    pub async fn set_notes(
        &self,
        order_id: &OrderId,
        notes: impl Into<String> + Send,
    ) -> Result<(), OrderError> {
        {
            let mut orders = self.orders.write().await;
            let order = find_mut(&mut orders, order_id)?;
            order.notes = Some(notes.into());
        }
        self.persist().await?;
        Ok(())
    }

    /// Pull-based payment reconciliation.
    ///
    /// Queries the payment gateway for the order's live payment status,
    /// overwrites the stored [`PaymentRecord`] and returns the report. Two
    /// concurrent checks of the same order have no ordering guarantee
    /// beyond last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] for an unknown id,
    /// [`OrderError::NoGatewayPayment`] for cash-on-delivery orders,
    /// [`OrderError::Gateway`] if the gateway query fails, or
    /// [`OrderError::Storage`] if persisting fails.
    #[instrument(skip(self, gateway))]
    pub async fn check_payment_status(
        &self,
        order_id: &OrderId,
        gateway: &dyn PaymentGateway,
    ) -> Result<PaymentStatusReport, OrderError> {
        let payment_id = {
            let orders = self.orders.read().await;
            let order = find(&orders, order_id)?;
            order
                .payment
                .payment_id
                .clone()
                .ok_or_else(|| OrderError::NoGatewayPayment(order_id.clone()))?
        };

        let report = gateway
            .payment_status(&payment_id)
            .await
            .map_err(|source| OrderError::Gateway {
                stage: Stage::Payment,
                source,
            })?;

        {
            let mut orders = self.orders.write().await;
            let order = find_mut(&mut orders, order_id)?;
            order.payment.status = report.status;
            order.payment.instrument = Some(report.instrument);
            order.payment.transaction_id = report.transaction_id.clone();
        }

        info!(order_id = %order_id, status = ?report.status, "Payment status reconciled");
        self.persist().await?;
        Ok(report)
    }

    /// Pull-based shipment reconciliation.
    ///
    /// Queries the shipping gateway for live tracking state, overwrites the
    /// stored [`ShipmentRecord`] status and history, and returns the
    /// report.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] for an unknown id,
    /// [`OrderError::Gateway`] if the gateway query fails, or
    /// [`OrderError::Storage`] if persisting fails.
    #[instrument(skip(self, gateway))]
    pub async fn refresh_tracking(
        &self,
        order_id: &OrderId,
        gateway: &dyn ShipmentGateway,
    ) -> Result<TrackingReport, OrderError> {
        let shipment_id = {
            let orders = self.orders.read().await;
            find(&orders, order_id)?.shipment.shipment_id.clone()
        };

        let report = gateway
            .tracking(&shipment_id)
            .await
            .map_err(|source| OrderError::Gateway {
                stage: Stage::Shipment,
                source,
            })?;

        {
            let mut orders = self.orders.write().await;
            let order = find_mut(&mut orders, order_id)?;
            order.shipment.status = report.status;
            order.shipment.history = report.history.clone();
        }

        self.persist().await?;
        Ok(report)
    }

    /// Persist the full collection under the `orders` key.
    async fn persist(&self) -> Result<(), StorageError> {
        let orders = self.orders.read().await.clone();
        let value = serde_json::to_value(&orders)?;
        self.storage.save(ORDERS_KEY, &value).await
    }
}

fn find<'a>(orders: &'a [Order], order_id: &OrderId) -> Result<&'a Order, OrderError> {
    orders
        .iter()
        .find(|order| &order.id == order_id)
        .ok_or_else(|| OrderError::NotFound(order_id.clone()))
}

fn find_mut<'a>(orders: &'a mut [Order], order_id: &OrderId) -> Result<&'a mut Order, OrderError> {
    orders
        .iter_mut()
        .find(|order| &order.id == order_id)
        .ok_or_else(|| OrderError::NotFound(order_id.clone()))
}
