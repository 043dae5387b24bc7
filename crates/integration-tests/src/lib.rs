//! Shared test harness for the commerce core.
//!
//! Provides configurable fake gateways implementing the real
//! [`PaymentGateway`]/[`ShipmentGateway`] contracts, plus a [`TestContext`]
//! that wires a full cart + orders + checkout stack over in-memory storage.
//!
//! The fakes count their calls so tests can assert which checkout stages
//! actually ran (e.g. that a payment failure short-circuits before any
//! shipment call).

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use ataka_commerce::cart::CartStore;
use ataka_commerce::catalog::CatalogItem;
use ataka_commerce::checkout::CheckoutService;
use ataka_commerce::customer::CustomerDetails;
use ataka_commerce::gateway::{
    CancellationReceipt, GatewayError, PaymentGateway, PaymentOrder, PaymentStatusReport,
    RefundReceipt, Shipment, ShipmentGateway, ShipmentRequest, TrackingReport,
};
use ataka_commerce::orders::OrderStore;
use ataka_commerce::storage::MemoryStore;
use ataka_core::{
    CurrencyCode, Email, ItemId, OrderId, PaymentId, PaymentInstrument, PaymentStatus, Price,
    RefundId, ShipmentId, ShipmentStatus, TransactionId,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

static INIT_TRACING: Once = Once::new();

/// Initialise test logging once per process. Safe to call from every test.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// How a fake gateway responds to its create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Every call succeeds.
    Succeed,
    /// Every call times out.
    Timeout,
    /// Every call is rejected with an HTTP 502.
    Reject,
}

fn failure(behavior: Behavior) -> GatewayError {
    match behavior {
        Behavior::Timeout => GatewayError::Timeout,
        _ => GatewayError::Rejected {
            status: 502,
            message: "upstream unavailable".to_owned(),
        },
    }
}

// =============================================================================
// Fake payment gateway
// =============================================================================

/// In-memory stand-in for the payment gateway.
pub struct FakePaymentGateway {
    behavior: Behavior,
    create_calls: AtomicUsize,
    status_calls: AtomicUsize,
    /// Status the fake reports from `payment_status`.
    reported_status: Mutex<PaymentStatus>,
    /// Order references seen by `create_order`, in call order.
    seen_keys: Mutex<Vec<OrderId>>,
}

impl FakePaymentGateway {
    #[must_use]
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            reported_status: Mutex::new(PaymentStatus::Paid),
            seen_keys: Mutex::new(Vec::new()),
        }
    }

    /// Set the status returned by subsequent `payment_status` calls.
    pub fn report_status(&self, status: PaymentStatus) {
        *self.reported_status.lock().unwrap() = status;
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Idempotency keys observed by `create_order`.
    #[must_use]
    pub fn seen_keys(&self) -> Vec<OrderId> {
        self.seen_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn create_order(
        &self,
        amount: Price,
        idempotency_key: &OrderId,
    ) -> Result<PaymentOrder, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_keys.lock().unwrap().push(idempotency_key.clone());

        if self.behavior != Behavior::Succeed {
            return Err(failure(self.behavior));
        }

        Ok(PaymentOrder {
            id: PaymentId::new(format!("pay_{idempotency_key}")),
            amount,
            status: PaymentStatus::Created,
            created_at: Utc::now(),
        })
    }

    async fn payment_status(
        &self,
        payment_id: &PaymentId,
    ) -> Result<PaymentStatusReport, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        if self.behavior != Behavior::Succeed {
            return Err(failure(self.behavior));
        }

        let status = *self.reported_status.lock().unwrap();
        Ok(PaymentStatusReport {
            payment_id: payment_id.clone(),
            status,
            instrument: PaymentInstrument::Upi,
            transaction_id: Some(TransactionId::new(format!("txn_{payment_id}"))),
        })
    }

    async fn refund(
        &self,
        payment_id: &PaymentId,
        _amount: Option<Price>,
    ) -> Result<RefundReceipt, GatewayError> {
        if self.behavior != Behavior::Succeed {
            return Err(failure(self.behavior));
        }

        Ok(RefundReceipt {
            refund_id: RefundId::new(format!("rfnd_{payment_id}")),
            status: "processed".to_owned(),
        })
    }
}

// =============================================================================
// Fake shipment gateway
// =============================================================================

/// In-memory stand-in for the shipping gateway.
pub struct FakeShipmentGateway {
    behavior: Behavior,
    create_calls: AtomicUsize,
    tracking_calls: AtomicUsize,
    /// Status the fake reports from `tracking`.
    reported_status: Mutex<ShipmentStatus>,
}

impl FakeShipmentGateway {
    #[must_use]
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            create_calls: AtomicUsize::new(0),
            tracking_calls: AtomicUsize::new(0),
            reported_status: Mutex::new(ShipmentStatus::InTransit),
        }
    }

    /// Set the status returned by subsequent `tracking` calls.
    pub fn report_status(&self, status: ShipmentStatus) {
        *self.reported_status.lock().unwrap() = status;
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn tracking_calls(&self) -> usize {
        self.tracking_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShipmentGateway for FakeShipmentGateway {
    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<Shipment, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.behavior != Behavior::Succeed {
            return Err(failure(self.behavior));
        }

        Ok(Shipment {
            id: ShipmentId::new(format!("ship_{}", request.order_id)),
            status: ShipmentStatus::Created,
            tracking_number: Some("TRACK123456".to_owned()),
            courier: Some("BlueDart".to_owned()),
            estimated_delivery: None,
        })
    }

    async fn tracking(&self, shipment_id: &ShipmentId) -> Result<TrackingReport, GatewayError> {
        self.tracking_calls.fetch_add(1, Ordering::SeqCst);

        if self.behavior != Behavior::Succeed {
            return Err(failure(self.behavior));
        }

        let status = *self.reported_status.lock().unwrap();
        Ok(TrackingReport {
            shipment_id: shipment_id.clone(),
            status,
            current_location: Some("Bengaluru Hub".to_owned()),
            history: Vec::new(),
        })
    }

    async fn cancel(
        &self,
        shipment_id: &ShipmentId,
        _reason: Option<&str>,
    ) -> Result<CancellationReceipt, GatewayError> {
        if self.behavior != Behavior::Succeed {
            return Err(failure(self.behavior));
        }

        Ok(CancellationReceipt {
            shipment_id: shipment_id.clone(),
            status: ShipmentStatus::Cancelled,
            cancelled_at: Utc::now(),
        })
    }
}

// =============================================================================
// Test context
// =============================================================================

/// A full commerce stack over in-memory storage and fake gateways.
pub struct TestContext {
    pub cart: Arc<CartStore>,
    pub orders: Arc<OrderStore>,
    pub payments: Arc<FakePaymentGateway>,
    pub shipments: Arc<FakeShipmentGateway>,
    pub checkout: CheckoutService,
}

impl TestContext {
    /// Both gateways succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_behavior(Behavior::Succeed, Behavior::Succeed)
    }

    #[must_use]
    pub fn with_behavior(payment: Behavior, shipment: Behavior) -> Self {
        init_tracing();

        let storage: Arc<dyn ataka_commerce::storage::StorageBackend> =
            Arc::new(MemoryStore::new());
        let cart = Arc::new(CartStore::new(Arc::clone(&storage)));
        let orders = Arc::new(OrderStore::new(storage));
        let payments = Arc::new(FakePaymentGateway::new(payment));
        let shipments = Arc::new(FakeShipmentGateway::new(shipment));
        let checkout = CheckoutService::new(
            Arc::clone(&cart),
            Arc::clone(&orders),
            Arc::clone(&payments) as Arc<dyn PaymentGateway>,
            Arc::clone(&shipments) as Arc<dyn ShipmentGateway>,
        );

        Self {
            cart,
            orders,
            payments,
            shipments,
            checkout,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A catalog book priced in INR.
#[must_use]
pub fn book(id: &str, price: Decimal) -> CatalogItem {
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

/// A customer that passes checkout validation.
#[must_use]
pub fn valid_customer() -> CustomerDetails {
    CustomerDetails {
        name: "Asha Rao".to_owned(),
        email: Email::parse("asha@example.com").unwrap(),
        phone: "9876543210".to_owned(),
        address: "12 MG Road".to_owned(),
        city: "Bengaluru".to_owned(),
        state: "Karnataka".to_owned(),
        postal_code: "560001".to_owned(),
    }
}
