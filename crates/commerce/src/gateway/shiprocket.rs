//! Shiprocket shipping gateway adapter.
//!
//! Implements [`ShipmentGateway`] against Shiprocket's order/tracking API.
//! The order reference travels as the channel order id, which Shiprocket
//! de-duplicates on, so a retried create with the same reference does not
//! produce a second shipment.

use std::sync::Arc;
use std::time::Duration;

use ataka_core::{PaymentMethod, ShipmentId, ShipmentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{instrument, warn};

use super::{
    CancellationReceipt, GatewayError, Shipment, ShipmentGateway, ShipmentRequest, TrackingEvent,
    TrackingReport,
};
use crate::config::{ShiprocketConfig, expose};

/// Shiprocket REST API client.
#[derive(Clone)]
pub struct ShiprocketGateway {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    token: secrecy::SecretString,
    endpoint: String,
    pickup_location: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    shipment_id: serde_json::Value,
    status: String,
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    courier_company: Option<String>,
    #[serde(default)]
    estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TrackEvent {
    status: String,
    #[serde(default)]
    location: Option<String>,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    status: String,
    #[serde(default)]
    current_location: Option<String>,
    #[serde(default)]
    history: Vec<TrackEvent>,
}

#[derive(Debug, Deserialize)]
struct CancelResponse {
    status: String,
    cancelled_at: DateTime<Utc>,
}

impl ShiprocketGateway {
    /// Create a new Shiprocket API client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &ShiprocketConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(Inner {
                client,
                token: config.token.clone(),
                endpoint: config.endpoint.trim_end_matches('/').to_owned(),
                pickup_location: config.pickup_location.clone(),
            }),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ShipmentGateway for ShiprocketGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<Shipment, GatewayError> {
        let customer = &request.customer;
        let body = serde_json::json!({
            "order_id": request.order_id.as_str(),
            "order_date": Utc::now().to_rfc3339(),
            "pickup_location": self.inner.pickup_location,
            "billing_customer_name": customer.name,
            "billing_address": customer.address,
            "billing_city": customer.city,
            "billing_state": customer.state,
            "billing_country": "India",
            "billing_pin_code": customer.postal_code,
            "billing_email": customer.email.as_str(),
            "billing_phone": customer.phone,
            "shipping_is_billing": true,
            "payment_method": match request.payment_method {
                PaymentMethod::CashOnDelivery => "COD",
                PaymentMethod::Gateway => "Prepaid",
            },
            "sub_total": request.subtotal.amount,
            "order_items": request
                .items
                .iter()
                .map(|item| {
                    serde_json::json!({
                        "name": item.name,
                        "sku": item.sku.as_str(),
                        "units": item.units,
                        "selling_price": item.selling_price.amount,
                    })
                })
                .collect::<Vec<_>>(),
        });

        let response = self
            .inner
            .client
            .post(format!("{}/shipments", self.inner.endpoint))
            .bearer_auth(expose(&self.inner.token))
            .json(&body)
            .send()
            .await?;

        let created: CreateResponse = Self::decode(response).await?;

        Ok(Shipment {
            id: shipment_id(&created.shipment_id),
            status: parse_shipment_status(&created.status, ShipmentStatus::Created),
            tracking_number: created.tracking_number,
            courier: created.courier_company,
            estimated_delivery: created.estimated_delivery,
        })
    }

    #[instrument(skip(self))]
    async fn tracking(&self, shipment_id: &ShipmentId) -> Result<TrackingReport, GatewayError> {
        let response = self
            .inner
            .client
            .get(format!(
                "{}/shipments/{}/track",
                self.inner.endpoint, shipment_id
            ))
            .bearer_auth(expose(&self.inner.token))
            .send()
            .await?;

        let track: TrackResponse = Self::decode(response).await?;

        Ok(TrackingReport {
            shipment_id: shipment_id.clone(),
            status: parse_shipment_status(&track.status, ShipmentStatus::InTransit),
            current_location: track.current_location,
            history: track
                .history
                .into_iter()
                .map(|event| TrackingEvent {
                    status: parse_shipment_status(&event.status, ShipmentStatus::InTransit),
                    location: event.location,
                    timestamp: event.timestamp,
                    comment: event.comment,
                })
                .collect(),
        })
    }

    #[instrument(skip(self))]
    async fn cancel(
        &self,
        shipment_id: &ShipmentId,
        reason: Option<&str>,
    ) -> Result<CancellationReceipt, GatewayError> {
        let body = serde_json::json!({
            "reason": reason.unwrap_or("Cancelled by seller"),
        });

        let response = self
            .inner
            .client
            .post(format!(
                "{}/shipments/{}/cancel",
                self.inner.endpoint, shipment_id
            ))
            .bearer_auth(expose(&self.inner.token))
            .json(&body)
            .send()
            .await?;

        let cancelled: CancelResponse = Self::decode(response).await?;

        Ok(CancellationReceipt {
            shipment_id: shipment_id.clone(),
            status: parse_shipment_status(&cancelled.status, ShipmentStatus::Cancelled),
            cancelled_at: cancelled.cancelled_at,
        })
    }
}

// =============================================================================
// Wire conversions
// =============================================================================

/// Shiprocket returns numeric ids on some endpoints and strings on others.
fn shipment_id(value: &serde_json::Value) -> ShipmentId {
    match value {
        serde_json::Value::String(s) => ShipmentId::new(s.clone()),
        other => ShipmentId::new(other.to_string()),
    }
}

fn parse_shipment_status(status: &str, fallback: ShipmentStatus) -> ShipmentStatus {
    match status.to_ascii_lowercase().as_str() {
        "created" | "new" => ShipmentStatus::Created,
        "picked_up" | "picked up" => ShipmentStatus::PickedUp,
        "in_transit" | "in transit" => ShipmentStatus::InTransit,
        "out_for_delivery" | "out for delivery" => ShipmentStatus::OutForDelivery,
        "delivered" => ShipmentStatus::Delivered,
        "cancelled" | "canceled" => ShipmentStatus::Cancelled,
        other => {
            warn!(status = other, "Unknown shipment status from gateway");
            fallback
        }
    }
}
