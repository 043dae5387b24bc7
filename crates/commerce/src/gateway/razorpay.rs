//! Razorpay payment gateway adapter.
//!
//! Implements [`PaymentGateway`] against Razorpay's Orders API. The order
//! reference is sent as the `receipt`, which Razorpay de-duplicates on, so
//! retrying a timed-out create with the same reference does not produce a
//! second charge.

use std::sync::Arc;
use std::time::Duration;

use ataka_core::{
    CurrencyCode, OrderId, PaymentId, PaymentInstrument, PaymentStatus, Price, RefundId,
    TransactionId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{instrument, warn};

use super::{GatewayError, PaymentGateway, PaymentOrder, PaymentStatusReport, RefundReceipt};
use crate::config::{RazorpayConfig, expose};

/// Razorpay REST API client.
#[derive(Clone)]
pub struct RazorpayGateway {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    key_id: String,
    key_secret: secrecy::SecretString,
    endpoint: String,
}

/// Wire shape of a Razorpay order.
#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    /// Amount in the smallest currency unit (paise for INR).
    amount: i64,
    currency: String,
    status: String,
    /// Unix timestamp.
    created_at: i64,
}

/// Wire shape of one captured/attempted payment against an order.
#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    status: String,
    #[serde(default)]
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentCollection {
    #[serde(default)]
    items: Vec<PaymentEntity>,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    status: String,
}

impl RazorpayGateway {
    /// Create a new Razorpay API client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &RazorpayConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(Inner {
                client,
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
                endpoint: config.endpoint.trim_end_matches('/').to_owned(),
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
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self), fields(order_id = %idempotency_key))]
    async fn create_order(
        &self,
        amount: Price,
        idempotency_key: &OrderId,
    ) -> Result<PaymentOrder, GatewayError> {
        let body = serde_json::json!({
            "amount": to_minor_units(amount.amount),
            "currency": amount.currency.code(),
            "receipt": idempotency_key.as_str(),
        });

        let response = self
            .inner
            .client
            .post(format!("{}/orders", self.inner.endpoint))
            .basic_auth(&self.inner.key_id, Some(expose(&self.inner.key_secret)))
            .json(&body)
            .send()
            .await?;

        let order: OrderResponse = Self::decode(response).await?;

        Ok(PaymentOrder {
            id: PaymentId::new(order.id),
            amount: Price::new(
                from_minor_units(order.amount),
                parse_currency(&order.currency, amount.currency),
            ),
            status: parse_payment_status(&order.status),
            created_at: timestamp(order.created_at),
        })
    }

    #[instrument(skip(self))]
    async fn payment_status(
        &self,
        payment_id: &PaymentId,
    ) -> Result<PaymentStatusReport, GatewayError> {
        let response = self
            .inner
            .client
            .get(format!(
                "{}/orders/{}/payments",
                self.inner.endpoint, payment_id
            ))
            .basic_auth(&self.inner.key_id, Some(expose(&self.inner.key_secret)))
            .send()
            .await?;

        let collection: PaymentCollection = Self::decode(response).await?;

        // No attempt yet: the order exists but nothing was paid against it.
        let Some(latest) = collection.items.last() else {
            return Ok(PaymentStatusReport {
                payment_id: payment_id.clone(),
                status: PaymentStatus::Created,
                instrument: PaymentInstrument::Other,
                transaction_id: None,
            });
        };

        Ok(PaymentStatusReport {
            payment_id: payment_id.clone(),
            status: parse_payment_status(&latest.status),
            instrument: latest
                .method
                .as_deref()
                .map_or(PaymentInstrument::Other, parse_instrument),
            transaction_id: Some(TransactionId::new(latest.id.clone())),
        })
    }

    #[instrument(skip(self))]
    async fn refund(
        &self,
        payment_id: &PaymentId,
        amount: Option<Price>,
    ) -> Result<RefundReceipt, GatewayError> {
        let mut body = serde_json::Map::new();
        if let Some(amount) = amount {
            body.insert(
                "amount".to_owned(),
                serde_json::json!(to_minor_units(amount.amount)),
            );
        }

        let response = self
            .inner
            .client
            .post(format!(
                "{}/payments/{}/refund",
                self.inner.endpoint, payment_id
            ))
            .basic_auth(&self.inner.key_id, Some(expose(&self.inner.key_secret)))
            .json(&serde_json::Value::Object(body))
            .send()
            .await?;

        let refund: RefundResponse = Self::decode(response).await?;

        Ok(RefundReceipt {
            refund_id: RefundId::new(refund.id),
            status: refund.status,
        })
    }
}

// =============================================================================
// Wire conversions
// =============================================================================

/// Convert a standard-unit amount to the gateway's minor units (paise).
fn to_minor_units(amount: Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .unwrap_or(i64::MAX)
}

/// Convert a minor-unit amount back to the standard unit.
fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

fn timestamp(unix: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix, 0).unwrap_or_else(Utc::now)
}

fn parse_currency(code: &str, fallback: CurrencyCode) -> CurrencyCode {
    code.parse().unwrap_or_else(|_| {
        warn!(code, "Unknown currency in gateway response");
        fallback
    })
}

fn parse_payment_status(status: &str) -> PaymentStatus {
    match status {
        "created" => PaymentStatus::Created,
        "attempted" | "authorized" => PaymentStatus::Attempted,
        "paid" | "captured" => PaymentStatus::Paid,
        "failed" => PaymentStatus::Failed,
        "refunded" => PaymentStatus::Refunded,
        other => {
            warn!(status = other, "Unknown payment status from gateway");
            PaymentStatus::Attempted
        }
    }
}

fn parse_instrument(method: &str) -> PaymentInstrument {
    match method {
        "card" => PaymentInstrument::Card,
        "netbanking" => PaymentInstrument::Netbanking,
        "wallet" => PaymentInstrument::Wallet,
        "upi" => PaymentInstrument::Upi,
        _ => PaymentInstrument::Other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_unit_round_trip() {
        assert_eq!(to_minor_units(dec!(299)), 29900);
        assert_eq!(to_minor_units(dec!(249.50)), 24950);
        assert_eq!(from_minor_units(29900), dec!(299.00));
    }

    #[test]
    fn test_parse_payment_status() {
        assert_eq!(parse_payment_status("created"), PaymentStatus::Created);
        assert_eq!(parse_payment_status("paid"), PaymentStatus::Paid);
        assert_eq!(parse_payment_status("captured"), PaymentStatus::Paid);
        assert_eq!(parse_payment_status("failed"), PaymentStatus::Failed);
        assert_eq!(parse_payment_status("refunded"), PaymentStatus::Refunded);
        // Unknown statuses degrade to Attempted rather than erroring.
        assert_eq!(parse_payment_status("pending"), PaymentStatus::Attempted);
    }

    #[test]
    fn test_parse_instrument() {
        assert_eq!(parse_instrument("card"), PaymentInstrument::Card);
        assert_eq!(parse_instrument("upi"), PaymentInstrument::Upi);
        assert_eq!(parse_instrument("emi"), PaymentInstrument::Other);
    }

    #[test]
    fn test_order_response_decodes() {
        let json = r#"{
            "id": "order_IluGWxBm9U8zJ8",
            "amount": 29900,
            "currency": "INR",
            "status": "created",
            "created_at": 1642662092
        }"#;
        let order: OrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, "order_IluGWxBm9U8zJ8");
        assert_eq!(from_minor_units(order.amount), dec!(299.00));
    }
}
