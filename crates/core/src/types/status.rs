//! Status enums for payments, shipments and orders.

use serde::{Deserialize, Serialize};

/// Payment lifecycle status as reported by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Created,
    Attempted,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Whether money has been captured for this payment.
    #[must_use]
    pub const fn is_captured(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// How the customer chose to pay at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Pay the courier on delivery. No gateway call is made at checkout.
    CashOnDelivery,
    /// Online payment through the configured payment gateway.
    Gateway,
}

/// Payment instrument reported by the gateway after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentInstrument {
    Card,
    Netbanking,
    Wallet,
    Upi,
    #[default]
    Other,
}

/// Shipment lifecycle status as reported by the shipping gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[default]
    Created,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Cancelled,
}

/// Composite order status shown to administrators.
///
/// Orders are never deleted; cancellation and returns are status
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Returned => write!(f, "returned"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "returned" => Ok(Self::Returned),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_captured() {
        assert!(PaymentStatus::Paid.is_captured());
        assert!(!PaymentStatus::Created.is_captured());
        assert!(!PaymentStatus::Refunded.is_captured());
    }

    #[test]
    fn test_payment_status_serde() {
        let json = serde_json::to_string(&PaymentStatus::Refunded).unwrap();
        assert_eq!(json, "\"refunded\"");
    }

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Returned,
        ] {
            let parsed: OrderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_order_status_invalid() {
        assert!("on-hold".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_shipment_status_serde() {
        let json = serde_json::to_string(&ShipmentStatus::InTransit).unwrap();
        assert_eq!(json, "\"in_transit\"");
    }
}
