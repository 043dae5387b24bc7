//! Commerce core for the Ataka Books storefront.
//!
//! This crate owns the shopping cart, checkout orchestration and order
//! history for the storefront, behind trait seams for persistence and the
//! two external gateways:
//!
//! - [`cart`] - session cart with merge-on-add semantics and persistence
//! - [`checkout`] - the payment-then-shipment checkout state machine
//! - [`orders`] - durable order history with gateway reconciliation
//! - [`gateway`] - payment/shipment gateway contracts plus the Razorpay
//!   and Shiprocket adapters
//! - [`storage`] - keyed JSON document persistence (file-backed or
//!   in-memory)
//! - [`config`] - environment-driven configuration
//!
//! All money is carried as [`ataka_core::Price`] (decimal amount plus
//! currency); conversion to gateway minor units happens only at the wire.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod customer;
pub mod gateway;
pub mod orders;
pub mod storage;

pub use cart::{Cart, CartEvent, CartLine, CartStore};
pub use catalog::CatalogItem;
pub use checkout::{CheckoutError, CheckoutOutcome, CheckoutService};
pub use config::{CommerceConfig, ConfigError};
pub use customer::{CustomerDetails, CustomerDetailsError};
pub use orders::{Order, OrderError, OrderStore, PaymentRecord, ShipmentRecord};
pub use storage::{JsonFileStore, MemoryStore, StorageBackend, StorageError};
