//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing references from different entity types. Gateways hand
//! back opaque string identifiers, so the wrappers hold a `String`.

use uuid::Uuid;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use ataka_core::define_id;
/// define_id!(ItemId);
/// define_id!(PaymentId);
///
/// let item_id = ItemId::new("book-1984");
/// let payment_id = PaymentId::new("pay_29QQoUBi66xm2f");
///
/// // These are different types, so this won't compile:
/// // let _: ItemId = payment_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(ItemId);
define_id!(OrderId);
define_id!(PaymentId);
define_id!(ShipmentId);
define_id!(RefundId);
define_id!(TransactionId);

impl OrderId {
    /// Generate a fresh order ID.
    ///
    /// The ID doubles as the idempotency key handed to payment and shipment
    /// gateways, so it must be unique per checkout attempt.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("order_{}", Uuid::new_v4().simple()))
    }
}
