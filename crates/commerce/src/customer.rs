//! Customer and shipping details collected at checkout.

use ataka_core::Email;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for [`CustomerDetails`].
///
/// These are always recoverable by user correction and are reported before
/// any gateway call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustomerDetailsError {
    /// A required field is empty.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// The phone number is too short.
    #[error("phone number must have at least {min} digits")]
    PhoneTooShort {
        /// Minimum digit count.
        min: usize,
    },
    /// The postal code is too short.
    #[error("postal code must have at least {min} digits")]
    PostalCodeTooShort {
        /// Minimum digit count.
        min: usize,
    },
}

/// Name, contact and shipping address for one order.
///
/// The email is already structurally validated by [`Email::parse`]; the
/// remaining fields are validated by [`CustomerDetails::validate`] before
/// checkout proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: Email,
    /// Contact phone number.
    pub phone: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal / PIN code.
    pub postal_code: String,
}

impl CustomerDetails {
    /// Minimum digits in a phone number.
    pub const MIN_PHONE_DIGITS: usize = 10;
    /// Minimum digits in a postal code.
    pub const MIN_POSTAL_DIGITS: usize = 6;

    /// Check that every field is present and phone/postal code look
    /// plausible.
    ///
    /// # Errors
    ///
    /// Returns the first [`CustomerDetailsError`] found.
    pub fn validate(&self) -> Result<(), CustomerDetailsError> {
        let required: [(&'static str, &str); 5] = [
            ("name", &self.name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("postal code", &self.postal_code),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CustomerDetailsError::MissingField(field));
            }
        }

        if digit_count(&self.phone) < Self::MIN_PHONE_DIGITS {
            return Err(CustomerDetailsError::PhoneTooShort {
                min: Self::MIN_PHONE_DIGITS,
            });
        }

        if digit_count(&self.postal_code) < Self::MIN_POSTAL_DIGITS {
            return Err(CustomerDetailsError::PostalCodeTooShort {
                min: Self::MIN_POSTAL_DIGITS,
            });
        }

        Ok(())
    }
}

fn digit_count(s: &str) -> usize {
    s.chars().filter(char::is_ascii_digit).count()
}
