//! Commerce core configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RAZORPAY_KEY_ID` - Razorpay API key id
//! - `RAZORPAY_KEY_SECRET` - Razorpay API key secret
//! - `SHIPROCKET_TOKEN` - Shiprocket API token
//!
//! ## Optional
//! - `ATAKA_STORAGE_DIR` - Directory for persisted cart/orders (default: data)
//! - `ATAKA_CURRENCY` - Store currency code (default: INR)
//! - `ATAKA_GATEWAY_TIMEOUT_SECS` - Gateway call timeout (default: 30)
//! - `RAZORPAY_ENDPOINT` - Razorpay API base URL
//! - `SHIPROCKET_ENDPOINT` - Shiprocket API base URL
//! - `SHIPROCKET_PICKUP_LOCATION` - Warehouse pickup location name

use std::path::PathBuf;
use std::time::Duration;

use ataka_core::CurrencyCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Commerce core configuration.
#[derive(Debug, Clone)]
pub struct CommerceConfig {
    /// Directory for persisted cart and order documents.
    pub storage_dir: PathBuf,
    /// Store currency; the cart and both gateways operate in this currency.
    pub currency: CurrencyCode,
    /// Upper bound on any single gateway call.
    pub gateway_timeout: Duration,
    /// Payment gateway configuration.
    pub razorpay: RazorpayConfig,
    /// Shipping gateway configuration.
    pub shiprocket: ShiprocketConfig,
}

/// Razorpay payment gateway configuration.
///
/// Implements `Debug` manually to redact the key secret.
#[derive(Clone)]
pub struct RazorpayConfig {
    /// API key id (sent as the basic-auth username).
    pub key_id: String,
    /// API key secret.
    pub key_secret: SecretString,
    /// API base URL.
    pub endpoint: String,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Shiprocket shipping gateway configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ShiprocketConfig {
    /// Bearer token for the Shiprocket API.
    pub token: SecretString,
    /// API base URL.
    pub endpoint: String,
    /// Warehouse pickup location name registered with Shiprocket.
    pub pickup_location: String,
}

impl std::fmt::Debug for ShiprocketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShiprocketConfig")
            .field("token", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("pickup_location", &self.pickup_location)
            .finish()
    }
}

impl CommerceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets look like placeholders.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage_dir = PathBuf::from(get_env_or_default("ATAKA_STORAGE_DIR", "data"));
        let currency = get_env_or_default("ATAKA_CURRENCY", "INR")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("ATAKA_CURRENCY".to_string(), e))?;
        let timeout_secs = get_env_or_default("ATAKA_GATEWAY_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ATAKA_GATEWAY_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            storage_dir,
            currency,
            gateway_timeout: Duration::from_secs(timeout_secs),
            razorpay: RazorpayConfig::from_env()?,
            shiprocket: ShiprocketConfig::from_env()?,
        })
    }
}

impl RazorpayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            key_id: get_required_env("RAZORPAY_KEY_ID")?,
            key_secret: get_validated_secret("RAZORPAY_KEY_SECRET")?,
            endpoint: get_env_or_default("RAZORPAY_ENDPOINT", "https://api.razorpay.com/v1"),
        })
    }
}

impl ShiprocketConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            token: get_validated_secret("SHIPROCKET_TOKEN")?,
            endpoint: get_env_or_default(
                "SHIPROCKET_ENDPOINT",
                "https://apiv2.shiprocket.in/v1/external",
            ),
            pickup_location: get_env_or_default("SHIPROCKET_PICKUP_LOCATION", "Primary Warehouse"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a secret is not a placeholder.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Expose a secret for constructing gateway auth headers.
pub(crate) fn expose(secret: &SecretString) -> &str {
    secret.expose_secret()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(
            result,
            Err(ConfigError::InsecureSecret(_, _))
        ));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("rzp_live_F8xK2mQ9pL4nT7vB", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_razorpay_config_debug_redacts_secret() {
        let config = RazorpayConfig {
            key_id: "rzp_live_abc".to_string(),
            key_secret: SecretString::from("super_private_value"),
            endpoint: "https://api.razorpay.com/v1".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("rzp_live_abc"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_private_value"));
    }

    #[test]
    fn test_shiprocket_config_debug_redacts_token() {
        let config = ShiprocketConfig {
            token: SecretString::from("bearer_private_value"),
            endpoint: "https://apiv2.shiprocket.in/v1/external".to_string(),
            pickup_location: "Primary Warehouse".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("bearer_private_value"));
    }
}
