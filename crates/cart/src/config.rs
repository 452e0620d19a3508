//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `CRAFTCART_SHIPPING_RATE` - Flat shipping charge (default: 99)
//! - `CRAFTCART_FREE_SHIPPING_THRESHOLD` - Subtotal that ships free (default: 699)
//! - `CRAFTCART_CURRENCY` - ISO 4217 display currency (default: INR)
//! - `CRAFTCART_ITEMS_KEY` - Storage key for line items (default: cart)
//! - `CRAFTCART_COUPON_KEY` - Storage key for the applied coupon (default: appliedCoupon)
//! - `CRAFTCART_DATA_DIR` - Directory for the file-backed store (default: .craftcart)
//! - `CRAFTCART_COUPONS_FILE` - JSON coupon catalog replacing the built-in one

use std::path::PathBuf;
use std::str::FromStr;

use craftcart_core::{CurrencyCode, Money};
use thiserror::Error;

use crate::catalog::CouponCatalog;
use crate::error::CatalogError;
use crate::pricing::PricingRules;
use crate::storage::CartKeys;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Cannot read coupon catalog {0}: {1}")]
    CouponsFile(String, String),
    #[error("Invalid coupon catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Cart engine configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Shipping rate and free-shipping threshold
    pub rules: PricingRules,
    /// Currency used when formatting amounts
    pub currency: CurrencyCode,
    /// Storage keys for the persisted documents
    pub keys: CartKeys,
    /// Root of the file-backed store
    pub data_dir: PathBuf,
    /// Optional catalog document loaded at startup
    pub coupons_file: Option<PathBuf>,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            rules: PricingRules::default(),
            currency: CurrencyCode::default(),
            keys: CartKeys::default(),
            data_dir: PathBuf::from(".craftcart"),
            coupons_file: None,
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let shipping_rate = parse_amount(&lookup, "CRAFTCART_SHIPPING_RATE")?
            .unwrap_or(defaults.rules.shipping_rate);
        let free_shipping_threshold = parse_amount(&lookup, "CRAFTCART_FREE_SHIPPING_THRESHOLD")?
            .unwrap_or(defaults.rules.free_shipping_threshold);
        let currency = match lookup("CRAFTCART_CURRENCY") {
            Some(value) => CurrencyCode::from_str(&value).map_err(|e| {
                ConfigError::InvalidEnvVar("CRAFTCART_CURRENCY".to_string(), e.to_string())
            })?,
            None => defaults.currency,
        };

        Ok(Self {
            rules: PricingRules {
                shipping_rate,
                free_shipping_threshold,
            },
            currency,
            keys: CartKeys {
                items: non_empty(&lookup, "CRAFTCART_ITEMS_KEY").unwrap_or(defaults.keys.items),
                coupon: non_empty(&lookup, "CRAFTCART_COUPON_KEY").unwrap_or(defaults.keys.coupon),
            },
            data_dir: non_empty(&lookup, "CRAFTCART_DATA_DIR")
                .map_or(defaults.data_dir, PathBuf::from),
            coupons_file: non_empty(&lookup, "CRAFTCART_COUPONS_FILE").map(PathBuf::from),
        })
    }

    /// The coupon catalog: the configured file, or the built-in coupons.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or is not a valid catalog.
    pub fn load_catalog(&self) -> Result<CouponCatalog, ConfigError> {
        let Some(path) = &self.coupons_file else {
            return Ok(CouponCatalog::default());
        };
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::CouponsFile(path.display().to_string(), e.to_string()))?;
        Ok(CouponCatalog::from_json(&json)?)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable, treating blank values as unset.
fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Parse a non-negative amount if the variable is set.
fn parse_amount(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<Money>, ConfigError> {
    let Some(raw) = non_empty(lookup, key) else {
        return Ok(None);
    };
    let amount = Money::from_str(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if amount.is_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(Some(amount))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = CartConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.rules, PricingRules::default());
        assert_eq!(config.currency, CurrencyCode::INR);
        assert_eq!(config.keys, CartKeys::default());
        assert_eq!(config.data_dir, PathBuf::from(".craftcart"));
        assert!(config.coupons_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = CartConfig::from_lookup(lookup_from(&[
            ("CRAFTCART_SHIPPING_RATE", "49.50"),
            ("CRAFTCART_FREE_SHIPPING_THRESHOLD", "999"),
            ("CRAFTCART_CURRENCY", "usd"),
            ("CRAFTCART_ITEMS_KEY", "bag"),
            ("CRAFTCART_DATA_DIR", "/tmp/cart"),
        ]))
        .unwrap();
        assert_eq!(config.rules.shipping_rate, "49.5".parse::<Money>().unwrap());
        assert_eq!(config.rules.free_shipping_threshold, Money::from_major(999));
        assert_eq!(config.currency, CurrencyCode::USD);
        assert_eq!(config.keys.items, "bag");
        assert_eq!(config.keys.coupon, "appliedCoupon");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/cart"));
    }

    #[test]
    fn test_invalid_values() {
        let err = CartConfig::from_lookup(lookup_from(&[("CRAFTCART_SHIPPING_RATE", "free")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "CRAFTCART_SHIPPING_RATE"));

        let err = CartConfig::from_lookup(lookup_from(&[("CRAFTCART_SHIPPING_RATE", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));

        let err = CartConfig::from_lookup(lookup_from(&[("CRAFTCART_CURRENCY", "DOGE")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config =
            CartConfig::from_lookup(lookup_from(&[("CRAFTCART_ITEMS_KEY", "  ")])).unwrap();
        assert_eq!(config.keys.items, "cart");
    }

    #[test]
    fn test_load_catalog_default_and_file() {
        let config = CartConfig::default();
        assert_eq!(config.load_catalog().unwrap(), CouponCatalog::default());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"code":"TEST5","kind":{{"type":"fixed_amount","value":5}},"minOrder":0,"description":"Five off"}}]"#
        )
        .unwrap();
        let config = CartConfig {
            coupons_file: Some(file.path().to_path_buf()),
            ..CartConfig::default()
        };
        let catalog = config.load_catalog().unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.lookup("test5").is_some());
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let config = CartConfig {
            coupons_file: Some(PathBuf::from("/nonexistent/coupons.json")),
            ..CartConfig::default()
        };
        assert!(matches!(
            config.load_catalog(),
            Err(ConfigError::CouponsFile(_, _))
        ));
    }
}
