//! Typed store settings backed by the `settings` key/value table.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const STORE_NAME: &str = "store_name";
pub const SHIPPING_FLAT_FEE: &str = "shipping_flat_fee";
pub const FREE_SHIPPING_THRESHOLD: &str = "free_shipping_threshold";
pub const TAX_RATE: &str = "tax_rate";
pub const LOW_STOCK_THRESHOLD: &str = "low_stock_threshold";

/// Store-wide settings. Keys missing from the table fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub store_name: String,
    /// Flat shipping fee per order, in KES.
    pub shipping_flat_fee: Decimal,
    /// Orders with a subtotal at or above this ship free. `None` disables.
    pub free_shipping_threshold: Option<Decimal>,
    /// Fraction of the subtotal, e.g. `0.16` for 16% VAT.
    pub tax_rate: Decimal,
    pub low_stock_threshold: i32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_name: "SolarShop".to_string(),
            shipping_flat_fee: Decimal::new(500, 0),
            free_shipping_threshold: Some(Decimal::new(50_000, 0)),
            tax_rate: Decimal::new(16, 2),
            low_stock_threshold: 5,
        }
    }
}

impl StoreSettings {
    /// Overlay stored key/value pairs on the defaults.
    ///
    /// Values that don't deserialize into the expected type are skipped with
    /// a warning so a bad row can't take checkout down.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, JsonValue)>) -> Self {
        let mut settings = Self::default();
        for (key, value) in pairs {
            let applied = match key.as_str() {
                STORE_NAME => apply(&mut settings.store_name, value),
                SHIPPING_FLAT_FEE => apply(&mut settings.shipping_flat_fee, value),
                FREE_SHIPPING_THRESHOLD => apply(&mut settings.free_shipping_threshold, value),
                TAX_RATE => apply(&mut settings.tax_rate, value),
                LOW_STOCK_THRESHOLD => apply(&mut settings.low_stock_threshold, value),
                _ => true,
            };
            if !applied {
                tracing::warn!(key = %key, "Ignoring malformed setting value");
            }
        }
        settings
    }

    /// Key/value pairs to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be serialized.
    pub fn to_pairs(&self) -> Result<Vec<(&'static str, JsonValue)>, serde_json::Error> {
        Ok(vec![
            (STORE_NAME, serde_json::to_value(&self.store_name)?),
            (SHIPPING_FLAT_FEE, serde_json::to_value(self.shipping_flat_fee)?),
            (
                FREE_SHIPPING_THRESHOLD,
                serde_json::to_value(self.free_shipping_threshold)?,
            ),
            (TAX_RATE, serde_json::to_value(self.tax_rate)?),
            (
                LOW_STOCK_THRESHOLD,
                serde_json::to_value(self.low_stock_threshold)?,
            ),
        ])
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.store_name.trim().is_empty() {
            return Err("store_name cannot be empty".to_string());
        }
        if self.shipping_flat_fee.is_sign_negative() {
            return Err("shipping_flat_fee cannot be negative".to_string());
        }
        if self
            .free_shipping_threshold
            .is_some_and(|t| t.is_sign_negative())
        {
            return Err("free_shipping_threshold cannot be negative".to_string());
        }
        if self.tax_rate.is_sign_negative() || self.tax_rate >= Decimal::ONE {
            return Err("tax_rate must be between 0 and 1".to_string());
        }
        if self.low_stock_threshold < 0 {
            return Err("low_stock_threshold cannot be negative".to_string());
        }
        Ok(())
    }
}

fn apply<T: serde::de::DeserializeOwned>(slot: &mut T, value: JsonValue) -> bool {
    match serde_json::from_value(value) {
        Ok(v) => {
            *slot = v;
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(StoreSettings::default().validate().is_ok());
    }

    #[test]
    fn test_from_pairs_overlays_defaults() {
        let settings = StoreSettings::from_pairs(vec![
            (TAX_RATE.to_string(), json!("0.08")),
            (LOW_STOCK_THRESHOLD.to_string(), json!(12)),
            (FREE_SHIPPING_THRESHOLD.to_string(), JsonValue::Null),
        ]);
        assert_eq!(settings.tax_rate, Decimal::new(8, 2));
        assert_eq!(settings.low_stock_threshold, 12);
        assert!(settings.free_shipping_threshold.is_none());
        assert_eq!(settings.store_name, "SolarShop");
    }

    #[test]
    fn test_from_pairs_skips_malformed() {
        let settings =
            StoreSettings::from_pairs(vec![(LOW_STOCK_THRESHOLD.to_string(), json!("lots"))]);
        assert_eq!(settings.low_stock_threshold, 5);
    }

    #[test]
    fn test_pairs_roundtrip() {
        let original = StoreSettings {
            store_name: "Jua Power".to_string(),
            shipping_flat_fee: Decimal::new(350, 0),
            free_shipping_threshold: None,
            tax_rate: Decimal::ZERO,
            low_stock_threshold: 2,
        };
        let pairs = original
            .to_pairs()
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(StoreSettings::from_pairs(pairs), original);
    }

    #[test]
    fn test_validate_rejects_bad_tax_rate() {
        let settings = StoreSettings {
            tax_rate: Decimal::ONE,
            ..StoreSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_fee() {
        let settings = StoreSettings {
            shipping_flat_fee: Decimal::new(-1, 0),
            ..StoreSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
