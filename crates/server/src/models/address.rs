//! Shipping address models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solarshop_core::{AddressId, PhoneNumber, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub label: String,
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub county: String,
    pub postal_code: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub label: Option<String>,
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub county: String,
    pub postal_code: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    /// Trim fields, require the mandatory ones and normalize the phone number.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message naming the first invalid field.
    pub fn normalized(mut self) -> Result<Self, String> {
        for (name, value) in [
            ("recipient_name", &mut self.recipient_name),
            ("line1", &mut self.line1),
            ("city", &mut self.city),
            ("county", &mut self.county),
        ] {
            *value = value.trim().to_string();
            if value.is_empty() {
                return Err(format!("{name} is required"));
            }
        }

        self.phone = PhoneNumber::parse_kenyan(&self.phone)
            .map_err(|e| e.to_string())?
            .as_str()
            .to_string();

        self.label = Some(
            self.label
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "Home".to_string()),
        );
        self.line2 = self
            .line2
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        self.postal_code = self
            .postal_code
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(self)
    }
}

/// Copy of an address stored on an order, so later edits don't rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressSnapshot {
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub county: String,
    pub postal_code: Option<String>,
}

impl From<&Address> for AddressSnapshot {
    fn from(a: &Address) -> Self {
        Self {
            recipient_name: a.recipient_name.clone(),
            phone: a.phone.clone(),
            line1: a.line1.clone(),
            line2: a.line2.clone(),
            city: a.city.clone(),
            county: a.county.clone(),
            postal_code: a.postal_code.clone(),
        }
    }
}
