//! Quote request models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use solarshop_core::{ProductId, QuoteId, QuoteItemId, QuoteStatus, UserId};

use super::pagination::PageParams;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Quote {
    pub id: QuoteId,
    /// `Q-000042`.
    pub quote_number: String,
    pub user_id: UserId,
    pub status: QuoteStatus,
    /// Sum of current catalog prices when the request was made.
    pub estimated_total: Decimal,
    pub quoted_total: Option<Decimal>,
    pub installation_required: bool,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    pub responded_by: Option<UserId>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// A quoted offer past its validity date.
    #[must_use]
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == QuoteStatus::Quoted && self.valid_until.is_some_and(|v| v < now)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuoteItem {
    pub id: QuoteItemId,
    pub quote_id: QuoteId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteDetail {
    #[serde(flatten)]
    pub quote: Quote,
    pub items: Vec<QuoteItem>,
}

/// Admin listing row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuoteSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub quote: Quote,
    pub customer_email: String,
    pub customer_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteLineInput {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuote {
    pub items: Vec<QuoteLineInput>,
    pub notes: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub installation_required: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    pub quoted_total: Decimal,
    pub admin_notes: Option<String>,
    /// Days the offer stays open.
    pub valid_days: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteFilter {
    pub status: Option<QuoteStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl QuoteFilter {
    #[must_use]
    pub const fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Format a quote number from its id.
#[must_use]
pub fn quote_number(id: i32) -> String {
    format!("Q-{id:06}")
}
