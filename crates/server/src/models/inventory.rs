//! Stock movement ledger models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solarshop_core::{MovementId, MovementType, ProductId, ProductStatus, UserId};

use super::pagination::PageParams;

/// Reference types written by the system.
pub mod reference {
    pub const ORDER: &str = "order";
    pub const ORDER_CANCELLATION: &str = "order_cancellation";
    pub const STOCK_TAKE: &str = "stock_take";
    pub const INITIAL_STOCK: &str = "initial_stock";
    pub const MANUAL: &str = "manual";
}

/// One immutable ledger row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    /// Positive count, or a signed delta for adjustments.
    pub quantity: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub reference_type: Option<String>,
    pub reference_id: Option<i32>,
    pub note: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockMovementWithProduct {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub movement: StockMovement,
    pub product_name: String,
    pub sku: String,
}

/// Input for [`crate::db::inventory::record_movement`].
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reference_type: Option<String>,
    pub reference_id: Option<i32>,
    pub note: Option<String>,
    pub created_by: Option<UserId>,
}

impl NewMovement {
    #[must_use]
    pub const fn new(product_id: ProductId, movement_type: MovementType, quantity: i32) -> Self {
        Self {
            product_id,
            movement_type,
            quantity,
            reference_type: None,
            reference_id: None,
            note: None,
            created_by: None,
        }
    }

    #[must_use]
    pub fn reference(mut self, kind: &str, id: Option<i32>) -> Self {
        self.reference_type = Some(kind.to_string());
        self.reference_id = id;
        self
    }

    #[must_use]
    pub fn note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn by(mut self, user: UserId) -> Self {
        self.created_by = Some(user);
        self
    }
}

/// Admin ledger listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub movement_type: Option<MovementType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl MovementFilter {
    #[must_use]
    pub const fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub stock_quantity: i32,
    pub status: ProductStatus,
}

/// A product whose stored balance disagrees with its ledger.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditDiscrepancy {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub stock_quantity: i32,
    pub ledger_quantity: i64,
    pub movement_count: i64,
}

impl AuditDiscrepancy {
    #[must_use]
    pub fn difference(&self) -> i64 {
        i64::from(self.stock_quantity) - self.ledger_quantity
    }
}
