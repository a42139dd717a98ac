//! Order models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use solarshop_core::{
    AddressId, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId,
};

use super::address::AddressSnapshot;
use super::pagination::PageParams;
use super::payment::PaymentAttempt;
use super::settings::StoreSettings;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    /// `ORD-000123`.
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub shipping_address: Json<AddressSnapshot>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Customers may cancel until the order is being processed or paid.
    #[must_use]
    pub fn is_customer_cancellable(&self) -> bool {
        self.status == OrderStatus::Pending && self.payment_status != PaymentStatus::Paid
    }

    /// An STK push may be started for this order.
    #[must_use]
    pub fn accepts_payment(&self) -> bool {
        self.status != OrderStatus::Cancelled
            && !matches!(
                self.payment_status,
                PaymentStatus::Paid | PaymentStatus::Refunded
            )
    }
}

/// Snapshotted order line.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// An order line about to be written at checkout.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl NewOrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        Money::kes(self.unit_price).multiply(self.quantity).amount
    }
}

/// Order money breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Shipping is the flat fee unless the subtotal reaches the free-shipping
    /// threshold. Tax is charged on the subtotal only.
    #[must_use]
    pub fn compute(subtotal: Decimal, settings: &StoreSettings) -> Self {
        let free = settings
            .free_shipping_threshold
            .is_some_and(|threshold| subtotal >= threshold);
        let shipping_fee = if free || subtotal.is_zero() {
            Decimal::ZERO
        } else {
            settings.shipping_flat_fee
        };
        let tax = Money::kes(subtotal).percent_of(settings.tax_rate).amount;

        Self {
            subtotal,
            shipping_fee,
            tax,
            total: subtotal + shipping_fee + tax,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderStatusChange {
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub note: Option<String>,
    pub changed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Customer-facing order with its lines and payment attempts.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<PaymentAttempt>,
    pub history: Vec<OrderStatusChange>,
}

/// Admin order listing row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub customer_email: String,
    pub customer_name: String,
    pub item_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub address_id: AddressId,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub note: Option<String>,
}

/// Admin order listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Order number or customer email.
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderFilter {
    #[must_use]
    pub const fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Format an order number from its id.
#[must_use]
pub fn order_number(id: i32) -> String {
    format!("ORD-{id:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(threshold: Option<i64>) -> StoreSettings {
        StoreSettings {
            shipping_flat_fee: Decimal::new(500, 0),
            free_shipping_threshold: threshold.map(|t| Decimal::new(t, 0)),
            tax_rate: Decimal::new(16, 2),
            ..StoreSettings::default()
        }
    }

    #[test]
    fn test_totals_with_shipping() {
        let totals = OrderTotals::compute(Decimal::new(10_000, 0), &settings(Some(50_000)));
        assert_eq!(totals.shipping_fee, Decimal::new(500, 0));
        assert_eq!(totals.tax, Decimal::new(1_600, 0));
        assert_eq!(totals.total, Decimal::new(12_100, 0));
    }

    #[test]
    fn test_totals_free_shipping_at_threshold() {
        let totals = OrderTotals::compute(Decimal::new(50_000, 0), &settings(Some(50_000)));
        assert_eq!(totals.shipping_fee, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(58_000, 0));
    }

    #[test]
    fn test_totals_no_threshold_always_charges() {
        let totals = OrderTotals::compute(Decimal::new(1_000_000, 0), &settings(None));
        assert_eq!(totals.shipping_fee, Decimal::new(500, 0));
    }

    #[test]
    fn test_tax_rounds_to_cents() {
        // 333.33 * 0.16 = 53.3328
        let totals = OrderTotals::compute(Decimal::new(333_33, 2), &settings(None));
        assert_eq!(totals.tax, Decimal::new(53_33, 2));
        assert_eq!(totals.total, Decimal::new(886_66, 2));
    }

    #[test]
    fn test_line_total() {
        let item = NewOrderItem {
            product_id: ProductId::new(1),
            product_name: "Panel".to_string(),
            sku: "PNL".to_string(),
            unit_price: Decimal::new(12_499_50, 2),
            quantity: 3,
        };
        assert_eq!(item.line_total(), Decimal::new(37_498_50, 2));
    }

    #[test]
    fn test_order_number() {
        assert_eq!(order_number(123), "ORD-000123");
        assert_eq!(order_number(1_234_567), "ORD-1234567");
    }
}
