//! Shopping cart models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use solarshop_core::{Money, ProductId, ProductStatus};

/// A cart line joined with its product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub stock_quantity: i32,
    pub status: ProductStatus,
    pub image: Option<String>,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Money {
        Money::kes(self.unit_price).multiply(self.quantity)
    }

    /// The line can be checked out as is.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Active && self.quantity <= self.stock_quantity
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub line_total: Decimal,
    pub available: bool,
}

/// `GET /api/cart` payload.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub item_count: i64,
}

impl Cart {
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut subtotal = Decimal::ZERO;
        let mut item_count = 0_i64;
        let lines = items
            .into_iter()
            .map(|item| {
                let line_total = item.line_total().amount;
                subtotal += line_total;
                item_count += i64::from(item.quantity);
                CartLine {
                    available: item.is_available(),
                    line_total,
                    item,
                }
            })
            .collect();

        Self {
            items: lines,
            subtotal,
            item_count,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetQuantity {
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i32, price: i64, quantity: i32, stock: i32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Item {id}"),
            slug: format!("item-{id}"),
            sku: format!("SKU-{id}"),
            unit_price: Decimal::new(price, 2),
            quantity,
            stock_quantity: stock,
            status: ProductStatus::Active,
            image: None,
        }
    }

    #[test]
    fn test_cart_totals() {
        let cart = Cart::from_items(vec![item(1, 1_500_00, 2, 10), item(2, 99_99, 1, 1)]);
        assert_eq!(cart.subtotal, Decimal::new(3_099_99, 2));
        assert_eq!(cart.item_count, 3);
        assert!(cart.items.iter().all(|l| l.available));
    }

    #[test]
    fn test_unavailable_lines() {
        let mut archived = item(3, 100, 1, 5);
        archived.status = ProductStatus::Archived;
        let cart = Cart::from_items(vec![item(1, 100, 4, 3), archived]);
        assert!(cart.items.iter().all(|l| !l.available));
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::from_items(Vec::new());
        assert_eq!(cart.subtotal, Decimal::ZERO);
        assert_eq!(cart.item_count, 0);
    }
}
