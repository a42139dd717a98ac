//! Checkout: turn a cart into an order.
//!
//! Everything from reading the cart to writing the notification happens in
//! one transaction. Products are locked in ascending id order before any
//! stock check, so the stock seen by the check is the stock the `sale`
//! movements draw from.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use solarshop_core::{AddressId, LedgerError, MovementType, ProductId, ProductStatus};

use crate::db::{AddressRepository, RepositoryError, carts, inventory, notifications, orders, settings};
use crate::models::User;
use crate::models::address::AddressSnapshot;
use crate::models::inventory::{NewMovement, reference};
use crate::models::notification::{NewNotification, kind};
use crate::models::order::{NewOrderItem, Order, OrderItem, OrderTotals};
use crate::services::email::EmailService;

/// Reasons a checkout is refused.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("address not found")]
    AddressNotFound,

    #[error("{name} is no longer available")]
    ProductUnavailable { product_id: ProductId, name: String },

    #[error("only {available} of {name} in stock, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: i32,
        requested: i32,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(e.into())
    }
}

/// A placed order with its lines.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Place an order from the user's cart.
///
/// The confirmation email is sent in the background after commit; delivery
/// failures are only logged.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` or `AddressNotFound` for bad requests.
/// Returns `CheckoutError::ProductUnavailable` or `InsufficientStock` naming
/// the first offending product. Nothing is written in those cases.
#[instrument(skip(pool, email, user, notes, base_url), fields(user_id = %user.id))]
pub async fn place_order(
    pool: &PgPool,
    email: &EmailService,
    user: &User,
    address_id: AddressId,
    notes: Option<&str>,
    base_url: &str,
) -> Result<PlacedOrder, CheckoutError> {
    let address = AddressRepository::new(pool)
        .get(user.id, address_id)
        .await?
        .ok_or(CheckoutError::AddressNotFound)?;
    let store = settings::load(pool).await?;

    let mut tx = pool.begin().await?;

    let cart = carts::load_items(&mut tx, user.id).await?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let ids: Vec<ProductId> = cart.iter().map(|line| line.product_id).collect();
    let locked: HashMap<ProductId, inventory::LockedProduct> =
        inventory::lock_products(&mut tx, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

    let mut lines = Vec::with_capacity(cart.len());
    let mut subtotal = Decimal::ZERO;
    for entry in &cart {
        let product = locked
            .get(&entry.product_id)
            .filter(|p| p.status == ProductStatus::Active)
            .ok_or_else(|| CheckoutError::ProductUnavailable {
                product_id: entry.product_id,
                name: entry.name.clone(),
            })?;

        if entry.quantity > product.stock_quantity {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
                available: product.stock_quantity,
                requested: entry.quantity,
            });
        }

        let line = NewOrderItem {
            product_id: product.id,
            product_name: product.name.clone(),
            sku: product.sku.clone(),
            unit_price: product.price,
            quantity: entry.quantity,
        };
        subtotal += line.line_total();
        lines.push(line);
    }

    let totals = OrderTotals::compute(subtotal, &store);
    let order = orders::insert_order(
        &mut tx,
        user.id,
        &totals,
        &AddressSnapshot::from(&address),
        notes.map(str::trim).filter(|n| !n.is_empty()),
    )
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        items.push(orders::insert_item(&mut tx, order.id, line).await?);

        let movement = NewMovement::new(line.product_id, MovementType::Sale, line.quantity)
            .reference(reference::ORDER, Some(order.id.as_i32()))
            .by(user.id);
        inventory::record_movement(&mut tx, &movement)
            .await
            .map_err(|e| match e {
                RepositoryError::Ledger(LedgerError::InsufficientStock {
                    available,
                    requested,
                }) => CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    name: line.product_name.clone(),
                    available,
                    requested,
                },
                other => other.into(),
            })?;
    }

    carts::clear_items(&mut tx, user.id).await?;

    notifications::insert(
        &mut tx,
        &NewNotification {
            user_id: user.id,
            kind: kind::ORDER_PLACED,
            title: format!("Order {} placed", order.order_number),
            message: format!(
                "Thanks for your order. Total due: KES {:.2}. Pay with M-Pesa to start processing.",
                order.total
            ),
            link: Some(format!("/orders/{}", order.id)),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total,
        lines = items.len(),
        "Order placed"
    );

    send_confirmation(email.clone(), user, &order, &items, base_url);

    Ok(PlacedOrder { order, items })
}

fn send_confirmation(
    email: EmailService,
    user: &User,
    order: &Order,
    items: &[OrderItem],
    base_url: &str,
) {
    let to = user.email.as_str().to_string();
    let name = user.first_name.clone();
    let order = order.clone();
    let items = items.to_vec();
    let order_url = format!("{}/orders/{}", base_url.trim_end_matches('/'), order.id);

    tokio::spawn(async move {
        if let Err(e) = email
            .send_order_confirmation(&to, &name, &order, &items, &order_url)
            .await
        {
            tracing::error!(order_id = %order.id, error = %e, "Failed to send order confirmation");
        }
    });
}
