//! Order status changes.
//!
//! Cancelling an order puts its stock back with one `return` movement per
//! line, in the same transaction as the status change.

use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::instrument;

use solarshop_core::{MovementType, OrderId, OrderStatus, UserId};

use crate::db::{RepositoryError, notifications, orders, payments};
use crate::db::inventory::record_movement;
use crate::models::inventory::{NewMovement, reference};
use crate::models::notification::{NewNotification, kind};
use crate::models::order::Order;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error("order can no longer be cancelled")]
    NotCancellable,

    #[error("a payment for this order is in progress")]
    PaymentPending,

    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(e.into())
    }
}

/// Cancel one of the customer's own orders.
///
/// Allowed while the order is pending and unpaid, and no STK push is
/// waiting on the customer's phone.
///
/// # Errors
///
/// Returns `OrderError::NotFound` if the order isn't the user's.
/// Returns `OrderError::NotCancellable` once it is paid or processing.
/// Returns `OrderError::PaymentPending` while an attempt is unsettled.
#[instrument(skip(pool))]
pub async fn cancel_by_customer(
    pool: &PgPool,
    user_id: UserId,
    order_id: OrderId,
) -> Result<Order, OrderError> {
    let mut tx = pool.begin().await?;

    let order = orders::lock_order(&mut tx, order_id)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or(OrderError::NotFound)?;

    if !order.is_customer_cancellable() {
        return Err(OrderError::NotCancellable);
    }
    if payments::has_pending(&mut tx, order.id).await? {
        return Err(OrderError::PaymentPending);
    }

    restock(&mut tx, &order, user_id).await?;
    let cancelled = orders::update_status(
        &mut tx,
        &order,
        OrderStatus::Cancelled,
        Some("Cancelled by customer"),
        Some(user_id),
    )
    .await?;

    tx.commit().await?;
    tracing::info!(order_id = %order.id, "Order cancelled by customer");
    Ok(cancelled)
}

/// Move an order through its lifecycle from the admin panel.
///
/// The customer gets a notification for every change.
///
/// # Errors
///
/// Returns `OrderError::NotFound` if the order doesn't exist.
/// Returns `OrderError::InvalidTransition` if the state machine forbids it.
#[instrument(skip(pool, note))]
pub async fn change_status(
    pool: &PgPool,
    admin_id: UserId,
    order_id: OrderId,
    next: OrderStatus,
    note: Option<&str>,
) -> Result<Order, OrderError> {
    let mut tx = pool.begin().await?;

    let order = orders::lock_order(&mut tx, order_id)
        .await?
        .ok_or(OrderError::NotFound)?;

    if !order.status.can_transition_to(next) {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: next,
        });
    }

    if next == OrderStatus::Cancelled && order.status.holds_stock() {
        restock(&mut tx, &order, admin_id).await?;
    }

    let note = note.map(str::trim).filter(|n| !n.is_empty());
    let updated = orders::update_status(&mut tx, &order, next, note, Some(admin_id)).await?;

    notifications::insert(
        &mut tx,
        &NewNotification {
            user_id: order.user_id,
            kind: kind::ORDER_STATUS,
            title: format!("Order {} is {next}", order.order_number),
            message: note.map_or_else(
                || status_message(next).to_string(),
                |n| format!("{} {n}", status_message(next)),
            ),
            link: Some(format!("/orders/{}", order.id)),
        },
    )
    .await?;

    tx.commit().await?;
    tracing::info!(order_id = %order.id, from = %order.status, to = %next, "Order status changed");
    Ok(updated)
}

/// Return every line of an order to stock.
async fn restock(
    conn: &mut PgConnection,
    order: &Order,
    by: UserId,
) -> Result<(), RepositoryError> {
    for item in orders::items_of(conn, order.id).await? {
        let movement = NewMovement::new(item.product_id, MovementType::Return, item.quantity)
            .reference(reference::ORDER_CANCELLATION, Some(order.id.as_i32()))
            .note(Some(format!("Cancelled {}", order.order_number)))
            .by(by);
        record_movement(conn, &movement).await?;
    }
    Ok(())
}

const fn status_message(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Your order is awaiting payment.",
        OrderStatus::Processing => "We're preparing your order.",
        OrderStatus::Shipped => "Your order is on its way.",
        OrderStatus::Delivered => "Your order has been delivered.",
        OrderStatus::Cancelled => "Your order has been cancelled.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_status_has_message() {
        for status in OrderStatus::ALL {
            assert!(status_message(*status).ends_with('.'));
        }
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "cannot change order status from delivered to cancelled"
        );
    }
}
