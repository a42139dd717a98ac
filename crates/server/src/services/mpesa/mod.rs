//! M-Pesa STK push payments.
//!
//! # Flow
//!
//! 1. `POST /api/payments/mpesa/stk-push` sends a push via [`MpesaClient`]
//!    and records a pending attempt.
//! 2. Safaricom posts the result to the callback URL, or the status
//!    endpoint polls for it with [`MpesaClient::query`].
//! 3. Either path ends in [`apply_result`], which settles the attempt and
//!    marks the order paid. Settled attempts are never re-applied.

mod client;
pub mod types;

pub use client::{MpesaClient, QueryOutcome, stk_password, timestamp};

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use solarshop_core::{OrderStatus, PaymentAttemptStatus, PaymentStatus};

use crate::db::{RepositoryError, notifications, orders, payments};
use crate::models::notification::{NewNotification, kind};
use crate::models::payment::{PaymentAttempt, PaymentResult};

/// Errors from the Daraja API.
#[derive(Debug, Error)]
pub enum MpesaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// OAuth token request was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Daraja returned an error code.
    #[error("M-Pesa error {code}: {message}")]
    Api { code: String, message: String },

    /// The order total can't be charged.
    #[error("amount must be at least 1 KES")]
    InvalidAmount,
}

/// Settle an attempt from a callback or status query.
///
/// Runs in one transaction: the attempt row is locked, and if it is still
/// pending the result is stored. A successful payment marks the order paid,
/// moves a pending order to processing and notifies the customer. Money
/// that lands on a cancelled order leaves the order cancelled and is logged
/// as an error for a manual refund. Returns `None` for unknown checkout ids.
///
/// # Errors
///
/// Returns `RepositoryError` if a query fails; the transaction rolls back.
#[instrument(skip(pool, result), fields(checkout_request_id = %result.checkout_request_id))]
pub async fn apply_result(
    pool: &PgPool,
    result: &PaymentResult,
) -> Result<Option<PaymentAttempt>, RepositoryError> {
    let mut tx = pool.begin().await?;

    let Some(attempt) = payments::lock_by_checkout_id(&mut tx, &result.checkout_request_id).await?
    else {
        tracing::warn!("Payment result for unknown checkout request");
        return Ok(None);
    };

    if attempt.status != PaymentAttemptStatus::Pending {
        tracing::info!(status = %attempt.status, "Payment already settled, ignoring result");
        return Ok(Some(attempt));
    }

    let settled = payments::settle(&mut tx, attempt.id, result).await?;

    let order = orders::lock_order(&mut tx, settled.order_id)
        .await?
        .ok_or(RepositoryError::NotFound)?;

    match settled.status {
        PaymentAttemptStatus::Completed => {
            orders::update_payment_status(&mut tx, order.id, PaymentStatus::Paid).await?;
            let cancelled = order.status == OrderStatus::Cancelled;
            if cancelled {
                tracing::error!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    amount = %settled.amount,
                    receipt = ?settled.mpesa_receipt,
                    "Payment received for a cancelled order, manual refund required"
                );
            } else if order.status == OrderStatus::Pending {
                orders::update_status(
                    &mut tx,
                    &order,
                    OrderStatus::Processing,
                    Some("Payment received"),
                    None,
                )
                .await?;
            }
            let (title, message) = payment_notice(
                &order.order_number,
                cancelled,
                settled.amount,
                settled.mpesa_receipt.as_deref(),
            );
            notifications::insert(
                &mut tx,
                &NewNotification {
                    user_id: order.user_id,
                    kind: kind::PAYMENT_RECEIVED,
                    title: title.to_string(),
                    message,
                    link: Some(format!("/orders/{}", order.id)),
                },
            )
            .await?;
            if !cancelled {
                tracing::info!(
                    order_id = %order.id,
                    receipt = ?settled.mpesa_receipt,
                    "Order paid"
                );
            }
        }
        PaymentAttemptStatus::Failed | PaymentAttemptStatus::Cancelled => {
            if order.payment_status == PaymentStatus::Pending {
                orders::update_payment_status(&mut tx, order.id, PaymentStatus::Failed).await?;
            }
            tracing::info!(
                order_id = %order.id,
                result_code = result.result_code,
                result_desc = %result.result_desc,
                "Payment not completed"
            );
        }
        PaymentAttemptStatus::Pending => {}
    }

    tx.commit().await?;
    Ok(Some(settled))
}

/// Title and body of the customer's payment notification.
fn payment_notice(
    order_number: &str,
    order_cancelled: bool,
    amount: Decimal,
    receipt: Option<&str>,
) -> (&'static str, String) {
    let receipt = receipt.unwrap_or("-");
    if order_cancelled {
        (
            "Payment received for a cancelled order",
            format!(
                "We received KES {amount:.2} for order {order_number} (M-Pesa {receipt}), \
                 but the order was already cancelled. The payment will be refunded."
            ),
        )
    } else {
        (
            "Payment received",
            format!("We received KES {amount:.2} for order {order_number} (M-Pesa {receipt})."),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_notice_for_open_order() {
        let (title, message) =
            payment_notice("ORD-000042", false, Decimal::new(150_000, 2), Some("QKX1"));
        assert_eq!(title, "Payment received");
        assert_eq!(message, "We received KES 1500.00 for order ORD-000042 (M-Pesa QKX1).");
    }

    #[test]
    fn test_payment_notice_for_cancelled_order_promises_refund() {
        let (title, message) = payment_notice("ORD-000042", true, Decimal::new(999, 0), None);
        assert_eq!(title, "Payment received for a cancelled order");
        assert!(message.contains("already cancelled"));
        assert!(message.contains("refunded"));
        assert!(message.contains("(M-Pesa -)"));
    }
}
