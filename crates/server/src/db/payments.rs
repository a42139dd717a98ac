//! M-Pesa payment attempts.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use solarshop_core::{OrderId, PaymentAttemptStatus, PaymentId, UserId};

use super::RepositoryError;
use crate::models::payment::{PaymentAttempt, PaymentResult};

const PAYMENT_COLUMNS: &str = "id, order_id, user_id, phone, amount, merchant_request_id, \
                               checkout_request_id, status, result_code, result_desc, \
                               mpesa_receipt, created_at, updated_at";

/// Lock a pending or settled attempt by its Safaricom checkout id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_checkout_id(
    conn: &mut PgConnection,
    checkout_request_id: &str,
) -> Result<Option<PaymentAttempt>, RepositoryError> {
    let attempt = sqlx::query_as::<_, PaymentAttempt>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE checkout_request_id = $1 FOR UPDATE"
    ))
    .bind(checkout_request_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(attempt)
}

/// Whether an STK push for the order is still waiting for its result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn has_pending(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<bool, RepositoryError> {
    let pending = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM payments WHERE order_id = $1 AND status = $2)",
    )
    .bind(order_id)
    .bind(PaymentAttemptStatus::Pending)
    .fetch_one(&mut *conn)
    .await?;
    Ok(pending)
}

/// Store the final result of an attempt.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if the result code doesn't fit
/// the column. Returns `RepositoryError::Database` if the query fails.
pub async fn settle(
    conn: &mut PgConnection,
    id: PaymentId,
    result: &PaymentResult,
) -> Result<PaymentAttempt, RepositoryError> {
    let code = i32::try_from(result.result_code).map_err(|_| {
        RepositoryError::DataCorruption(format!("result code {} out of range", result.result_code))
    })?;

    let attempt = sqlx::query_as::<_, PaymentAttempt>(&format!(
        r"
        UPDATE payments
        SET status = $2, result_code = $3, result_desc = $4, mpesa_receipt = $5,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PAYMENT_COLUMNS}
        "
    ))
    .bind(id)
    .bind(result.status())
    .bind(code)
    .bind(&result.result_desc)
    .bind(&result.receipt)
    .fetch_one(&mut *conn)
    .await?;
    Ok(attempt)
}

/// Fields of a freshly accepted STK push.
#[derive(Debug, Clone)]
pub struct NewAttempt<'s> {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub phone: &'s str,
    pub amount: Decimal,
    pub merchant_request_id: &'s str,
    pub checkout_request_id: &'s str,
}

/// Repository for payment attempts.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a pending attempt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the checkout id was already recorded.
    pub async fn create(&self, new: &NewAttempt<'_>) -> Result<PaymentAttempt, RepositoryError> {
        sqlx::query_as::<_, PaymentAttempt>(&format!(
            r"
            INSERT INTO payments
                (order_id, user_id, phone, amount, merchant_request_id, checkout_request_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PAYMENT_COLUMNS}
            "
        ))
        .bind(new.order_id)
        .bind(new.user_id)
        .bind(new.phone)
        .bind(new.amount)
        .bind(new.merchant_request_id)
        .bind(new.checkout_request_id)
        .bind(PaymentAttemptStatus::Pending)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or(e, "checkout request already recorded"))
    }

    /// An attempt by checkout id, only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        checkout_request_id: &str,
    ) -> Result<Option<PaymentAttempt>, RepositoryError> {
        let attempt = sqlx::query_as::<_, PaymentAttempt>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE checkout_request_id = $1 AND user_id = $2"
        ))
        .bind(checkout_request_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(attempt)
    }

    /// Attempts for an order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<PaymentAttempt>, RepositoryError> {
        let rows = sqlx::query_as::<_, PaymentAttempt>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
