//! Admin dashboard aggregates.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use solarshop_core::OrderStatus;

use super::{
    InventoryRepository, OrderRepository, QuoteRepository, RepositoryError, ReviewRepository,
};
use crate::models::order::OrderSummary;

/// Orders per status.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// `GET /api/admin/dashboard` payload.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub customers: i64,
    pub orders_by_status: Vec<StatusCount>,
    pub revenue_total: Decimal,
    pub revenue_30_days: Decimal,
    pub pending_quotes: i64,
    pub pending_reviews: i64,
    pub low_stock: i64,
    pub recent_orders: Vec<OrderSummary>,
}

/// Gather dashboard numbers. Revenue counts paid, non-cancelled orders.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn stats(
    pool: &PgPool,
    low_stock_threshold: i32,
) -> Result<DashboardStats, RepositoryError> {
    let customers =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'customer'")
            .fetch_one(pool)
            .await?;

    let orders_by_status = sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
    )
    .fetch_all(pool)
    .await?;

    let (revenue_total, revenue_30_days) = sqlx::query_as::<_, (Decimal, Decimal)>(
        r"
        SELECT COALESCE(SUM(total), 0),
               COALESCE(SUM(total) FILTER (WHERE created_at >= NOW() - INTERVAL '30 days'), 0)
        FROM orders
        WHERE payment_status = 'paid' AND status <> 'cancelled'
        ",
    )
    .fetch_one(pool)
    .await?;

    Ok(DashboardStats {
        customers,
        orders_by_status,
        revenue_total,
        revenue_30_days,
        pending_quotes: QuoteRepository::new(pool).count_pending().await?,
        pending_reviews: ReviewRepository::new(pool).count_pending().await?,
        low_stock: InventoryRepository::new(pool)
            .low_stock_count(low_stock_threshold)
            .await?,
        recent_orders: OrderRepository::new(pool).recent(10).await?,
    })
}
