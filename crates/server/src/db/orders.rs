//! Order repository.
//!
//! Writes that belong to a larger transaction (checkout, cancellation,
//! payment confirmation) are free functions over a `PgConnection`; reads go
//! through [`OrderRepository`].

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use solarshop_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::address::AddressSnapshot;
use crate::models::order::{
    NewOrderItem, Order, OrderDetail, OrderFilter, OrderItem, OrderStatusChange, OrderSummary,
    OrderTotals, order_number,
};
use crate::models::pagination::PageParams;
use crate::models::payment::PaymentAttempt;

const ORDER_COLUMNS: &str = "o.id, o.order_number, o.user_id, o.status, o.payment_status, \
                             o.subtotal, o.shipping_fee, o.tax, o.total, o.shipping_address, \
                             o.notes, o.created_at, o.updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, sku, unit_price, quantity, \
                            line_total";

/// Insert a pending order. The id is drawn first so the order number can be
/// derived from it in the same statement.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: UserId,
    totals: &OrderTotals,
    address: &AddressSnapshot,
    notes: Option<&str>,
) -> Result<Order, RepositoryError> {
    let id = sqlx::query_scalar::<_, i32>(
        "SELECT nextval(pg_get_serial_sequence('orders', 'id'))::int4",
    )
    .fetch_one(&mut *conn)
    .await?;

    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        INSERT INTO orders AS o
            (id, order_number, user_id, subtotal, shipping_fee, tax, total, shipping_address, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(id)
    .bind(order_number(id))
    .bind(user_id)
    .bind(totals.subtotal)
    .bind(totals.shipping_fee)
    .bind(totals.tax)
    .bind(totals.total)
    .bind(Json(address))
    .bind(notes)
    .fetch_one(&mut *conn)
    .await?;

    record_status_change(conn, order.id, None, OrderStatus::Pending, None, Some(user_id)).await?;

    Ok(order)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    item: &NewOrderItem,
) -> Result<OrderItem, RepositoryError> {
    let row = sqlx::query_as::<_, OrderItem>(&format!(
        r"
        INSERT INTO order_items
            (order_id, product_id, product_name, sku, unit_price, quantity, line_total)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {ITEM_COLUMNS}
        "
    ))
    .bind(order_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(&item.sku)
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(item.line_total())
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Lock an order row for a status or payment change.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_order(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(order)
}

/// Lines of an order, in product id order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_of(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<OrderItem>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY product_id, id"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Move an order to `next` and append the change to its history.
///
/// The caller has validated the transition.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn update_status(
    conn: &mut PgConnection,
    order: &Order,
    next: OrderStatus,
    note: Option<&str>,
    changed_by: Option<UserId>,
) -> Result<Order, RepositoryError> {
    let updated = sqlx::query_as::<_, Order>(&format!(
        r"
        UPDATE orders AS o SET status = $2, updated_at = NOW()
        WHERE o.id = $1
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order.id)
    .bind(next)
    .fetch_one(&mut *conn)
    .await?;

    record_status_change(conn, order.id, Some(order.status), next, note, changed_by).await?;

    Ok(updated)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn update_payment_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: PaymentStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn record_status_change(
    conn: &mut PgConnection,
    order_id: OrderId,
    from: Option<OrderStatus>,
    to: OrderStatus,
    note: Option<&str>,
    changed_by: Option<UserId>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO order_status_history (order_id, from_status, to_status, note, changed_by)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(order_id)
    .bind(from)
    .bind(to)
    .bind(note)
    .bind(changed_by)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Read-side order queries.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// An order, only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 AND o.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        params: PageParams,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders o
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Load lines, payment attempts and history for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn detail(&self, order: Order) -> Result<OrderDetail, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let items = items_of(&mut conn, order.id).await?;

        let payments = sqlx::query_as::<_, PaymentAttempt>(
            r"
            SELECT id, order_id, user_id, phone, amount, merchant_request_id,
                   checkout_request_id, status, result_code, result_desc, mpesa_receipt,
                   created_at, updated_at
            FROM payments WHERE order_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(order.id)
        .fetch_all(&mut *conn)
        .await?;

        let history = sqlx::query_as::<_, OrderStatusChange>(
            r"
            SELECT from_status, to_status, note, changed_by, created_at
            FROM order_status_history WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(order.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(OrderDetail {
            order,
            items,
            payments,
            history,
        })
    }

    /// Admin order listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_admin(
        &self,
        filter: &OrderFilter,
    ) -> Result<(Vec<OrderSummary>, i64), RepositoryError> {
        const WHERE: &str = r"
            WHERE ($1::order_status IS NULL OR o.status = $1)
              AND ($2::payment_status IS NULL OR o.payment_status = $2)
              AND ($3::text IS NULL OR o.order_number ILIKE $3 OR u.email ILIKE $3)
        ";
        let params = filter.page_params();
        let pattern = filter.q.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, OrderSummary>(&format!(
            r"
            SELECT {ORDER_COLUMNS}, u.email AS customer_email,
                   TRIM(u.first_name || ' ' || u.last_name) AS customer_name,
                   (SELECT COALESCE(SUM(oi.quantity), 0)::int8
                    FROM order_items oi WHERE oi.order_id = o.id) AS item_count
            FROM orders o
            JOIN users u ON u.id = o.user_id
            {WHERE}
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(filter.status)
        .bind(filter.payment_status)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id {WHERE}"
        ))
        .bind(filter.status)
        .bind(filter.payment_status)
        .bind(&pattern)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Most recent orders for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<OrderSummary>, RepositoryError> {
        let filter = OrderFilter {
            per_page: u32::try_from(limit).ok(),
            ..OrderFilter::default()
        };
        let (rows, _) = self.list_admin(&filter).await?;
        Ok(rows)
    }

    /// Whether the user has a paid, non-cancelled order containing the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_paid_purchase(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let found = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM orders o
                JOIN order_items oi ON oi.order_id = o.id
                WHERE o.user_id = $1 AND oi.product_id = $2
                  AND o.payment_status = 'paid' AND o.status <> 'cancelled'
            )
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(found)
    }
}
