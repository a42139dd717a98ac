//! Stock movement ledger.
//!
//! [`record_movement`] is the only code path that changes
//! `products.stock_quantity`. It runs inside a transaction owned by the
//! caller, so a checkout, cancellation or stock-take either records every
//! movement it needs or none of them.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use solarshop_core::{ProductId, ProductStatus};

use super::RepositoryError;
use crate::models::inventory::{
    AuditDiscrepancy, LowStockProduct, MovementFilter, NewMovement, StockMovement,
    StockMovementWithProduct,
};

const MOVEMENT_COLUMNS: &str = "m.id, m.product_id, m.movement_type, m.quantity, \
                                m.quantity_before, m.quantity_after, m.reference_type, \
                                m.reference_id, m.note, m.created_by, m.created_at";

/// A product row held under `FOR UPDATE` for the rest of the transaction.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedProduct {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub status: ProductStatus,
}

/// Lock a set of products in ascending id order.
///
/// Every multi-product transaction locks through this function so two
/// checkouts touching the same products can't deadlock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<LockedProduct>, RepositoryError> {
    let mut raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    raw.sort_unstable();
    raw.dedup();

    let rows = sqlx::query_as::<_, LockedProduct>(
        r"
        SELECT id, name, sku, price, stock_quantity, status
        FROM products
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(&raw)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Append a movement and update the product's running balance.
///
/// 1. Lock the product row.
/// 2. Compute the new balance with [`solarshop_core::MovementType::apply`].
/// 3. Insert the movement with its before/after balances.
/// 4. Write the new balance back to the product.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product doesn't exist.
/// Returns `RepositoryError::Ledger` for invalid quantities or insufficient stock.
/// Returns `RepositoryError::Database` if a query fails.
pub async fn record_movement(
    conn: &mut PgConnection,
    input: &NewMovement,
) -> Result<StockMovement, RepositoryError> {
    let current = sqlx::query_scalar::<_, i32>(
        "SELECT stock_quantity FROM products WHERE id = $1 FOR UPDATE",
    )
    .bind(input.product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    let next = input.movement_type.apply(current, input.quantity)?;

    let movement = sqlx::query_as::<_, StockMovement>(
        r"
        INSERT INTO stock_movements
            (product_id, movement_type, quantity, quantity_before, quantity_after,
             reference_type, reference_id, note, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, product_id, movement_type, quantity, quantity_before, quantity_after,
                  reference_type, reference_id, note, created_by, created_at
        ",
    )
    .bind(input.product_id)
    .bind(input.movement_type)
    .bind(input.quantity)
    .bind(current)
    .bind(next)
    .bind(&input.reference_type)
    .bind(input.reference_id)
    .bind(&input.note)
    .bind(input.created_by)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1")
        .bind(input.product_id)
        .bind(next)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(
        product_id = %input.product_id,
        movement_type = %input.movement_type,
        quantity = input.quantity,
        before = current,
        after = next,
        "Stock movement recorded"
    );

    Ok(movement)
}

/// Read-side queries over the ledger.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filtered ledger listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
    ) -> Result<(Vec<StockMovementWithProduct>, i64), RepositoryError> {
        const WHERE: &str = r"
            WHERE ($1::int4 IS NULL OR m.product_id = $1)
              AND ($2::movement_type IS NULL OR m.movement_type = $2)
              AND ($3::timestamptz IS NULL OR m.created_at >= $3)
              AND ($4::timestamptz IS NULL OR m.created_at < $4)
        ";
        let params = filter.page_params();

        let rows = sqlx::query_as::<_, StockMovementWithProduct>(&format!(
            r"
            SELECT {MOVEMENT_COLUMNS}, p.name AS product_name, p.sku
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            {WHERE}
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $5 OFFSET $6
            "
        ))
        .bind(filter.product_id)
        .bind(filter.movement_type)
        .bind(filter.from)
        .bind(filter.to)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_movements m {WHERE}"
        ))
        .bind(filter.product_id)
        .bind(filter.movement_type)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Full history of one product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_history(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockMovement>, RepositoryError> {
        let rows = sqlx::query_as::<_, StockMovement>(&format!(
            r"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements m
            WHERE m.product_id = $1
            ORDER BY m.created_at ASC, m.id ASC
            "
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Active products at or below `threshold` units.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<LowStockProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, LowStockProduct>(
            r"
            SELECT id, name, sku, stock_quantity, status
            FROM products
            WHERE status = 'active' AND stock_quantity <= $1
            ORDER BY stock_quantity ASC, name ASC
            ",
        )
        .bind(threshold)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of active products at or below `threshold` units.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock_count(&self, threshold: i32) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE status = 'active' AND stock_quantity <= $1",
        )
        .bind(threshold)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Products whose stored balance differs from the sum of their movements.
    ///
    /// The signed effect mirrors `MovementType::signed_delta`: sales subtract,
    /// everything else adds its (possibly negative) quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn audit(&self) -> Result<Vec<AuditDiscrepancy>, RepositoryError> {
        let rows = sqlx::query_as::<_, AuditDiscrepancy>(
            r"
            SELECT p.id AS product_id, p.name, p.sku, p.stock_quantity,
                   COALESCE(SUM(CASE WHEN m.movement_type = 'sale' THEN -m.quantity
                                     ELSE m.quantity END), 0)::int8 AS ledger_quantity,
                   COUNT(m.id) AS movement_count
            FROM products p
            LEFT JOIN stock_movements m ON m.product_id = p.id
            GROUP BY p.id
            HAVING p.stock_quantity <> COALESCE(SUM(CASE WHEN m.movement_type = 'sale'
                                                         THEN -m.quantity
                                                         ELSE m.quantity END), 0)
            ORDER BY p.id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
