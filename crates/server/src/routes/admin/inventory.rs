//! Stock ledger administration.
//!
//! Every stock change goes through [`inventory::record_movement`]; there is
//! no endpoint that edits `stock_quantity` or a movement row directly.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use solarshop_core::{MovementType, ProductId, ledger::stock_take_delta};

use crate::db::{InventoryRepository, RepositoryError, inventory, settings};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Page;
use crate::models::inventory::{
    AuditDiscrepancy, LowStockProduct, MovementFilter, NewMovement, StockMovement,
    StockMovementWithProduct, reference,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub note: Option<String>,
    /// Free-form reference such as a supplier invoice number.
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockTakeRequest {
    pub product_id: ProductId,
    pub counted_quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockTakeResult {
    pub product_id: ProductId,
    pub previous_quantity: i32,
    pub counted_quantity: i32,
    /// `None` when the count already matched.
    pub movement: Option<StockMovement>,
}

#[derive(Debug, Serialize)]
pub struct LowStockReport {
    pub threshold: i32,
    pub products: Vec<LowStockProduct>,
}

#[derive(Debug, Serialize)]
pub struct AuditReport {
    pub consistent: bool,
    pub discrepancies: Vec<AuditDiscrepancy>,
}

/// POST /api/admin/inventory/movements
pub async fn record(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<MovementRequest>,
) -> Result<(StatusCode, Json<StockMovement>)> {
    let note = movement_note(req.note.as_deref(), req.reference.as_deref());

    let input = NewMovement::new(req.product_id, req.movement_type, req.quantity)
        .reference(reference::MANUAL, None)
        .note(note)
        .by(admin.id);

    let mut tx = state.pool().begin().await.map_err(RepositoryError::from)?;
    let movement = inventory::record_movement(&mut tx, &input).await?;
    tx.commit().await.map_err(RepositoryError::from)?;

    tracing::info!(
        product_id = %movement.product_id,
        movement_type = %movement.movement_type,
        quantity = movement.quantity,
        after = movement.quantity_after,
        "Manual stock movement"
    );
    Ok((StatusCode::CREATED, Json(movement)))
}

/// POST /api/admin/inventory/stock-take
///
/// Records an adjustment for the difference between the count and the
/// stored balance, under the product row lock.
pub async fn stock_take(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<StockTakeRequest>,
) -> Result<Json<StockTakeResult>> {
    if req.counted_quantity < 0 {
        return Err(AppError::BadRequest(
            "Counted quantity cannot be negative".to_string(),
        ));
    }

    let mut tx = state.pool().begin().await.map_err(RepositoryError::from)?;

    let previous = inventory::lock_products(&mut tx, &[req.product_id])
        .await?
        .first()
        .map(|p| p.stock_quantity)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let movement = match stock_take_delta(previous, req.counted_quantity) {
        Some(delta) => {
            let input = NewMovement::new(req.product_id, MovementType::Adjustment, delta)
                .reference(reference::STOCK_TAKE, None)
                .note(req.note)
                .by(admin.id);
            Some(inventory::record_movement(&mut tx, &input).await?)
        }
        None => None,
    };

    tx.commit().await.map_err(RepositoryError::from)?;

    Ok(Json(StockTakeResult {
        product_id: req.product_id,
        previous_quantity: previous,
        counted_quantity: req.counted_quantity,
        movement,
    }))
}

/// GET /api/admin/inventory/movements
pub async fn list_movements(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<MovementFilter>,
) -> Result<Json<Page<StockMovementWithProduct>>> {
    let (rows, total) = InventoryRepository::new(state.pool())
        .list_movements(&filter)
        .await?;
    Ok(Json(Page::new(rows, total, filter.page_params())))
}

/// GET /api/admin/inventory/products/{id}/movements
pub async fn product_history(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<StockMovement>>> {
    let rows = InventoryRepository::new(state.pool())
        .product_history(product_id)
        .await?;
    Ok(Json(rows))
}

/// GET /api/admin/inventory/low-stock
pub async fn low_stock(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<LowStockReport>> {
    let threshold = settings::load(state.pool()).await?.low_stock_threshold;
    let products = InventoryRepository::new(state.pool())
        .low_stock(threshold)
        .await?;
    Ok(Json(LowStockReport {
        threshold,
        products,
    }))
}

/// GET /api/admin/inventory/audit
pub async fn audit(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<AuditReport>> {
    let discrepancies = InventoryRepository::new(state.pool()).audit().await?;
    if !discrepancies.is_empty() {
        tracing::warn!(count = discrepancies.len(), "Stock ledger discrepancies found");
    }
    Ok(Json(AuditReport {
        consistent: discrepancies.is_empty(),
        discrepancies,
    }))
}

/// Combine the admin's note with an optional external reference.
fn movement_note(note: Option<&str>, reference: Option<&str>) -> Option<String> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    let reference = reference.map(str::trim).filter(|r| !r.is_empty());
    match (note, reference) {
        (Some(n), Some(r)) => Some(format!("{n} (ref {r})")),
        (Some(n), None) => Some(n.to_string()),
        (None, Some(r)) => Some(format!("ref {r}")),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_note() {
        assert_eq!(
            movement_note(Some("Supplier delivery"), Some("INV-881")).as_deref(),
            Some("Supplier delivery (ref INV-881)")
        );
        assert_eq!(movement_note(None, Some(" INV-9 ")).as_deref(), Some("ref INV-9"));
        assert_eq!(movement_note(Some("Damaged"), Some("")).as_deref(), Some("Damaged"));
        assert_eq!(movement_note(Some("  "), None), None);
    }
}
