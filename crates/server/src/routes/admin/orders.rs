//! Order management.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use solarshop_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Page;
use crate::models::order::{OrderDetail, OrderFilter, OrderSummary, StatusUpdate};
use crate::services::orders;
use crate::state::AppState;

/// GET /api/admin/orders
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Page<OrderSummary>>> {
    let (rows, total) = OrderRepository::new(state.pool())
        .list_admin(&filter)
        .await?;
    Ok(Json(Page::new(rows, total, filter.page_params())))
}

/// GET /api/admin/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(Json(repo.detail(order).await?))
}

/// PUT /api/admin/orders/{id}/status
///
/// Cancelling restocks every line; the customer is notified either way.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<OrderDetail>> {
    let note = req.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let order = orders::change_status(state.pool(), admin.id, id, req.status, note).await?;
    let detail = OrderRepository::new(state.pool()).detail(order).await?;
    Ok(Json(detail))
}
