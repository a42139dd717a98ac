//! Checkout and the customer's order history.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use solarshop_core::{OrderId, UserId};

use crate::db::{OrderRepository, PaymentRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::order::{CheckoutRequest, Order, OrderDetail};
use crate::models::payment::PaymentAttempt;
use crate::models::{Page, PageParams};
use crate::services::{checkout, orders};
use crate::state::AppState;

/// POST /api/checkout
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let placed = checkout::place_order(
        state.pool(),
        state.email(),
        &user,
        req.address_id,
        req.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()),
        &state.config().base_url,
    )
    .await?;

    tracing::info!(
        order_number = %placed.order.order_number,
        total = %placed.order.total,
        "Order placed"
    );

    let detail = OrderRepository::new(state.pool())
        .detail(placed.order)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/orders
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Order>>> {
    let (rows, total) = OrderRepository::new(state.pool())
        .list_for_user(user.id, params)
        .await?;
    Ok(Json(Page::new(rows, total, params)))
}

/// GET /api/orders/{id}
///
/// Someone else's order is indistinguishable from a missing one.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let repo = OrderRepository::new(state.pool());
    let order = own_order(&repo, user.id, order_id).await?;
    Ok(Json(repo.detail(order).await?))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = orders::cancel_by_customer(state.pool(), user.id, order_id).await?;
    let detail = OrderRepository::new(state.pool()).detail(order).await?;
    Ok(Json(detail))
}

/// GET /api/orders/{id}/payments
pub async fn payments(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Vec<PaymentAttempt>>> {
    let order = own_order(&OrderRepository::new(state.pool()), user.id, order_id).await?;
    let attempts = PaymentRepository::new(state.pool())
        .list_for_order(order.id)
        .await?;
    Ok(Json(attempts))
}

async fn own_order(
    repo: &OrderRepository<'_>,
    user_id: UserId,
    order_id: OrderId,
) -> Result<Order> {
    repo.get_for_user(user_id, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}
