//! Persistent per-user cart.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use solarshop_core::{ProductId, ProductStatus, UserId};

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::cart::{AddToCart, Cart, SetQuantity};
use crate::state::AppState;

/// GET /api/cart
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Cart>> {
    load_cart(&state, user.id).await.map(Json)
}

/// POST /api/cart/items
///
/// Adding a product already in the cart merges the quantities.
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<AddToCart>,
) -> Result<Json<Cart>> {
    if req.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".to_string()));
    }

    let carts = CartRepository::new(state.pool());
    let existing = carts.quantity_of(user.id, req.product_id).await?;
    let quantity = existing
        .checked_add(req.quantity)
        .ok_or_else(|| AppError::BadRequest("Quantity is too large".to_string()))?;

    ensure_stock(&state, req.product_id, quantity).await?;
    carts.set_quantity(user.id, req.product_id, quantity).await?;

    load_cart(&state, user.id).await.map(Json)
}

/// PUT /api/cart/items/{product_id}
///
/// A quantity of zero removes the line.
pub async fn set_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(req): Json<SetQuantity>,
) -> Result<Json<Cart>> {
    let carts = CartRepository::new(state.pool());
    match req.quantity {
        q if q < 0 => {
            return Err(AppError::BadRequest("Quantity cannot be negative".to_string()));
        }
        0 => {
            carts.remove(user.id, product_id).await?;
        }
        q => {
            ensure_stock(&state, product_id, q).await?;
            carts.set_quantity(user.id, product_id, q).await?;
        }
    }

    load_cart(&state, user.id).await.map(Json)
}

/// DELETE /api/cart/items/{product_id}
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Cart>> {
    if !CartRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?
    {
        return Err(AppError::NotFound("Item is not in the cart".to_string()));
    }
    load_cart(&state, user.id).await.map(Json)
}

/// DELETE /api/cart
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<StatusCode> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn load_cart(state: &AppState, user_id: UserId) -> Result<Cart> {
    let items = CartRepository::new(state.pool()).items(user_id).await?;
    Ok(Cart::from_items(items))
}

/// The product is on sale and has at least `quantity` in stock.
///
/// Stock is re-checked under lock at checkout; this only keeps carts honest.
async fn ensure_stock(state: &AppState, product_id: ProductId, quantity: i32) -> Result<()> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    if product.status != ProductStatus::Active {
        return Err(AppError::Conflict(format!("{} is not available", product.name)));
    }
    if quantity > product.stock_quantity {
        return Err(AppError::Conflict(format!(
            "Only {} of {} in stock",
            product.stock_quantity, product.name
        )));
    }
    Ok(())
}
