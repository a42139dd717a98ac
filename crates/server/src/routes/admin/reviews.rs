//! Review moderation.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use solarshop_core::{ReviewId, ReviewStatus};

use crate::db::ReviewRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::Page;
use crate::models::review::{Review, ReviewFilter, ReviewWithAuthor};
use crate::state::AppState;

/// GET /api/admin/reviews
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<ReviewFilter>,
) -> Result<Json<Page<ReviewWithAuthor>>> {
    let (rows, total) = ReviewRepository::new(state.pool())
        .list_admin(&filter)
        .await?;
    Ok(Json(Page::new(rows, total, filter.page_params())))
}

/// PUT /api/admin/reviews/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    let review = ReviewRepository::new(state.pool())
        .set_status(id, ReviewStatus::Approved)
        .await?;
    Ok(Json(review))
}

/// PUT /api/admin/reviews/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    let review = ReviewRepository::new(state.pool())
        .set_status(id, ReviewStatus::Rejected)
        .await?;
    Ok(Json(review))
}

/// DELETE /api/admin/reviews/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ReviewRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
