//! Public catalog: categories, products and reviews.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;

use solarshop_core::{ProductId, ProductStatus};

use crate::db::{OrderRepository, ProductRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::catalog::{Category, ProductDetail, ProductFilter, ProductSummary};
use crate::models::review::{NewReview, Review, ReviewSummary, ReviewWithAuthor};
use crate::models::{Page, PageParams};
use crate::state::AppState;

const MAX_REVIEW_TITLE_LEN: usize = 120;
const MAX_REVIEW_BODY_LEN: usize = 4000;

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = ProductRepository::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// GET /api/products
///
/// Only active products are listed, whatever `status` the caller sends.
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Page<ProductSummary>>> {
    let (rows, total) = ProductRepository::new(state.pool())
        .list(&filter, Some(ProductStatus::Active))
        .await?;
    Ok(Json(Page::new(rows, total, filter.page_params())))
}

/// GET /api/products/{slug}
pub async fn product_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let products = ProductRepository::new(state.pool());
    let summary = products
        .get_active_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let images = products.list_images(summary.product.id).await?;
    let reviews = ReviewRepository::new(state.pool())
        .summary(summary.product.id)
        .await?;

    Ok(Json(ProductDetail {
        product: summary.product,
        category_name: summary.category_name,
        images,
        reviews,
    }))
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub summary: ReviewSummary,
    #[serde(flatten)]
    pub reviews: Page<ReviewWithAuthor>,
}

/// GET /api/products/{id}/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProductReviews>> {
    let reviews = ReviewRepository::new(state.pool());
    let summary = reviews.summary(product_id).await?;
    let (rows, total) = reviews.list_approved(product_id, params).await?;
    Ok(Json(ProductReviews {
        summary,
        reviews: Page::new(rows, total, params),
    }))
}

/// POST /api/products/{id}/reviews
///
/// Reviews start out pending and only show up once approved.
pub async fn create_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(req): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    validate_review(&req)?;

    let product = ProductRepository::new(state.pool())
        .get_by_id(product_id)
        .await?
        .filter(|p| p.status == ProductStatus::Active)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let verified = OrderRepository::new(state.pool())
        .has_paid_purchase(user.id, product.id)
        .await?;

    let review = ReviewRepository::new(state.pool())
        .create(product.id, user.id, &req, verified)
        .await?;

    tracing::info!(review_id = %review.id, product_id = %product.id, verified, "Review submitted");
    Ok((StatusCode::CREATED, Json(review)))
}

fn validate_review(review: &NewReview) -> Result<()> {
    if !(1..=5).contains(&review.rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5".to_string()));
    }
    let body = review.body.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("Review text is required".to_string()));
    }
    if body.chars().count() > MAX_REVIEW_BODY_LEN {
        return Err(AppError::BadRequest("Review text is too long".to_string()));
    }
    if review
        .title
        .as_deref()
        .is_some_and(|t| t.chars().count() > MAX_REVIEW_TITLE_LEN)
    {
        return Err(AppError::BadRequest("Review title is too long".to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn review(rating: i16, body: &str) -> NewReview {
        NewReview {
            rating,
            title: None,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_review(&review(1, "Works well")).is_ok());
        assert!(validate_review(&review(5, "Works well")).is_ok());
        assert!(validate_review(&review(0, "Works well")).is_err());
        assert!(validate_review(&review(6, "Works well")).is_err());
    }

    #[test]
    fn test_body_required() {
        assert!(validate_review(&review(4, "   ")).is_err());
        assert!(validate_review(&review(4, &"x".repeat(MAX_REVIEW_BODY_LEN + 1))).is_err());
    }

    #[test]
    fn test_long_title_rejected() {
        let mut r = review(3, "Fine");
        r.title = Some("t".repeat(MAX_REVIEW_TITLE_LEN + 1));
        assert!(validate_review(&r).is_err());
    }
}
