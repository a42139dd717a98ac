//! Catalog management: categories, products and product images.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Serialize;

use solarshop_core::{CategoryId, ProductId, ProductImageId};

use crate::db::{ProductRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Page;
use crate::models::catalog::{
    Category, CategoryInput, NewProduct, Product, ProductDetail, ProductFilter, ProductImage,
    ProductSummary, UpdateProduct, slugify,
};
use crate::state::AppState;

/// Multipart field holding the image bytes.
const IMAGE_FIELD: &str = "image";
const ALT_TEXT_FIELD: &str = "alt_text";

// =============================================================================
// Categories
// =============================================================================

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let category = ProductRepository::new(state.pool())
        .create_category(&input, &slug)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/admin/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let category = ProductRepository::new(state.pool())
        .update_category(id, &input, &slug)
        .await?;
    Ok(Json(category))
}

/// DELETE /api/admin/categories/{id}
///
/// Products in the category become uncategorized.
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .delete_category(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

/// GET /api/admin/products
///
/// All statuses unless `status` is given.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Page<ProductSummary>>> {
    let (rows, total) = ProductRepository::new(state.pool())
        .list(&filter, filter.status)
        .await?;
    Ok(Json(Page::new(rows, total, filter.page_params())))
}

/// GET /api/admin/products/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    let products = ProductRepository::new(state.pool());
    let product = products
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let category_name = match product.category_id {
        Some(category_id) => products
            .list_categories()
            .await?
            .into_iter()
            .find(|c| c.id == category_id)
            .map(|c| c.name),
        None => None,
    };

    Ok(Json(ProductDetail {
        images: products.list_images(id).await?,
        reviews: ReviewRepository::new(state.pool()).summary(id).await?,
        category_name,
        product,
    }))
}

/// POST /api/admin/products
///
/// Initial stock goes through the ledger as a purchase.
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    validate_fields(&input.name, &input.sku, input.price, input.compare_at_price)?;
    if input.initial_stock < 0 {
        return Err(AppError::BadRequest(
            "Initial stock cannot be negative".to_string(),
        ));
    }
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;

    let product = ProductRepository::new(state.pool())
        .create(&input, &slug, admin.id)
        .await?;

    tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/admin/products/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(input): Json<UpdateProduct>,
) -> Result<Json<Product>> {
    validate_fields(&input.name, &input.sku, input.price, input.compare_at_price)?;
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;

    let product = ProductRepository::new(state.pool())
        .update(id, &input, &slug)
        .await?;
    Ok(Json(product))
}

/// DELETE /api/admin/products/{id}
///
/// Products are archived, never deleted, so order history keeps working.
pub async fn archive(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).archive(id).await?;
    tracing::info!(product_id = %id, "Product archived");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Images
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    #[serde(flatten)]
    pub image: ProductImage,
    pub url: String,
}

/// POST /api/admin/products/{id}/images
pub async fn upload_image(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedImage>)> {
    let mut bytes = None;
    let mut alt_text = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some(IMAGE_FIELD) => {
                bytes = Some(field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read image: {e}"))
                })?);
            }
            Some(ALT_TEXT_FIELD) => {
                alt_text = field
                    .text()
                    .await
                    .ok()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let bytes =
        bytes.ok_or_else(|| AppError::BadRequest("Missing `image` field".to_string()))?;

    let path = state.uploads().save_product_image(&bytes).await?;
    let image = match ProductRepository::new(state.pool())
        .add_image(id, &path, alt_text.as_deref())
        .await
    {
        Ok(image) => image,
        Err(e) => {
            // Don't leave an orphaned file behind.
            if let Err(remove_err) = state.uploads().remove(&path).await {
                tracing::warn!(error = %remove_err, path = %path, "Failed to remove upload");
            }
            return Err(e.into());
        }
    };

    tracing::info!(product_id = %id, image_id = %image.id, "Product image uploaded");
    Ok((
        StatusCode::CREATED,
        Json(UploadedImage {
            url: image.url(),
            image,
        }),
    ))
}

/// DELETE /api/admin/products/{id}/images/{image_id}
pub async fn delete_image(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((id, image_id)): Path<(ProductId, ProductImageId)>,
) -> Result<StatusCode> {
    let path = ProductRepository::new(state.pool())
        .delete_image(id, image_id)
        .await?;

    if let Err(e) = state.uploads().remove(&path).await {
        tracing::warn!(error = %e, path = %path, "Image row deleted but file removal failed");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/products/{id}/images/{image_id}/primary
pub async fn set_primary_image(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((id, image_id)): Path<(ProductId, ProductImageId)>,
) -> Result<Json<Vec<ProductImage>>> {
    let products = ProductRepository::new(state.pool());
    products.set_primary_image(id, image_id).await?;
    Ok(Json(products.list_images(id).await?))
}

// =============================================================================
// Validation
// =============================================================================

/// Explicit slug if given, otherwise derived from the name.
fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String> {
    let slug = explicit
        .map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| slugify(name));
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "Name must contain letters or digits".to_string(),
        ));
    }
    Ok(slug)
}

fn validate_fields(
    name: &str,
    sku: &str,
    price: Decimal,
    compare_at_price: Option<Decimal>,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if sku.trim().is_empty() {
        return Err(AppError::BadRequest("SKU is required".to_string()));
    }
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("Price cannot be negative".to_string()));
    }
    if compare_at_price.is_some_and(|c| c.is_sign_negative()) {
        return Err(AppError::BadRequest(
            "Compare-at price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_name() {
        assert_eq!(
            resolve_slug(None, "Lithium Battery 100Ah").unwrap(),
            "lithium-battery-100ah"
        );
    }

    #[test]
    fn test_explicit_slug_normalized() {
        assert_eq!(
            resolve_slug(Some("My Panel"), "ignored").unwrap(),
            "my-panel"
        );
        // Blank explicit slug falls back to the name.
        assert_eq!(resolve_slug(Some("  "), "Charge Controller").unwrap(), "charge-controller");
    }

    #[test]
    fn test_unsluggable_name_rejected() {
        assert!(resolve_slug(None, "???").is_err());
    }

    #[test]
    fn test_validate_fields() {
        let price = Decimal::new(12_000, 0);
        assert!(validate_fields("Panel", "PNL-1", price, None).is_ok());
        assert!(validate_fields(" ", "PNL-1", price, None).is_err());
        assert!(validate_fields("Panel", "", price, None).is_err());
        assert!(validate_fields("Panel", "PNL-1", Decimal::new(-1, 0), None).is_err());
        assert!(validate_fields("Panel", "PNL-1", price, Some(Decimal::new(-5, 0))).is_err());
    }
}
