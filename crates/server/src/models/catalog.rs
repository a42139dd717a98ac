//! Catalog models: categories, products and product images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use solarshop_core::{CategoryId, ProductId, ProductImageId, ProductStatus};

use super::pagination::PageParams;
use super::review::ReviewSummary;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// A catalog product.
///
/// `stock_quantity` is a running balance maintained by the stock movement
/// ledger and is read-only everywhere else.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: String,
    pub specifications: serde_json::Value,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub status: ProductStatus,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product row for listings, with its category name and primary image.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub primary_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    /// Path relative to the upload directory.
    pub path: String,
    pub alt_text: Option<String>,
    pub is_primary: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl ProductImage {
    /// Public URL under the `/uploads` static route.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/uploads/{}", self.path)
    }
}

/// Product page payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub images: Vec<ProductImage>,
    pub reviews: ReviewSummary,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// `ORDER BY` clause. Values are fixed strings, never user input.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id DESC",
            Self::Name => "LOWER(p.name) ASC, p.id ASC",
        }
    }
}

/// `GET /api/products` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub q: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    /// Admin listings only; the storefront always filters on `active`.
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductFilter {
    #[must_use]
    pub const fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub slug: Option<String>,
    pub sku: String,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub specifications: Option<serde_json::Value>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    /// Recorded as a `purchase` movement, never written directly.
    #[serde(default)]
    pub initial_stock: i32,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub featured: bool,
}

/// Input for updating a product. Stock is not editable here.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProduct {
    pub name: String,
    pub slug: Option<String>,
    pub sku: String,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub description: String,
    pub specifications: Option<serde_json::Value>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub status: ProductStatus,
    #[serde(default)]
    pub featured: bool,
}

/// Derive a URL slug: lowercase ASCII alphanumerics separated by single dashes.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("300W Mono Solar Panel"), "300w-mono-solar-panel");
        assert_eq!(slugify("  Inverter -- 5kVA (Hybrid) "), "inverter-5kva-hybrid");
        assert_eq!(slugify("Ülträ"), "ltr");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_sort_deserialize() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap_or_default();
        assert_eq!(sort, ProductSort::PriceDesc);
        assert_eq!(ProductSort::default().order_by(), "p.created_at DESC, p.id DESC");
    }
}
