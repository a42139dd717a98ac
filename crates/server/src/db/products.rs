//! Catalog repository: categories, products and product images.

use sqlx::PgPool;

use solarshop_core::{CategoryId, MovementType, ProductId, ProductImageId, ProductStatus, UserId};

use super::inventory::record_movement;
use super::{RepositoryError, like_pattern};
use crate::models::catalog::{
    Category, CategoryInput, NewProduct, Product, ProductFilter, ProductImage, ProductSummary,
    UpdateProduct,
};
use crate::models::inventory::{NewMovement, reference};

const PRODUCT_COLUMNS: &str = "p.id, p.category_id, p.name, p.slug, p.sku, p.description, \
                               p.specifications, p.price, p.compare_at_price, p.stock_quantity, \
                               p.status, p.featured, p.created_at, p.updated_at";

const SUMMARY_JOINS: &str = r"
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN product_images i ON i.product_id = p.id AND i.is_primary
";

const IMAGE_COLUMNS: &str = "id, product_id, path, alt_text, is_primary, sort_order, created_at";

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_category(
        &self,
        input: &CategoryInput,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            INSERT INTO categories (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, description, created_at, updated_at
            ",
        )
        .bind(input.name.trim())
        .bind(slug)
        .bind(&input.description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or(e, "category slug already exists"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            UPDATE categories
            SET name = $2, slug = $3, description = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, description, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(slug)
        .bind(&input.description)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or(e, "category slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Its products become uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Filtered, sorted product listing.
    ///
    /// `status` restricts to one status; the storefront always passes `Active`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        status: Option<ProductStatus>,
    ) -> Result<(Vec<ProductSummary>, i64), RepositoryError> {
        const WHERE: &str = r"
            WHERE ($1::product_status IS NULL OR p.status = $1)
              AND ($2::text IS NULL OR p.name ILIKE $2 OR p.sku ILIKE $2 OR p.description ILIKE $2)
              AND ($3::text IS NULL OR c.slug = $3)
              AND ($4::numeric IS NULL OR p.price >= $4)
              AND ($5::numeric IS NULL OR p.price <= $5)
              AND (NOT $6::bool OR p.stock_quantity > 0)
              AND ($7::bool IS NULL OR p.featured = $7)
        ";

        let params = filter.page_params();
        let pattern = filter.q.as_deref().map(like_pattern);
        let in_stock = filter.in_stock.unwrap_or(false);

        let rows = sqlx::query_as::<_, ProductSummary>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}, c.name AS category_name,
                   '/uploads/' || i.path AS primary_image
            FROM products p
            {SUMMARY_JOINS}
            {WHERE}
            ORDER BY {}
            LIMIT $8 OFFSET $9
            ",
            filter.sort.order_by()
        ))
        .bind(status)
        .bind(&pattern)
        .bind(&filter.category)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(in_stock)
        .bind(filter.featured)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            r"
            SELECT COUNT(*)
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            {WHERE}
            "
        ))
        .bind(status)
        .bind(&pattern)
        .bind(&filter.category)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(in_stock)
        .bind(filter.featured)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Active product by slug, with its category name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductSummary>, RepositoryError> {
        let product = sqlx::query_as::<_, ProductSummary>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}, c.name AS category_name,
                   '/uploads/' || i.path AS primary_image
            FROM products p
            {SUMMARY_JOINS}
            WHERE p.slug = $1 AND p.status = 'active'
            "
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Products by id, in no particular order. Missing ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a product. A positive `initial_stock` is recorded as a
    /// `purchase` movement in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug or SKU is taken.
    /// Returns `RepositoryError::Ledger` if `initial_stock` is negative.
    pub async fn create(
        &self,
        input: &NewProduct,
        slug: &str,
        created_by: UserId,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO products AS p
                (category_id, name, slug, sku, description, specifications, price,
                 compare_at_price, status, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(slug)
        .bind(input.sku.trim())
        .bind(&input.description)
        .bind(
            input
                .specifications
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
        )
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.status)
        .bind(input.featured)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique_or(e, "slug or SKU already exists"))?;

        if input.initial_stock != 0 {
            let movement = record_movement(
                &mut tx,
                &NewMovement::new(product.id, MovementType::Purchase, input.initial_stock)
                    .reference(reference::INITIAL_STOCK, None)
                    .by(created_by),
            )
            .await?;
            product.stock_quantity = movement.quantity_after;
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Update catalog fields. Stock is untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug or SKU is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &UpdateProduct,
        slug: &str,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products AS p
            SET category_id = $2, name = $3, slug = $4, sku = $5, description = $6,
                specifications = COALESCE($7, p.specifications), price = $8,
                compare_at_price = $9, status = $10, featured = $11, updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(slug)
        .bind(input.sku.trim())
        .bind(&input.description)
        .bind(&input.specifications)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.status)
        .bind(input.featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or(e, "slug or SKU already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Archive a product. Rows are never deleted since orders reference them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn archive(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET status = 'archived', featured = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_images(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            SELECT {IMAGE_COLUMNS} FROM product_images
            WHERE product_id = $1
            ORDER BY is_primary DESC, sort_order ASC, id ASC
            "
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Attach an uploaded image. The first image of a product becomes primary.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        path: &str,
        alt_text: Option<&str>,
    ) -> Result<ProductImage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Serialize concurrent uploads for the same product.
        sqlx::query_scalar::<_, i32>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let image = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            INSERT INTO product_images (product_id, path, alt_text, is_primary, sort_order)
            SELECT $1, $2, $3,
                   NOT EXISTS (SELECT 1 FROM product_images WHERE product_id = $1 AND is_primary),
                   COALESCE(MAX(sort_order) + 1, 0)
            FROM product_images WHERE product_id = $1
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(product_id)
        .bind(path)
        .bind(alt_text)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(image)
    }

    /// Delete an image row and return its stored path so the caller can
    /// remove the file. If it was primary, the next image is promoted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't belong to the product.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ProductImageId,
    ) -> Result<String, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (path, was_primary) = sqlx::query_as::<_, (String, bool)>(
            r"
            DELETE FROM product_images
            WHERE id = $1 AND product_id = $2
            RETURNING path, is_primary
            ",
        )
        .bind(image_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if was_primary {
            sqlx::query(
                r"
                UPDATE product_images SET is_primary = TRUE
                WHERE id = (
                    SELECT id FROM product_images
                    WHERE product_id = $1
                    ORDER BY sort_order ASC, id ASC
                    LIMIT 1
                )
                ",
            )
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(path)
    }

    /// Make one image the product's primary image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't belong to the product.
    pub async fn set_primary_image(
        &self,
        product_id: ProductId,
        image_id: ProductImageId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM product_images WHERE id = $1 AND product_id = $2)",
        )
        .bind(image_id)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("UPDATE product_images SET is_primary = FALSE WHERE product_id = $1 AND is_primary")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE product_images SET is_primary = TRUE WHERE id = $1")
            .bind(image_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
