//! Product reviews and moderation.

use sqlx::PgPool;

use solarshop_core::{ProductId, ReviewId, ReviewStatus, UserId};

use super::RepositoryError;
use crate::models::pagination::PageParams;
use crate::models::review::{NewReview, Review, ReviewFilter, ReviewSummary, ReviewWithAuthor};

const REVIEW_COLUMNS: &str = "r.id, r.product_id, r.user_id, r.rating, r.title, r.body, \
                              r.verified_purchase, r.status, r.created_at, r.updated_at";

// Public author names show the first name and last initial only.
const AUTHOR_SELECT: &str = r"
    TRIM(u.first_name || ' ' || LEFT(u.last_name, 1)) AS author_name,
    p.name AS product_name
";

/// Repository for reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Rating distribution of approved reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, product_id: ProductId) -> Result<ReviewSummary, RepositoryError> {
        let counts = sqlx::query_as::<_, (i16, i64)>(
            r"
            SELECT rating, COUNT(*) FROM reviews
            WHERE product_id = $1 AND status = 'approved'
            GROUP BY rating
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(ReviewSummary::from_counts(&counts))
    }

    /// Approved reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_approved(
        &self,
        product_id: ProductId,
        params: PageParams,
    ) -> Result<(Vec<ReviewWithAuthor>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewWithAuthor>(&format!(
            r"
            SELECT {REVIEW_COLUMNS}, {AUTHOR_SELECT}
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            JOIN products p ON p.id = r.product_id
            WHERE r.product_id = $1 AND r.status = 'approved'
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(product_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reviews WHERE product_id = $1 AND status = 'approved'",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Submit a review for moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
        input: &NewReview,
        verified_purchase: bool,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(&format!(
            r"
            INSERT INTO reviews AS r (product_id, user_id, rating, title, body, verified_purchase)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(product_id)
        .bind(user_id)
        .bind(input.rating)
        .bind(&input.title)
        .bind(input.body.trim())
        .bind(verified_purchase)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or(e, "you have already reviewed this product"))
    }

    /// Moderation queue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_admin(
        &self,
        filter: &ReviewFilter,
    ) -> Result<(Vec<ReviewWithAuthor>, i64), RepositoryError> {
        let params = filter.page_params();
        let rows = sqlx::query_as::<_, ReviewWithAuthor>(&format!(
            r"
            SELECT {REVIEW_COLUMNS}, {AUTHOR_SELECT}
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            JOIN products p ON p.id = r.product_id
            WHERE ($1::review_status IS NULL OR r.status = $1)
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(filter.status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reviews WHERE ($1::review_status IS NULL OR status = $1)",
        )
        .bind(filter.status)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn set_status(
        &self,
        id: ReviewId,
        status: ReviewStatus,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(&format!(
            r"
            UPDATE reviews AS r SET status = $2, updated_at = NOW()
            WHERE r.id = $1
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_pending(&self) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE status = 'pending'")
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}
