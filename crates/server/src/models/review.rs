//! Product review models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solarshop_core::{ProductId, ReviewId, ReviewStatus, UserId};

use super::pagination::PageParams;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: i16,
    pub title: Option<String>,
    pub body: String,
    pub verified_purchase: bool,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review with the author's display name and product name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReviewWithAuthor {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub review: Review,
    pub author_name: String,
    pub product_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i16,
    pub title: Option<String>,
    pub body: String,
}

/// Aggregate of approved reviews for one product.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReviewSummary {
    pub count: i64,
    pub average_rating: Option<f64>,
    /// Number of reviews per star, index 0 = one star.
    pub distribution: [i64; 5],
}

impl ReviewSummary {
    /// Build from `(rating, count)` pairs. Ratings outside 1..=5 are ignored.
    #[must_use]
    pub fn from_counts(counts: &[(i16, i64)]) -> Self {
        let mut distribution = [0_i64; 5];
        let mut total = 0_i64;
        let mut weighted = 0_i64;
        for &(rating, count) in counts {
            let Some(slot) = usize::try_from(rating - 1)
                .ok()
                .and_then(|i| distribution.get_mut(i))
            else {
                continue;
            };
            *slot += count;
            total += count;
            weighted += i64::from(rating) * count;
        }

        #[allow(clippy::cast_precision_loss)]
        let average_rating = (total > 0)
            .then(|| ((weighted as f64 / total as f64) * 10.0).round() / 10.0);

        Self {
            count: total,
            average_rating,
            distribution,
        }
    }
}

/// Admin moderation filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ReviewFilter {
    #[must_use]
    pub const fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
