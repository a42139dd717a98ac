//! Quote requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use solarshop_core::{ProductId, QuoteId, QuoteStatus, UserId};

use super::RepositoryError;
use crate::models::pagination::PageParams;
use crate::models::quote::{
    NewQuote, Quote, QuoteDetail, QuoteFilter, QuoteItem, QuoteSummary, quote_number,
};

const QUOTE_COLUMNS: &str = "q.id, q.quote_number, q.user_id, q.status, q.estimated_total, \
                             q.quoted_total, q.installation_required, q.contact_phone, q.notes, \
                             q.admin_notes, q.valid_until, q.responded_by, q.responded_at, \
                             q.created_at, q.updated_at";

/// A priced quote line ready to insert.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// An admin's price for a pending quote.
#[derive(Debug, Clone)]
pub struct Offer<'s> {
    pub quoted_total: Decimal,
    pub admin_notes: Option<&'s str>,
    pub valid_until: DateTime<Utc>,
    pub responded_by: UserId,
}

/// Record an offer on a pending quote.
///
/// Returns `None` if the quote was no longer pending.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn respond(
    conn: &mut PgConnection,
    id: QuoteId,
    offer: &Offer<'_>,
) -> Result<Option<Quote>, RepositoryError> {
    let quote = sqlx::query_as::<_, Quote>(&format!(
        r"
        UPDATE quotes AS q
        SET status = 'quoted', quoted_total = $2, admin_notes = $3, valid_until = $4,
            responded_by = $5, responded_at = NOW(), updated_at = NOW()
        WHERE q.id = $1 AND q.status = 'pending'
        RETURNING {QUOTE_COLUMNS}
        "
    ))
    .bind(id)
    .bind(offer.quoted_total)
    .bind(offer.admin_notes)
    .bind(offer.valid_until)
    .bind(offer.responded_by)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(quote)
}

/// Repository for quotes.
pub struct QuoteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> QuoteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a quote with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &NewQuote,
        lines: &[PricedLine],
        estimated_total: Decimal,
    ) -> Result<QuoteDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            "SELECT nextval(pg_get_serial_sequence('quotes', 'id'))::int4",
        )
        .fetch_one(&mut *tx)
        .await?;

        let quote = sqlx::query_as::<_, Quote>(&format!(
            r"
            INSERT INTO quotes AS q
                (id, quote_number, user_id, estimated_total, installation_required,
                 contact_phone, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {QUOTE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(quote_number(id))
        .bind(user_id)
        .bind(estimated_total)
        .bind(input.installation_required)
        .bind(&input.contact_phone)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item = sqlx::query_as::<_, QuoteItem>(
                r"
                INSERT INTO quote_items (quote_id, product_id, product_name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, quote_id, product_id, product_name, unit_price, quantity
                ",
            )
            .bind(quote.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.unit_price)
            .bind(line.quantity)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;
        Ok(QuoteDetail { quote, items })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let quote = sqlx::query_as::<_, Quote>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes q WHERE q.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(quote)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: QuoteId,
    ) -> Result<Option<Quote>, RepositoryError> {
        let quote = sqlx::query_as::<_, Quote>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes q WHERE q.id = $1 AND q.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(quote)
    }

    /// Attach lines to a quote.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn detail(&self, quote: Quote) -> Result<QuoteDetail, RepositoryError> {
        let items = sqlx::query_as::<_, QuoteItem>(
            r"
            SELECT id, quote_id, product_id, product_name, unit_price, quantity
            FROM quote_items WHERE quote_id = $1 ORDER BY id
            ",
        )
        .bind(quote.id)
        .fetch_all(self.pool)
        .await?;
        Ok(QuoteDetail { quote, items })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        params: PageParams,
    ) -> Result<(Vec<Quote>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, Quote>(&format!(
            r"
            SELECT {QUOTE_COLUMNS} FROM quotes q
            WHERE q.user_id = $1
            ORDER BY q.created_at DESC, q.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quotes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok((rows, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_admin(
        &self,
        filter: &QuoteFilter,
    ) -> Result<(Vec<QuoteSummary>, i64), RepositoryError> {
        let params = filter.page_params();
        let rows = sqlx::query_as::<_, QuoteSummary>(&format!(
            r"
            SELECT {QUOTE_COLUMNS}, u.email AS customer_email,
                   TRIM(u.first_name || ' ' || u.last_name) AS customer_name
            FROM quotes q
            JOIN users u ON u.id = q.user_id
            WHERE ($1::quote_status IS NULL OR q.status = $1)
            ORDER BY q.created_at DESC, q.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(filter.status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM quotes WHERE ($1::quote_status IS NULL OR status = $1)",
        )
        .bind(filter.status)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Compare-and-set the status. Returns `None` if the current status
    /// wasn't one of `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn transition(
        &self,
        id: QuoteId,
        from: &[QuoteStatus],
        to: QuoteStatus,
        admin_notes: Option<&str>,
    ) -> Result<Option<Quote>, RepositoryError> {
        let quote = sqlx::query_as::<_, Quote>(&format!(
            r"
            UPDATE quotes AS q
            SET status = $3, admin_notes = COALESCE($4, q.admin_notes), updated_at = NOW()
            WHERE q.id = $1 AND q.status::text = ANY($2)
            RETURNING {QUOTE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(from.iter().map(QuoteStatus::as_str).collect::<Vec<_>>())
        .bind(to)
        .bind(admin_notes)
        .fetch_optional(self.pool)
        .await?;
        Ok(quote)
    }

    /// Pending quotes for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_pending(&self) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quotes WHERE status = 'pending'")
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}
