//! Quote desk: price or decline customer quote requests.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use solarshop_core::{Money, QuoteId, QuoteStatus};

use crate::db::quotes::{self, Offer};
use crate::db::{QuoteRepository, RepositoryError, notifications};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Page;
use crate::models::notification::{NewNotification, kind};
use crate::models::quote::{Quote, QuoteDetail, QuoteFilter, QuoteResponse, QuoteSummary};
use crate::state::AppState;

const MAX_VALID_DAYS: u16 = 365;

#[derive(Debug, Deserialize)]
pub struct RejectQuote {
    pub admin_notes: Option<String>,
}

/// GET /api/admin/quotes
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<QuoteFilter>,
) -> Result<Json<Page<QuoteSummary>>> {
    let (rows, total) = QuoteRepository::new(state.pool())
        .list_admin(&filter)
        .await?;
    Ok(Json(Page::new(rows, total, filter.page_params())))
}

/// GET /api/admin/quotes/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<QuoteId>,
) -> Result<Json<QuoteDetail>> {
    let repo = QuoteRepository::new(state.pool());
    let quote = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quote not found".to_string()))?;
    Ok(Json(repo.detail(quote).await?))
}

/// PUT /api/admin/quotes/{id}/respond
///
/// Only pending quotes can be priced.
pub async fn respond(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<QuoteId>,
    Json(req): Json<QuoteResponse>,
) -> Result<Json<QuoteDetail>> {
    validate_response(&req)?;

    let repo = QuoteRepository::new(state.pool());
    let offer = Offer {
        quoted_total: req.quoted_total,
        admin_notes: req
            .admin_notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty()),
        valid_until: Utc::now() + Duration::days(i64::from(req.valid_days)),
        responded_by: admin.id,
    };

    let mut tx = state.pool().begin().await.map_err(RepositoryError::from)?;
    let Some(quote) = quotes::respond(&mut tx, id, &offer).await? else {
        drop(tx);
        return Err(not_pending(&repo, id).await);
    };
    notifications::insert(&mut tx, &quote_ready(&quote)).await?;
    tx.commit().await.map_err(RepositoryError::from)?;

    tracing::info!(quote_number = %quote.quote_number, total = %req.quoted_total, "Quote priced");
    Ok(Json(repo.detail(quote).await?))
}

/// PUT /api/admin/quotes/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<QuoteId>,
    Json(req): Json<RejectQuote>,
) -> Result<Json<QuoteDetail>> {
    let repo = QuoteRepository::new(state.pool());
    let admin_notes = req
        .admin_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let Some(quote) = repo
        .transition(id, &[QuoteStatus::Pending], QuoteStatus::Rejected, admin_notes)
        .await?
    else {
        return Err(not_pending(&repo, id).await);
    };

    Ok(Json(repo.detail(quote).await?))
}

/// 404 for a missing quote, 409 for one that isn't pending.
async fn not_pending(repo: &QuoteRepository<'_>, id: QuoteId) -> AppError {
    match repo.get(id).await {
        Ok(Some(quote)) => AppError::Conflict(format!(
            "Quote is {} and can no longer be changed",
            quote.status
        )),
        Ok(None) => AppError::NotFound("Quote not found".to_string()),
        Err(e) => e.into(),
    }
}

/// The customer's "quote ready" notification.
fn quote_ready(quote: &Quote) -> NewNotification {
    let total = quote
        .quoted_total
        .map(|t| Money::kes(t).display())
        .unwrap_or_default();
    NewNotification {
        user_id: quote.user_id,
        kind: kind::QUOTE_RESPONDED,
        title: format!("Quote {} is ready", quote.quote_number),
        message: format!("We've priced your request at {total}. Review and accept it before it expires."),
        link: Some(format!("/quotes/{}", quote.id)),
    }
}

fn validate_response(req: &QuoteResponse) -> Result<()> {
    if req.quoted_total <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "Quoted total must be positive".to_string(),
        ));
    }
    if req.valid_days == 0 || req.valid_days > MAX_VALID_DAYS {
        return Err(AppError::BadRequest(format!(
            "valid_days must be between 1 and {MAX_VALID_DAYS}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use solarshop_core::UserId;

    use super::*;

    fn priced_quote() -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId::new(42),
            quote_number: "Q-000042".to_string(),
            user_id: UserId::new(9),
            status: QuoteStatus::Quoted,
            estimated_total: Decimal::new(240_000, 0),
            quoted_total: Some(Decimal::new(225_000, 0)),
            installation_required: true,
            contact_phone: None,
            notes: None,
            admin_notes: None,
            valid_until: Some(now + Duration::days(14)),
            responded_by: Some(UserId::new(1)),
            responded_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_quote_ready_notification() {
        let quote = priced_quote();
        let notification = quote_ready(&quote);
        assert_eq!(notification.user_id, quote.user_id);
        assert_eq!(notification.kind, kind::QUOTE_RESPONDED);
        assert_eq!(notification.title, "Quote Q-000042 is ready");
        assert!(notification.message.contains(&Money::kes(Decimal::new(225_000, 0)).display()));
        assert_eq!(notification.link.as_deref(), Some("/quotes/42"));
    }

    fn response(total: i64, valid_days: u16) -> QuoteResponse {
        QuoteResponse {
            quoted_total: Decimal::new(total, 0),
            admin_notes: None,
            valid_days,
        }
    }

    #[test]
    fn test_validate_response() {
        assert!(validate_response(&response(250_000, 14)).is_ok());
        assert!(validate_response(&response(0, 14)).is_err());
        assert!(validate_response(&response(1_000, 0)).is_err());
        assert!(validate_response(&response(1_000, MAX_VALID_DAYS + 1)).is_err());
    }
}
