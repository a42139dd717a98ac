//! Customer quote requests.
//!
//! A quote is priced by the sales team and then accepted or rejected by the
//! customer while it is still valid.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;

use solarshop_core::{Money, PhoneNumber, ProductId, QuoteId, QuoteStatus, UserId};

use crate::db::quotes::PricedLine;
use crate::db::{ProductRepository, QuoteRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::quote::{NewQuote, Quote, QuoteDetail};
use crate::models::{Page, PageParams};
use crate::state::AppState;

const MAX_QUOTE_LINES: usize = 50;

/// POST /api/quotes
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(mut req): Json<NewQuote>,
) -> Result<(StatusCode, Json<QuoteDetail>)> {
    let quantities = merge_lines(&req)?;

    if let Some(phone) = req.contact_phone.as_deref().filter(|p| !p.trim().is_empty()) {
        let phone =
            PhoneNumber::parse_kenyan(phone).map_err(|e| AppError::BadRequest(e.to_string()))?;
        req.contact_phone = Some(phone.as_str().to_string());
    } else {
        req.contact_phone = None;
    }

    let ids: Vec<ProductId> = quantities.keys().copied().collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    if products.len() != ids.len() {
        return Err(AppError::BadRequest(
            "One or more products do not exist".to_string(),
        ));
    }

    let lines: Vec<PricedLine> = products
        .into_iter()
        .filter_map(|p| {
            quantities.get(&p.id).map(|&quantity| PricedLine {
                product_id: p.id,
                product_name: p.name,
                unit_price: p.price,
                quantity,
            })
        })
        .collect();
    let estimate = estimate(&lines);

    let detail = QuoteRepository::new(state.pool())
        .create(user.id, &req, &lines, estimate)
        .await?;

    tracing::info!(quote_number = %detail.quote.quote_number, "Quote requested");
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/quotes
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Quote>>> {
    let (rows, total) = QuoteRepository::new(state.pool())
        .list_for_user(user.id, params)
        .await?;
    Ok(Json(Page::new(rows, total, params)))
}

/// GET /api/quotes/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<QuoteId>,
) -> Result<Json<QuoteDetail>> {
    let repo = QuoteRepository::new(state.pool());
    let quote = own_quote(&repo, user.id, id).await?;
    Ok(Json(repo.detail(quote).await?))
}

/// POST /api/quotes/{id}/accept
pub async fn accept(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<QuoteId>,
) -> Result<Json<QuoteDetail>> {
    answer(&state, user.id, id, QuoteStatus::Accepted).await
}

/// POST /api/quotes/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<QuoteId>,
) -> Result<Json<QuoteDetail>> {
    answer(&state, user.id, id, QuoteStatus::Rejected).await
}

/// Accept or reject a quoted offer. An offer past `valid_until` is marked
/// expired instead.
async fn answer(
    state: &AppState,
    user_id: UserId,
    id: QuoteId,
    to: QuoteStatus,
) -> Result<Json<QuoteDetail>> {
    let repo = QuoteRepository::new(state.pool());
    let quote = own_quote(&repo, user_id, id).await?;

    if quote.is_lapsed(Utc::now()) {
        repo.transition(quote.id, &[QuoteStatus::Quoted], QuoteStatus::Expired, None)
            .await?;
        return Err(AppError::Conflict("This quote has expired".to_string()));
    }

    let updated = repo
        .transition(quote.id, &[QuoteStatus::Quoted], to, None)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!("Quote is {} and cannot be answered", quote.status))
        })?;

    tracing::info!(quote_number = %updated.quote_number, status = %to, "Quote answered");
    Ok(Json(repo.detail(updated).await?))
}

async fn own_quote(repo: &QuoteRepository<'_>, user_id: UserId, id: QuoteId) -> Result<Quote> {
    repo.get_for_user(user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quote not found".to_string()))
}

/// Validate lines and merge repeated products.
fn merge_lines(req: &NewQuote) -> Result<BTreeMap<ProductId, i32>> {
    if req.items.is_empty() {
        return Err(AppError::BadRequest(
            "A quote needs at least one item".to_string(),
        ));
    }
    if req.items.len() > MAX_QUOTE_LINES {
        return Err(AppError::BadRequest(format!(
            "A quote can have at most {MAX_QUOTE_LINES} items"
        )));
    }

    let mut merged = BTreeMap::new();
    for line in &req.items {
        if line.quantity < 1 {
            return Err(AppError::BadRequest(
                "Quantities must be at least 1".to_string(),
            ));
        }
        let entry = merged.entry(line.product_id).or_insert(0_i32);
        *entry = entry
            .checked_add(line.quantity)
            .ok_or_else(|| AppError::BadRequest("Quantity is too large".to_string()))?;
    }
    Ok(merged)
}

fn estimate(lines: &[PricedLine]) -> Decimal {
    lines
        .iter()
        .map(|l| Money::kes(l.unit_price).multiply(l.quantity).amount)
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::models::quote::QuoteLineInput;

    use super::*;

    fn request(items: &[(i32, i32)]) -> NewQuote {
        NewQuote {
            items: items
                .iter()
                .map(|&(id, quantity)| QuoteLineInput {
                    product_id: ProductId::new(id),
                    quantity,
                })
                .collect(),
            notes: None,
            contact_phone: None,
            installation_required: true,
        }
    }

    #[test]
    fn test_empty_quote_rejected() {
        assert!(merge_lines(&request(&[])).is_err());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert!(merge_lines(&request(&[(1, 2), (2, 0)])).is_err());
    }

    #[test]
    fn test_repeated_products_merged() {
        let merged = merge_lines(&request(&[(3, 2), (1, 1), (3, 4)])).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get(&ProductId::new(3)), Some(&6));
    }

    #[test]
    fn test_estimate() {
        let lines = vec![
            PricedLine {
                product_id: ProductId::new(1),
                product_name: "Panel".to_string(),
                unit_price: Decimal::new(18_500, 0),
                quantity: 4,
            },
            PricedLine {
                product_id: ProductId::new(2),
                product_name: "Inverter".to_string(),
                unit_price: Decimal::new(65_000_50, 2),
                quantity: 1,
            },
        ];
        assert_eq!(estimate(&lines), Decimal::new(139_000_50, 2));
    }
}
