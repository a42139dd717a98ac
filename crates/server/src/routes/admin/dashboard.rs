//! Admin dashboard.

use axum::{Json, extract::State};

use crate::db::dashboard::{self, DashboardStats};
use crate::db::settings;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// GET /api/admin/dashboard
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let threshold = settings::load(state.pool()).await?.low_stock_threshold;
    Ok(Json(dashboard::stats(state.pool(), threshold).await?))
}
