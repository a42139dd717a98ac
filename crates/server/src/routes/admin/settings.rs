//! Store settings.

use axum::{Json, extract::State};

use crate::db::settings;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::StoreSettings;
use crate::state::AppState;

/// GET /api/admin/settings
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<StoreSettings>> {
    Ok(Json(settings::load(state.pool()).await?))
}

/// PUT /api/admin/settings
///
/// The whole settings object is replaced.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(mut req): Json<StoreSettings>,
) -> Result<Json<StoreSettings>> {
    req.store_name = req.store_name.trim().to_string();
    req.validate().map_err(AppError::BadRequest)?;

    settings::save(state.pool(), &req).await?;
    tracing::info!(admin_id = %admin.id, "Store settings updated");
    Ok(Json(req))
}
