//! Broadcast notifications.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::db::NotificationRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::notification::Broadcast;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BroadcastResult {
    pub recipients: u64,
}

/// POST /api/admin/notifications/broadcast
///
/// One row per recipient, written by a single `INSERT ... SELECT`.
pub async fn broadcast(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<Broadcast>,
) -> Result<Json<BroadcastResult>> {
    if req.title.trim().is_empty() || req.message.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and message are required".to_string(),
        ));
    }

    let recipients = NotificationRepository::new(state.pool())
        .broadcast(&req)
        .await?;

    tracing::info!(admin_id = %admin.id, audience = ?req.audience, recipients, "Broadcast sent");
    Ok(Json(BroadcastResult { recipients }))
}
