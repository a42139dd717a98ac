//! Customer and staff accounts.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use solarshop_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Page;
use crate::models::User;
use crate::models::user::UserFilter;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: UserRole,
}

/// GET /api/admin/users
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Page<User>>> {
    let (rows, total) = UserRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Page::new(rows, total, filter.page_params())))
}

/// PUT /api/admin/users/{id}/role
///
/// Admins cannot demote themselves, so there is always at least one left.
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(req): Json<RoleUpdate>,
) -> Result<Json<User>> {
    if id == admin.id && req.role != UserRole::Admin {
        return Err(AppError::Conflict(
            "You cannot remove your own admin role".to_string(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .set_role(id, req.role)
        .await?;
    tracing::info!(admin_id = %admin.id, user_id = %user.id, role = %user.role, "User role changed");
    Ok(Json(user))
}
