//! Profile and password changes for the logged-in user.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// PUT /api/account/profile
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool(), state.email())
        .update_profile(
            current.id,
            &req.first_name,
            &req.last_name,
            req.phone.as_deref(),
        )
        .await?;
    Ok(Json(user))
}

/// PUT /api/account/password
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    AuthService::new(state.pool(), state.email())
        .change_password(current.id, &req.current_password, &req.new_password)
        .await?;
    tracing::info!(user_id = %current.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}
