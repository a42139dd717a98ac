//! Signup, email verification, login and password reset.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

use super::session_error;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Generic acknowledgement for endpoints that must not reveal whether an
/// account exists.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let auth = AuthService::new(state.pool(), state.email());
    let user = auth
        .signup(Registration {
            email: &req.email,
            password: &req.password,
            first_name: &req.first_name,
            last_name: &req.last_name,
            phone: req.phone.as_deref(),
        })
        .await?;

    add_breadcrumb("auth", "Signed up", None);
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool(), state.email())
        .verify_email(&req.email, &req.code)
        .await?;
    Ok(Json(user))
}

/// POST /api/auth/verify-email/resend
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    AuthService::new(state.pool(), state.email())
        .resend_verification(&req.email)
        .await?;
    Ok(Json(MessageResponse {
        message: "If the account exists and is unverified, a new code has been sent",
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool(), state.email())
        .login(&req.email, &req.password)
        .await?;

    set_current_user(&session, &CurrentUser::from(&user))
        .await
        .map_err(session_error)?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(user))
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await.map_err(session_error)?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool(), state.email())
        .get_user(current.id)
        .await
        .map_err(|_| AppError::Unauthorized("Authentication required".to_string()))?;
    Ok(Json(user))
}

/// POST /api/auth/password/forgot
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    AuthService::new(state.pool(), state.email())
        .forgot_password(&req.email, &state.config().base_url)
        .await?;
    Ok(Json(MessageResponse {
        message: "If an account exists for that email, a reset link has been sent",
    }))
}

/// POST /api/auth/password/reset
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    AuthService::new(state.pool(), state.email())
        .reset_password(&req.token, &req.password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password updated, you can now log in",
    }))
}
