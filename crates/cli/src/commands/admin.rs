//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin with a verified email
//! ss-cli admin create -e admin@example.com -p 'S3cure-pass' -f Jane -l Doe
//!
//! # Promote an existing customer account
//! ss-cli admin promote -e ops@example.com
//! ```

use solarshop_core::{Email, UserRole};
use solarshop_server::db::{RepositoryError, UserRepository};
use solarshop_server::models::user::NewUser;
use solarshop_server::services::auth::{self, AuthError};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password rejected or could not be hashed.
    #[error("{0}")]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// No account with that email.
    #[error("No user with email: {0}")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a new admin user. The email is marked verified so the account can
/// log in straight away.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create_user(
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<solarshop_core::UserId, AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    auth::validate_password(password)?;
    let password_hash = auth::hash_password(password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    tracing::info!("Creating admin user: {email}");

    let user = users
        .create(&NewUser {
            email: email.clone(),
            password_hash,
            first_name: first_name.trim().to_owned(),
            last_name: last_name.trim().to_owned(),
            phone: None,
            role: UserRole::Admin,
            email_verified: true,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!("Admin user created successfully! ID: {}, Email: {}", user.id, user.email);
    Ok(user.id)
}

/// Give an existing account the admin role.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = users
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_owned()))?;

    if user.role == UserRole::Admin {
        tracing::info!("{} is already an admin", user.email);
        return Ok(());
    }

    users.set_role(user.id, UserRole::Admin).await?;
    tracing::info!("Promoted {} (ID: {}) to admin", user.email, user.id);
    Ok(())
}
