//! Authentication service.
//!
//! Password signup and login, email verification codes, password resets and
//! profile changes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::instrument;

use solarshop_core::{Email, PhoneNumber, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::settings;
use crate::db::tokens::TokenRepository;
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, User};
use crate::services::email::{EmailService, generate_verification_code};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Verification codes expire after this many minutes.
pub const VERIFICATION_CODE_TTL_MINUTES: i64 = 15;

/// Wrong guesses allowed per verification code.
pub const MAX_VERIFICATION_ATTEMPTS: i32 = 5;

/// Reset links expire after this many minutes.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Signup details as submitted by the client.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'r> {
    pub email: &'r str,
    pub password: &'r str,
    pub first_name: &'r str,
    pub last_name: &'r str,
    pub phone: Option<&'r str>,
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
    tokens: TokenRepository<'a>,
    email: &'a EmailService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
            tokens: TokenRepository::new(pool),
            email,
        }
    }

    // =========================================================================
    // Signup & Login
    // =========================================================================

    /// Register a customer and email them a verification code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidInput` if a name is blank.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn signup(&self, registration: Registration<'_>) -> Result<User, AuthError> {
        let email = Email::parse(registration.email)?;
        validate_password(registration.password)?;
        let (first_name, last_name) = validate_names(registration.first_name, registration.last_name)?;
        let phone = normalize_phone(registration.phone)?;

        let password_hash = hash_password(registration.password)?;

        let user = self
            .users
            .create(&NewUser {
                email,
                password_hash,
                first_name,
                last_name,
                phone,
                role: UserRole::Customer,
                email_verified: false,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Customer signed up");
        self.issue_verification_code(&user).await?;

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::EmailNotVerified` if the password is right but the
    /// email was never confirmed.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        Ok(user)
    }

    // =========================================================================
    // Email Verification
    // =========================================================================

    /// Store a fresh code (invalidating older ones) and email it.
    ///
    /// Delivery failures are logged; the user can ask for a resend.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the code cannot be stored.
    pub async fn issue_verification_code(&self, user: &User) -> Result<(), AuthError> {
        let code = generate_verification_code();
        let expires_at = Utc::now() + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES);

        self.tokens
            .create_verification_code(user.id, &hash_token(&code), expires_at)
            .await?;

        let store = settings::load(self.pool).await?;
        if let Err(e) = self
            .email
            .send_verification_code(
                user.email.as_str(),
                &user.first_name,
                &store.store_name,
                &code,
                VERIFICATION_CODE_TTL_MINUTES,
            )
            .await
        {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send verification code");
        }

        Ok(())
    }

    /// Check a verification code and mark the email verified.
    ///
    /// Verifying an already-verified address succeeds without a code lookup.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` for unknown users, missing or wrong codes.
    /// Returns `AuthError::CodeExpired` if the code is past its expiry.
    /// Returns `AuthError::TooManyAttempts` once the attempt budget is spent.
    #[instrument(skip(self, code))]
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCode)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        if user.email_verified {
            return Ok(user);
        }

        let stored = self
            .tokens
            .latest_verification_code(user.id)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        if stored.expires_at <= Utc::now() {
            return Err(AuthError::CodeExpired);
        }

        let attempts = self
            .tokens
            .reserve_attempt(stored.id, MAX_VERIFICATION_ATTEMPTS)
            .await?
            .ok_or(AuthError::TooManyAttempts)?;

        if hash_token(code.trim()) != stored.code_hash {
            tracing::warn!(user_id = %user.id, attempts, "Wrong verification code");
            return Err(attempt_error(attempts));
        }

        if !self
            .tokens
            .consume_verification_code(stored.id, user.id)
            .await?
        {
            return Err(AuthError::InvalidCode);
        }

        tracing::info!(user_id = %user.id, "Email verified");

        Ok(User {
            email_verified: true,
            ..user
        })
    }

    /// Re-issue a code for an unverified account. Unknown or already-verified
    /// addresses are silently ignored so the endpoint can't probe accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database fails.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(());
        };
        match self.users.get_by_email(&email).await? {
            Some(user) if !user.email_verified => self.issue_verification_code(&user).await,
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Email a reset link to a known user. Unknown addresses are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    #[instrument(skip(self, base_url))]
    pub async fn forgot_password(&self, email: &str, base_url: &str) -> Result<(), AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(());
        };
        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.tokens
            .create_reset_token(user.id, &hash_token(&token), expires_at)
            .await?;

        let reset_url = format!(
            "{}/reset-password?token={token}",
            base_url.trim_end_matches('/')
        );
        let store = settings::load(self.pool).await?;
        if let Err(e) = self
            .email
            .send_password_reset(
                user.email.as_str(),
                &user.first_name,
                &store.store_name,
                &reset_url,
            )
            .await
        {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }

        Ok(())
    }

    /// Set a new password using a reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is unknown, used or expired.
    /// Returns `AuthError::WeakPassword` if the new password is rejected.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let stored = self
            .tokens
            .find_reset_token(&hash_token(token.trim()))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if stored.used_at.is_some() || stored.expires_at <= Utc::now() {
            return Err(AuthError::InvalidToken);
        }

        let password_hash = hash_password(new_password)?;
        if !self.tokens.redeem_reset_token(&stored, &password_hash).await? {
            return Err(AuthError::InvalidToken);
        }

        tracing::info!(user_id = %stored.user_id, "Password reset");
        Ok(())
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Change password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is wrong.
    /// Returns `AuthError::WeakPassword` if the new password is rejected.
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let password_hash = self
            .users
            .get_password_hash_by_id(user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;
        verify_password(current_password, &password_hash)?;
        validate_password(new_password)?;

        let new_hash = hash_password(new_password)?;
        self.users.update_password(user_id, &new_hash).await?;
        Ok(())
    }

    /// Update name and phone.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if a name is blank.
    /// Returns `AuthError::InvalidPhone` if the phone number isn't Kenyan.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
    ) -> Result<User, AuthError> {
        let (first_name, last_name) = validate_names(first_name, last_name)?;
        let phone = normalize_phone(phone)?;

        self.users
            .update_profile(user_id, &first_name, &last_name, phone.as_deref())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Error for a wrong code after `attempts` have been spent.
const fn attempt_error(attempts: i32) -> AuthError {
    if attempts >= MAX_VERIFICATION_ATTEMPTS {
        AuthError::TooManyAttempts
    } else {
        AuthError::InvalidCode
    }
}

/// Validate password requirements: minimum length, a letter and a digit.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the first unmet rule.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(AuthError::WeakPassword(
            "Password must contain a letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "Password must contain a digit".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(first_name: &str, last_name: &str) -> Result<(String, String), AuthError> {
    let first_name = first_name.trim();
    let last_name = last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(AuthError::InvalidInput(
            "first and last name are required".to_string(),
        ));
    }
    if first_name.len() > 100 || last_name.len() > 100 {
        return Err(AuthError::InvalidInput("name is too long".to_string()));
    }
    Ok((first_name.to_string(), last_name.to_string()))
}

/// Blank phones are treated as absent; others must be Kenyan numbers.
fn normalize_phone(phone: Option<&str>) -> Result<Option<String>, AuthError> {
    match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => Ok(Some(PhoneNumber::parse_kenyan(p)?.as_str().to_string())),
        None => Ok(None),
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// SHA-256 hex digest used to store codes and tokens.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// 32 random bytes, URL-safe base64 without padding.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
