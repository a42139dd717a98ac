//! Email verification codes and password reset tokens.
//!
//! Only SHA-256 hashes are stored; the plaintext is emailed and discarded.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use solarshop_core::UserId;

use super::RepositoryError;

/// An unconsumed verification code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationCode {
    pub id: i32,
    pub user_id: UserId,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
}

/// A password reset token row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResetToken {
    pub id: i32,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

/// Repository for verification codes and reset tokens.
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new verification code, invalidating any earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_verification_code(
        &self,
        user_id: UserId,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE email_verification_codes SET consumed_at = NOW()
            WHERE user_id = $1 AND consumed_at IS NULL
            ",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO email_verification_codes (user_id, code_hash, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The latest unconsumed code for a user, expired or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_verification_code(
        &self,
        user_id: UserId,
    ) -> Result<Option<VerificationCode>, RepositoryError> {
        let code = sqlx::query_as::<_, VerificationCode>(
            r"
            SELECT id, user_id, code_hash, attempts, expires_at
            FROM email_verification_codes
            WHERE user_id = $1 AND consumed_at IS NULL
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(code)
    }

    /// Spend one attempt on a code before it is compared.
    ///
    /// Returns the new attempt count, or `None` when the code is consumed or
    /// its budget of `max_attempts` is already spent. The conditional update
    /// serializes concurrent guesses on the row, so at most `max_attempts`
    /// comparisons ever happen per code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reserve_attempt(
        &self,
        code_id: i32,
        max_attempts: i32,
    ) -> Result<Option<i32>, RepositoryError> {
        let attempts = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE email_verification_codes SET attempts = attempts + 1
            WHERE id = $1 AND attempts < $2 AND consumed_at IS NULL
            RETURNING attempts
            ",
        )
        .bind(code_id)
        .bind(max_attempts)
        .fetch_optional(self.pool)
        .await?;
        Ok(attempts)
    }

    /// Consume a code and mark the user verified in one transaction.
    ///
    /// Returns `false` if the code was consumed or replaced concurrently.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume_verification_code(
        &self,
        code_id: i32,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query(
            r"
            UPDATE email_verification_codes SET consumed_at = NOW()
            WHERE id = $1 AND consumed_at IS NULL
            ",
        )
        .bind(code_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if consumed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET email_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Store a reset token, invalidating earlier unused tokens for the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE password_reset_tokens SET used_at = NOW()
            WHERE user_id = $1 AND used_at IS NULL
            ",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Look up a reset token by hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<ResetToken>, RepositoryError> {
        let token = sqlx::query_as::<_, ResetToken>(
            r"
            SELECT id, user_id, expires_at, used_at
            FROM password_reset_tokens
            WHERE token_hash = $1
            ",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;
        Ok(token)
    }

    /// Set the new password and burn the token atomically.
    ///
    /// Returns `false` if the token was used concurrently.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn redeem_reset_token(
        &self,
        token: &ResetToken,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let burned = sqlx::query(
            "UPDATE password_reset_tokens SET used_at = NOW() WHERE id = $1 AND used_at IS NULL",
        )
        .bind(token.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if burned == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(token.user_id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
