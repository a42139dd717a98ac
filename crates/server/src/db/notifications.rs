//! In-app notifications.

use sqlx::{PgConnection, PgPool};

use solarshop_core::{NotificationId, UserId, UserRole};

use super::RepositoryError;
use crate::models::notification::{Audience, Broadcast, NewNotification, Notification, kind};
use crate::models::pagination::PageParams;

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, link, read_at, created_at";

/// Write a notification inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert(conn: &mut PgConnection, new: &NewNotification) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO notifications (user_id, kind, title, message, link)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(new.user_id)
    .bind(new.kind)
    .bind(&new.title)
    .bind(&new.message)
    .bind(&new.link)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Repository for notifications.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        unread_only: bool,
        params: PageParams,
    ) -> Result<(Vec<Notification>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, Notification>(&format!(
            r"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(user_id)
        .bind(unread_only)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Mark one notification read. Already-read notifications keep their timestamp.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it isn't the user's notification.
    pub async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<Notification, RepositoryError> {
        sqlx::query_as::<_, Notification>(&format!(
            r"
            UPDATE notifications SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Returns the number of notifications marked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = NOW() WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it isn't the user's notification.
    pub async fn delete(&self, user_id: UserId, id: NotificationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Fan a broadcast out to every user in the audience with one statement.
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn broadcast(&self, broadcast: &Broadcast) -> Result<u64, RepositoryError> {
        let role = match broadcast.audience {
            Audience::All => None,
            Audience::Customers => Some(UserRole::Customer),
            Audience::Admins => Some(UserRole::Admin),
        };

        let result = sqlx::query(
            r"
            INSERT INTO notifications (user_id, kind, title, message, link)
            SELECT id, $1, $2, $3, $4 FROM users
            WHERE $5::user_role IS NULL OR role = $5
            ",
        )
        .bind(kind::BROADCAST)
        .bind(broadcast.title.trim())
        .bind(broadcast.message.trim())
        .bind(&broadcast.link)
        .bind(role)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
