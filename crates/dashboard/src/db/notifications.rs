//! Notification repository.
//!
//! Only `read` is ever updated, and only from `false` to `true`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ict_assets_core::{NotificationId, NotificationType, UserId};

use super::RepositoryError;
use crate::models::Notification;

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    message: String,
    #[sqlx(rename = "type")]
    kind: String,
    read: bool,
    date: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: NotificationId::new(row.id),
            user_id: UserId::new(row.user_id),
            message: row.message,
            kind: row.kind.parse().unwrap_or_default(),
            read: row.read,
            date: row.date,
        }
    }
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

    /// Unread notifications for a user, newest first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_unread(
        &self,
        user: UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, user_id, message, type, read, date
            FROM notifications
            WHERE user_id = $1 AND read = false
            ORDER BY date DESC
            LIMIT $2
            ",
        )
        .bind(user)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every notification for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, user_id, message, type, read, date
            FROM notifications
            WHERE user_id = $1
            ORDER BY date DESC
            ",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Unread count for a user, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_unread(
        &self,
        user: UserId,
        kind: Option<NotificationType>,
    ) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM notifications
            WHERE user_id = $1 AND read = false AND ($2::text IS NULL OR type = $2)
            ",
        )
        .bind(user)
        .bind(kind.map(NotificationType::as_str))
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Messages of a user's unread notifications of one type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_messages(
        &self,
        user: UserId,
        kind: NotificationType,
    ) -> Result<Vec<String>, RepositoryError> {
        let messages = sqlx::query_scalar::<_, String>(
            "SELECT message FROM notifications WHERE user_id = $1 AND read = false AND type = $2",
        )
        .bind(user)
        .bind(kind.as_str())
        .fetch_all(self.pool)
        .await?;

        Ok(messages)
    }

    /// Insert one notification per recipient. Returns the number inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_for(
        &self,
        recipients: &[UserId],
        message: &str,
        kind: NotificationType,
    ) -> Result<u64, RepositoryError> {
        if recipients.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r"
            INSERT INTO notifications (user_id, message, type, read)
            SELECT recipient, $2, $3, false FROM UNNEST($1::uuid[]) AS recipient
            ",
        )
        .bind(recipients)
        .bind(message)
        .bind(kind.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Mark one user's unread notifications of a type as read.
    ///
    /// `pattern` is an `ILIKE` pattern narrowing the rows by message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_read_for_user(
        &self,
        user: UserId,
        kind: NotificationType,
        pattern: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE notifications SET read = true
            WHERE user_id = $1 AND type = $2 AND read = false
              AND ($3::text IS NULL OR message ILIKE $3)
            ",
        )
        .bind(user)
        .bind(kind.as_str())
        .bind(pattern)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Mark every recipient's unread notifications matching `pattern` read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_read_for_all(
        &self,
        kind: NotificationType,
        pattern: &str,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE notifications SET read = true
            WHERE type = $1 AND read = false AND message ILIKE $2
            ",
        )
        .bind(kind.as_str())
        .bind(pattern)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
