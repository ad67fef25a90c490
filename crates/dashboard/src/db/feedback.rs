//! Feedback repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ict_assets_core::{FeedbackId, UserId};

use super::RepositoryError;
use crate::models::{FeedbackEntry, NewFeedback};

const SELECT_FEEDBACK: &str = r"
    SELECT f.id, f.message, f.role, f.created_by, f.email,
           p.full_name AS author_name, f.created_at
    FROM feedback f
    LEFT JOIN profiles p ON p.id = f.created_by
";

#[derive(Debug, sqlx::FromRow)]
struct FeedbackRow {
    id: Uuid,
    message: String,
    role: Option<String>,
    created_by: Option<Uuid>,
    email: Option<String>,
    author_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<FeedbackRow> for FeedbackEntry {
    fn from(row: FeedbackRow) -> Self {
        Self {
            id: FeedbackId::new(row.id),
            message: row.message,
            role: row.role,
            created_by: row.created_by.map(UserId::new),
            email: row.email,
            author_name: row.author_name,
            created_at: row.created_at,
        }
    }
}

/// Repository for feedback entries.
pub struct FeedbackRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FeedbackRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert feedback and return its id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, feedback: &NewFeedback) -> Result<FeedbackId, RepositoryError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO feedback (message, role, created_by, email)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&feedback.message)
        .bind(feedback.role.as_str())
        .bind(feedback.created_by)
        .bind(&feedback.email)
        .fetch_one(self.pool)
        .await?;

        Ok(FeedbackId::new(id))
    }

    /// Every entry, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<FeedbackEntry>, RepositoryError> {
        let sql = format!("{SELECT_FEEDBACK} ORDER BY f.created_at DESC");
        let rows = sqlx::query_as::<_, FeedbackRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get one entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: FeedbackId) -> Result<Option<FeedbackEntry>, RepositoryError> {
        let sql = format!("{SELECT_FEEDBACK} WHERE f.id = $1");
        let row = sqlx::query_as::<_, FeedbackRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Total number of entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM feedback")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
