//! Profile repository: roles and display names.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ict_assets_core::{Role, UserId};

use super::RepositoryError;
use crate::models::Profile;

/// Internal row type for `profiles` queries.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    role: Option<String>,
    full_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: UserId::new(row.id),
            role: Role::normalize(row.role.as_deref()),
            full_name: row.full_name,
            created_at: row.created_at,
        }
    }
}

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, role, full_name, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List every profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, role, full_name, created_at FROM profiles ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Profiles for the given ids, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[UserId]) -> Result<HashMap<UserId, Profile>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, role, full_name, created_at FROM profiles WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let profile = Profile::from(row);
                (profile.id, profile)
            })
            .collect())
    }

    /// Ids of admins and admin assistants, excluding `sender`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn manager_ids_except(&self, sender: UserId) -> Result<Vec<UserId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r"
            SELECT id FROM profiles
            WHERE role IN ('admin', 'admin_assistant') AND id <> $1
            ",
        )
        .bind(sender)
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    /// Set a user's role, creating the profile if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_role(&self, id: UserId, role: Role) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO profiles (id, role) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET role = EXCLUDED.role
            ",
        )
        .bind(id)
        .bind(role.as_str())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Set role and (when given) full name, creating the profile if needed.
    ///
    /// A `None` full name keeps the stored one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        id: UserId,
        role: Role,
        full_name: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO profiles (id, role, full_name) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET role = EXCLUDED.role,
                full_name = COALESCE(EXCLUDED.full_name, profiles.full_name)
            ",
        )
        .bind(id)
        .bind(role.as_str())
        .bind(full_name)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete a profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
