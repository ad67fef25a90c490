//! Asset category repository.

use sqlx::PgPool;
use uuid::Uuid;

use ict_assets_core::CategoryId;

use super::RepositoryError;
use crate::models::Category;

/// Categories created by `ict-cli seed categories`.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Desktop",
    "Laptop",
    "Monitor",
    "Printer",
    "Scanner",
    "Network Equipment",
    "Server",
    "Projector",
    "Tablet",
    "Peripheral",
];

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
        }
    }
}

/// Repository for asset categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name FROM asset_categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a category unless one with the same name exists.
    ///
    /// Returns `true` when a row was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure(&self, name: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO asset_categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name.trim())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
