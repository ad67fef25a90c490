//! Database operations for the dashboard `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `profiles` - Role and display name per identity-provider user
//! - `asset_categories` / `assets` - Asset register
//! - `maintenance_requests` - Repair requests raised against assets
//! - `feedback` - Free-text feedback from staff and assistants
//! - `notifications` - Per-recipient notifications (change feed via trigger)
//! - `dashboard.session` - tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/dashboard/migrations/` and run via:
//! ```bash
//! cargo run -p ict-assets-cli -- migrate
//! ```

pub mod assets;
pub mod categories;
pub mod feedback;
pub mod maintenance;
pub mod notifications;
pub mod profiles;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use assets::{AssetFact, AssetRepository, AssetSearch};
pub use categories::CategoryRepository;
pub use feedback::FeedbackRepository;
pub use maintenance::{MaintenanceRepository, StatusCounts};
pub use notifications::NotificationRepository;
pub use profiles::ProfileRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate category name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Message safe to pass back through an `error=` redirect.
    ///
    /// Database errors surface the server's message text; the rest use
    /// their display form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(sqlx::Error::Database(db)) => db.message().to_string(),
            Self::Database(_) => "Database unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// `ILIKE` pattern for a case-insensitive substring match.
///
/// Returns `None` for blank input so queries can skip the filter.
#[must_use]
pub fn contains_pattern(needle: Option<&str>) -> Option<String> {
    let needle = needle.map(str::trim).filter(|s| !s.is_empty())?;
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}
