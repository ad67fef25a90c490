//! Session middleware configuration.
//!
//! `PostgreSQL`-backed sessions using tower-sessions. `SameSite=Lax` so
//! invite links opened from an email client keep the session cookie.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, session_store::Error as StoreError};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::DashboardConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ict_assets_session";

/// Session expiry time in seconds (24 hours of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The `dashboard.session` table is created by the migrations.
///
/// # Errors
///
/// Returns an error if the schema or table name is rejected by the store.
pub fn create_session_layer(
    pool: &PgPool,
    config: &DashboardConfig,
) -> Result<SessionManagerLayer<PostgresStore>, StoreError> {
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("dashboard")
        .map_err(|e| StoreError::Backend(e.to_string()))?
        .with_table_name("session")
        .map_err(|e| StoreError::Backend(e.to_string()))?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/"))
}
