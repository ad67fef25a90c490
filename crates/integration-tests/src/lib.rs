//! Integration tests for ICT Asset Desk.
//!
//! # Running Tests
//!
//! ```bash
//! # Apply migrations to the test database
//! DATABASE_URL=postgres://localhost/ict_assets_test cargo run -p ict-assets-cli -- migrate
//!
//! # Start the dashboard, then run the ignored tests
//! cargo run -p ict-assets-dashboard &
//! cargo test -p ict-assets-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `http_guard` - Route guard and public pages against a running server
//! - `notifications_db` - Notification storage and change feed against `PostgreSQL`
//! - `admin_actions` - Invite, delete and resolve flows through the in-process
//!   router, with a stand-in identity provider

use std::collections::HashMap;

use axum::Router;
use reqwest::{Client, redirect::Policy};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions::{
    MemoryStore, SessionManagerLayer, SessionStore,
    cookie::time::{Duration, OffsetDateTime},
    session::{Id, Record},
};

use ict_assets_core::UserId;
use ict_assets_dashboard::{
    config::DashboardConfig,
    models::{CurrentUser, session_keys},
    state::AppState,
};

/// Base URL of the running dashboard (`DASHBOARD_BASE_URL`).
#[must_use]
pub fn dashboard_base_url() -> String {
    std::env::var("DASHBOARD_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Client that keeps cookies and does not follow redirects, so tests can
/// assert on `Location` headers.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn http_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Connect to the migrated test database (`TEST_DATABASE_URL`, then
/// `DATABASE_URL`).
///
/// # Panics
///
/// Panics if neither variable is set or the connection fails.
pub async fn test_pool() -> PgPool {
    ict_assets_dashboard::db::create_pool(&database_url())
        .await
        .expect("Failed to connect to test database")
}

fn database_url() -> SecretString {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL or DATABASE_URL must be set");
    SecretString::from(url)
}

/// Serve `identity` on an ephemeral local port and return its base URL.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub async fn spawn_identity(identity: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind identity stand-in");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, identity).await;
    });
    format!("http://{addr}")
}

/// Dashboard state over the test database, with the privileged identity
/// client pointed at `identity_url`.
///
/// # Panics
///
/// Panics if the configuration is rejected or the database is unreachable.
pub async fn app_state(identity_url: &str) -> AppState {
    let database_url = database_url();
    let env: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", database_url.expose_secret().to_string()),
        ("SUPABASE_URL", identity_url.to_string()),
        ("SUPABASE_ANON_KEY", "anon-test-key".to_string()),
        (
            "SUPABASE_SERVICE_ROLE_KEY",
            "Zq8vN2xL4pR7tK1mW9bC3yH6jF0dS5aE".to_string(),
        ),
    ]);
    let config = DashboardConfig::from_lookup(|key| env.get(key).cloned())
        .expect("Invalid test configuration");
    AppState::new(config, test_pool().await).expect("Failed to build state")
}

/// A signed-in user whose access token is valid for another hour.
#[must_use]
pub fn current_user(id: UserId) -> CurrentUser {
    CurrentUser {
        id,
        email: Some("admin@agency.gov.my".to_string()),
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: chrono::Utc::now().timestamp() + 3600,
    }
}

/// Session layer already holding `user`, plus the matching `Cookie` header.
///
/// # Panics
///
/// Panics if the session record cannot be stored.
pub async fn signed_in(user: &CurrentUser) -> (SessionManagerLayer<MemoryStore>, String) {
    let store = MemoryStore::default();
    let mut record = Record {
        id: Id::default(),
        data: HashMap::from([(
            session_keys::CURRENT_USER.to_string(),
            serde_json::to_value(user).expect("Unserializable user"),
        )]),
        expiry_date: OffsetDateTime::now_utc() + Duration::hours(1),
    };
    store.create(&mut record).await.expect("Failed to store session");

    (SessionManagerLayer::new(store), format!("id={}", record.id))
}
