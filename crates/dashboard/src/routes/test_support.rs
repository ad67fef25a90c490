//! Fixtures for router tests: state without a live database, signed-in
//! sessions in a `MemoryStore`, and body helpers.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use axum::{body::Body, response::Response};
use tower_sessions::{
    MemoryStore, SessionManagerLayer, SessionStore,
    cookie::time::{Duration, OffsetDateTime},
    session::{Id, Record},
};

use ict_assets_core::{Role, UserId};

use crate::{
    config::DashboardConfig,
    models::{CurrentUser, Viewer, session_keys},
    state::AppState,
};

/// Identity provider address nothing listens on; any call to it fails.
pub const UNREACHABLE_IDENTITY: &str = "http://127.0.0.1:9";

/// State over a lazy pool. `extra` overrides or adds environment values.
pub fn state(extra: &[(&str, &str)]) -> AppState {
    let env: HashMap<String, String> = [
        ("DATABASE_URL", "postgres://localhost/assets"),
        ("SUPABASE_URL", "https://project.supabase.co"),
        ("SUPABASE_ANON_KEY", "anon-public-key"),
    ]
    .into_iter()
    .chain(extra.iter().copied())
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let config = DashboardConfig::from_lookup(|key| env.get(key).cloned()).unwrap();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/assets")
        .unwrap();
    AppState::new(config, pool).unwrap()
}

/// Privileged identity configured, but pointed at [`UNREACHABLE_IDENTITY`].
pub fn state_with_unreachable_admin() -> AppState {
    state(&[
        ("SUPABASE_URL", UNREACHABLE_IDENTITY),
        ("SUPABASE_SERVICE_ROLE_KEY", "Zq8vN2xL4pR7tK1mW9bC3yH6jF0dS5aE"),
    ])
}

/// A user whose access token is valid for another hour.
pub fn current_user() -> CurrentUser {
    CurrentUser {
        id: UserId::random(),
        email: Some("aina@agency.gov.my".to_string()),
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: chrono::Utc::now().timestamp() + 3600,
    }
}

/// A guarded viewer with `role`.
pub fn viewer(role: Role) -> Viewer {
    Viewer {
        user: current_user(),
        role,
        full_name: Some("Aina".to_string()),
    }
}

/// Session store holding `user`, plus the matching `Cookie` header value.
pub async fn signed_in(user: &CurrentUser) -> (SessionManagerLayer<MemoryStore>, String) {
    let store = MemoryStore::default();
    let mut record = Record {
        id: Id::default(),
        data: HashMap::from([(
            session_keys::CURRENT_USER.to_string(),
            serde_json::to_value(user).unwrap(),
        )]),
        expiry_date: OffsetDateTime::now_utc() + Duration::hours(1),
    };
    store.create(&mut record).await.unwrap();

    (SessionManagerLayer::new(store), format!("id={}", record.id))
}

/// Empty session layer for anonymous requests.
pub fn anonymous() -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
}

/// Collect a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
