//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Redirect to the caller's role home (or /login)
//!
//! # Auth
//! GET  /login                   - Login page
//! POST /login                   - Password sign-in
//! POST /logout                  - Sign out
//! GET  /register                - Self registration page (also the invite landing)
//! POST /register                - Self registration
//! GET  /auth/confirm            - Invite confirmation (reads tokens from the fragment)
//! POST /auth/confirm            - Store the invite session
//! GET  /auth/set-password       - Set password after an invite
//! POST /auth/set-password       - Update password and name
//!
//! # Role areas (route guard applies), {base} = /admin | /assistant | /staff
//! GET  {base}                   - Dashboard
//! GET  {base}/assets            - Asset list and search
//! GET  {base}/assets/{id}       - Asset detail
//! POST {base}/assets/create     - Create asset (managers)
//! POST {base}/assets/update     - Update asset (managers)
//! POST {base}/assets/delete     - Delete asset (managers)
//! GET  {base}/qr                - QR management (managers)
//! POST {base}/qr/generate       - Store an asset's QR code (managers)
//! GET  {base}/scan              - Scan / manual code entry
//! GET  {base}/scan/result       - Scan lookup result
//! GET  {base}/maintenance       - Maintenance list (managers) or request form (staff)
//! POST {base}/maintenance/status - Update request status (managers)
//! POST /staff/maintenance       - File a maintenance request
//! GET  {base}/reports           - Reports (managers)
//! GET  {base}/notifications     - All notifications for the caller
//! GET  /admin/feedback          - Feedback inbox
//! GET  /admin/feedback/{id}     - Feedback detail
//! GET  /admin/users             - User administration
//! POST /admin/users/invite      - Invite a user
//! POST /admin/users/role        - Change a user's role
//! POST /admin/users/delete      - Remove a user
//! GET|POST /assistant/feedback, /staff/feedback - Feedback form
//!
//! # API
//! POST  /api/notifications      - Fan out a notification to managers
//! PATCH /api/notifications      - Mark the caller's notifications read
//! GET   /api/notifications/stream - Live badge (server-sent events)
//! GET   /api/qr                 - QR image proxy
//! ```

use axum::{
    Router,
    middleware::from_fn_with_state,
    response::Redirect,
    routing::{get, post},
};

use ict_assets_core::{Role, Toast};

use crate::{
    middleware::{OptionalUser, guard::load_viewer, route_guard},
    models::Viewer,
    state::AppState,
};

pub mod assets;
pub mod auth;
pub mod dashboard;
pub mod feedback;
pub mod maintenance;
pub mod notifications;
pub mod qr;
pub mod reports;
pub mod scan;
pub mod users;

#[cfg(test)]
mod test_support;

// =============================================================================
// Page chrome
// =============================================================================

/// One sidebar link.
#[derive(Debug, Clone)]
pub struct NavItem {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

/// Sidebar entries per role, as `(label, suffix)` under the base path.
fn nav_entries(role: Role) -> &'static [(&'static str, &'static str)] {
    match role {
        Role::Admin => &[
            ("Dashboard", ""),
            ("Assets", "/assets"),
            ("Maintenance", "/maintenance"),
            ("QR Codes", "/qr"),
            ("Scan", "/scan"),
            ("Reports", "/reports"),
            ("Feedback", "/feedback"),
            ("Users", "/users"),
            ("Notifications", "/notifications"),
        ],
        Role::AdminAssistant => &[
            ("Dashboard", ""),
            ("Assets", "/assets"),
            ("Maintenance", "/maintenance"),
            ("QR Codes", "/qr"),
            ("Scan", "/scan"),
            ("Reports", "/reports"),
            ("Feedback", "/feedback"),
            ("Notifications", "/notifications"),
        ],
        Role::Staff => &[
            ("Dashboard", ""),
            ("My Assets", "/assets"),
            ("Maintenance", "/maintenance"),
            ("Scan", "/scan"),
            ("Feedback", "/feedback"),
            ("Notifications", "/notifications"),
        ],
    }
}

/// Layout data shared by every signed-in page.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub title: &'static str,
    pub current_path: String,
    pub user_name: String,
    pub user_email: String,
    pub role_label: &'static str,
    pub base_path: &'static str,
    pub is_admin: bool,
    pub is_manager: bool,
    pub nav: Vec<NavItem>,
    pub toast: Option<Toast>,
}

impl PageContext {
    /// Chrome for `viewer` on the page at `{base}{suffix}`.
    #[must_use]
    pub fn new(viewer: &Viewer, title: &'static str, suffix: &str) -> Self {
        let base = viewer.base_path();
        let current_path = format!("{base}{suffix}");
        let nav = nav_entries(viewer.role)
            .iter()
            .map(|&(label, entry)| {
                let href = format!("{base}{entry}");
                let active = if entry.is_empty() {
                    current_path == href
                } else {
                    current_path.starts_with(&href)
                };
                NavItem { label, href, active }
            })
            .collect();

        Self {
            title,
            current_path,
            user_name: viewer.display_name(),
            user_email: viewer.email().unwrap_or_default().to_string(),
            role_label: viewer.role.label(),
            base_path: base,
            is_admin: viewer.role == Role::Admin,
            is_manager: viewer.role.is_manager(),
            nav,
            toast: None,
        }
    }

    #[must_use]
    pub fn with_toast(mut self, toast: Option<Toast>) -> Self {
        self.toast = toast;
        self
    }
}

// =============================================================================
// Form helpers
// =============================================================================

/// Trim a form value; blank becomes `None`.
#[must_use]
pub fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Post-action redirect base from a `redirectTo` field.
///
/// Blank values and anything that is not a local absolute path fall back
/// to `fallback`, as do targets containing `\` or control characters.
#[must_use]
pub fn redirect_base(raw: Option<&str>, fallback: &str) -> String {
    match raw.map(str::trim) {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => fallback.to_string(),
    }
}

fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/' | '\\'))
        && !path.chars().any(|c| c == '\\' || c.is_control())
}

/// Format a timestamp for tables: `15 Mar 2026, 14:05`.
#[must_use]
pub fn format_timestamp(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%d %b %Y, %H:%M").to_string()
}

// =============================================================================
// Routers
// =============================================================================

/// Routes shared by admins and admin assistants.
fn manager_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::home))
        .route("/assets", get(assets::index))
        .route("/assets/create", post(assets::create))
        .route("/assets/update", post(assets::update))
        .route("/assets/delete", post(assets::delete))
        .route("/assets/{id}", get(assets::show))
        .route("/qr", get(qr::index))
        .route("/qr/generate", post(qr::generate))
        .route("/scan", get(scan::index))
        .route("/scan/result", get(scan::result))
        .route("/maintenance", get(maintenance::index))
        .route("/maintenance/status", post(maintenance::update_status))
        .route("/reports", get(reports::index))
        .route("/notifications", get(notifications::index))
}

/// Routes under `/admin`.
pub fn admin_routes() -> Router<AppState> {
    manager_routes()
        .route("/feedback", get(feedback::inbox))
        .route("/feedback/{id}", get(feedback::show))
        .route("/users", get(users::index))
        .route("/users/invite", post(users::invite))
        .route("/users/role", post(users::update_role))
        .route("/users/delete", post(users::delete))
}

/// Routes under `/assistant`.
pub fn assistant_routes() -> Router<AppState> {
    manager_routes().route("/feedback", get(feedback::form).post(feedback::submit))
}

/// Routes under `/staff`.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::home))
        .route("/assets", get(assets::index))
        .route("/assets/{id}", get(assets::show))
        .route("/scan", get(scan::index))
        .route("/scan/result", get(scan::result))
        .route(
            "/maintenance",
            get(maintenance::staff_index).post(maintenance::staff_submit),
        )
        .route("/feedback", get(feedback::form).post(feedback::submit))
        .route("/notifications", get(notifications::index))
}

/// Public authentication routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/auth/confirm", get(auth::confirm_page).post(auth::confirm))
        .route(
            "/auth/set-password",
            get(auth::set_password_page).post(auth::set_password),
        )
}

/// JSON and media endpoints.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            post(notifications::announce).patch(notifications::mark_read),
        )
        .route("/notifications/stream", get(notifications::stream))
        .route("/qr", get(qr::image))
}

/// `/`: send signed-in callers to their role home.
async fn root(
    axum::extract::State(state): axum::extract::State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Redirect {
    match user {
        Some(user) => match load_viewer(&state, user).await {
            Ok(viewer) => Redirect::to(viewer.base_path()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load profile for root redirect");
                Redirect::to("/login")
            }
        },
        None => Redirect::to("/login"),
    }
}

/// Plain 404 for unknown paths outside the role areas.
async fn not_found() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::NOT_FOUND, "Not found")
}

/// Create all routes for the dashboard.
///
/// The route guard wraps the whole router, fallback included, so every
/// path under a role prefix is checked whether or not a route matches.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .merge(auth_routes())
        .nest("/admin", admin_routes())
        .nest("/assistant", assistant_routes())
        .nest("/staff", staff_routes())
        .nest("/api", api_routes())
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), route_guard))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::CurrentUser;
    use ict_assets_core::UserId;

    fn viewer(role: Role) -> Viewer {
        Viewer {
            user: CurrentUser {
                id: UserId::new(uuid::Uuid::nil()),
                email: Some("aina@agency.gov.my".to_string()),
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
                expires_at: 0,
            },
            role,
            full_name: Some("Aina".to_string()),
        }
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean(Some("  PC-01 ")), Some("PC-01".to_string()));
        assert_eq!(clean(Some("   ")), None);
        assert_eq!(clean(None), None);
    }

    #[test]
    fn test_redirect_base_rejects_foreign_targets() {
        assert_eq!(redirect_base(Some(" /staff/assets "), "/admin/assets"), "/staff/assets");
        assert_eq!(redirect_base(Some(""), "/admin/assets"), "/admin/assets");
        assert_eq!(redirect_base(None, "/admin/assets"), "/admin/assets");
        assert_eq!(
            redirect_base(Some("https://evil.example"), "/admin/assets"),
            "/admin/assets"
        );
        assert_eq!(redirect_base(Some("//evil.example"), "/admin/qr"), "/admin/qr");
        for target in [
            "/\\evil.example",
            "\\\\evil.example",
            "/admin\\..\\evil",
            "/\t/evil.example",
            "/\n/evil.example",
            "admin/assets",
        ] {
            assert_eq!(redirect_base(Some(target), "/admin/qr"), "/admin/qr", "{target:?}");
        }
        assert_eq!(
            redirect_base(Some("/admin/maintenance?status=Pending"), "/admin/qr"),
            "/admin/maintenance?status=Pending"
        );
    }

    #[test]
    fn test_nav_marks_active_entry() {
        let page = PageContext::new(&viewer(Role::AdminAssistant), "Assets", "/assets");
        assert_eq!(page.current_path, "/assistant/assets");
        let active: Vec<_> = page.nav.iter().filter(|n| n.active).map(|n| n.label).collect();
        assert_eq!(active, vec!["Assets"]);
        assert!(page.nav.iter().all(|n| n.href.starts_with("/assistant")));
    }

    #[test]
    fn test_only_admin_nav_has_users() {
        let has_users = |role| {
            PageContext::new(&viewer(role), "Dashboard", "")
                .nav
                .iter()
                .any(|n| n.label == "Users")
        };
        assert!(has_users(Role::Admin));
        assert!(!has_users(Role::AdminAssistant));
        assert!(!has_users(Role::Staff));
    }

    #[test]
    fn test_dashboard_entry_active_only_on_home() {
        let page = PageContext::new(&viewer(Role::Staff), "Dashboard", "");
        let dashboard = page.nav.iter().find(|n| n.label == "Dashboard").unwrap();
        assert!(dashboard.active);
        let page = PageContext::new(&viewer(Role::Staff), "Scan", "/scan");
        let dashboard = page.nav.iter().find(|n| n.label == "Dashboard").unwrap();
        assert!(!dashboard.active);
    }

    mod router {
        use axum::{
            body::Body,
            http::{Request, StatusCode, header::{CONTENT_TYPE, COOKIE, LOCATION}},
        };
        use tower::ServiceExt;

        use super::super::{routes, test_support};

        fn app() -> axum::Router {
            let state = test_support::state(&[]);
            routes(&state)
                .layer(test_support::anonymous())
                .with_state(state)
        }

        async fn get(uri: &str) -> axum::response::Response {
            app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        #[tokio::test]
        async fn test_anonymous_role_pages_redirect_to_login() {
            for uri in ["/admin", "/assistant/assets", "/staff/feedback", "/admin/users"] {
                let response = get(uri).await;
                assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
                assert_eq!(response.headers().get(LOCATION).unwrap(), "/login", "{uri}");
            }
        }

        #[tokio::test]
        async fn test_unrouted_role_paths_redirect_to_login() {
            for uri in ["/admin/nonexistent", "/staff/users", "/admin/", "/assistant/a/b/c"] {
                let response = get(uri).await;
                assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
                assert_eq!(response.headers().get(LOCATION).unwrap(), "/login", "{uri}");
            }
        }

        #[tokio::test]
        async fn test_anonymous_root_redirects_to_login() {
            let response = get("/").await;
            assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
        }

        #[tokio::test]
        async fn test_login_page_renders() {
            let response = get("/login").await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn test_api_requires_session() {
            let response = get("/api/notifications/stream").await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        #[tokio::test]
        async fn test_unknown_path_is_not_found() {
            let response = get("/warehouse").await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        async fn post_notification(method: &str, content_type: &str, body: &str) -> (StatusCode, String) {
            let state = test_support::state(&[]);
            let (sessions, cookie) = test_support::signed_in(&test_support::current_user()).await;
            let app = routes(&state).layer(sessions).with_state(state);

            let response = app
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/api/notifications")
                        .header(COOKIE, cookie)
                        .header(CONTENT_TYPE, content_type)
                        .body(Body::from(body.to_string()))
                        .unwrap(),
                )
                .await
                .unwrap();
            let status = response.status();
            (status, test_support::body_text(response).await)
        }

        #[tokio::test]
        async fn test_mistyped_kind_is_invalid_kind() {
            for method in ["POST", "PATCH"] {
                let (status, body) = post_notification(method, "application/json", r#"{"kind":5}"#).await;
                assert_eq!(status, StatusCode::BAD_REQUEST, "{method}");
                let json: serde_json::Value = serde_json::from_str(&body).unwrap();
                assert_eq!(json["error"], "Invalid kind");
            }
        }

        #[tokio::test]
        async fn test_unparseable_body_is_invalid_kind() {
            for (content_type, body) in [("application/json", "not json"), ("text/plain", "maintenance")] {
                let (status, body) = post_notification("POST", content_type, body).await;
                assert_eq!(status, StatusCode::BAD_REQUEST, "{content_type}");
                assert_eq!(body, r#"{"error":"Invalid kind"}"#);
            }
        }
    }
}
