//! User administration: list, invite, change role, remove.
//!
//! Every operation here needs the privileged identity client. Without it
//! the page shows a configuration card and each action redirects with
//! `error=missing_service_role_key`.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use ict_assets_core::{ActionOutcome, Email, Role, Toast, ToastScope, UserId};

use crate::{
    db::ProfileRepository,
    filters,
    middleware::RequireViewer,
    models::{Profile, Viewer},
    services::identity::IdentityUser,
    state::AppState,
};

use super::{PageContext, clean};

/// Users shown per page.
pub const PAGE_SIZE: u32 = 10;

/// Invite form.
#[derive(Debug, Deserialize)]
pub struct InviteForm {
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Role change form.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

/// Removal form.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub user_id: Option<String>,
}

/// A user joined with their profile.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub login_id: String,
    pub role: Role,
    pub last_sign_in: String,
}

impl UserRow {
    fn new(user: &IdentityUser, profile: Option<&Profile>) -> Self {
        let name = profile
            .and_then(Profile::name)
            .or_else(|| user.metadata_name())
            .unwrap_or_default()
            .to_string();
        let login_id = user.login_id();

        Self {
            id: user.id.to_string(),
            name,
            email: user.email.clone().unwrap_or_default(),
            login_id: if login_id.is_empty() {
                "-".to_string()
            } else {
                login_id
            },
            role: profile.map_or(Role::Staff, |p| p.role),
            last_sign_in: user
                .last_sign_in_at
                .as_deref()
                .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
                .map(|t| super::format_timestamp(t.to_utc()))
                .unwrap_or_else(|| "Never".to_string()),
        }
    }

    /// Whether the lowercase `needle` occurs in name, email, login id or role.
    fn matches(&self, needle: &str) -> bool {
        let haystack = format!(
            "{} {} {} {}",
            self.name,
            self.email,
            self.login_id,
            self.role.as_str().replace('_', " ")
        )
        .to_lowercase();
        haystack.contains(needle)
    }

    /// Badge class for the role column.
    #[must_use]
    pub const fn role_class(&self) -> &'static str {
        match self.role {
            Role::Admin => "badge-admin",
            Role::AdminAssistant => "badge-assistant",
            Role::Staff => "badge-staff",
        }
    }
}

/// Pagination link.
#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

/// Users page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersTemplate {
    pub page: PageContext,
    pub configured: bool,
    pub users: Vec<UserRow>,
    pub query: String,
    pub roles: Vec<Role>,
    pub pages: Vec<PageLink>,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub error: Option<String>,
}

/// Requested page number, at least 1.
fn page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

/// Total page count, at least 1.
fn total_pages(total: u64) -> u32 {
    u32::try_from(total.div_ceil(u64::from(PAGE_SIZE)))
        .unwrap_or(u32::MAX)
        .max(1)
}

fn page_href(base: &str, query: &str, number: u32) -> String {
    if query.is_empty() {
        format!("{base}?page={number}")
    } else {
        format!("{base}?q={}&page={number}", urlencoding::encode(query))
    }
}

/// Parse the `user_id` field: blank is `missing_user_id`, malformed is
/// `invalid_request`.
fn parse_user_id(raw: Option<&str>) -> Result<UserId, &'static str> {
    let raw = clean(raw).ok_or("missing_user_id")?;
    UserId::parse(&raw).ok_or("invalid_request")
}

fn finish(viewer: &Viewer, outcome: &ActionOutcome) -> Redirect {
    Redirect::to(&outcome.redirect_to(&format!("{}/users", viewer.base_path())))
}

/// User list with search and pagination.
#[instrument(skip(viewer, state, params))]
pub async fn index(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let page = PageContext::new(&viewer, "Users", "/users")
        .with_toast(Toast::from_query(ToastScope::Users, &params));
    let query = params.get("q").map(|q| q.trim().to_string()).unwrap_or_default();

    let mut template = UsersTemplate {
        page,
        configured: false,
        users: vec![],
        query: query.clone(),
        roles: Role::ALL.to_vec(),
        pages: vec![],
        prev_href: None,
        next_href: None,
        error: None,
    };

    let Some(admin) = state.identity_admin() else {
        return template.into_response();
    };
    template.configured = true;

    let current = page_number(params.get("page").map(String::as_str));
    let listing = match admin.list_users(current, PAGE_SIZE).await {
        Ok(listing) => listing,
        Err(e) => {
            tracing::error!("Failed to list users: {e}");
            template.error = Some(e.user_message());
            return template.into_response();
        }
    };

    let ids: Vec<UserId> = listing.users.iter().map(|u| u.id).collect();
    let profiles = ProfileRepository::new(state.pool())
        .get_many(&ids)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load profiles for user list: {e}");
            HashMap::new()
        });

    let needle = query.to_lowercase();
    template.users = listing
        .users
        .iter()
        .map(|u| UserRow::new(u, profiles.get(&u.id)))
        .filter(|row| needle.is_empty() || row.matches(&needle))
        .collect();

    let total = listing
        .total
        .unwrap_or_else(|| u64::try_from(listing.users.len()).unwrap_or(0));
    let pages = total_pages(total);
    let base = format!("{}/users", viewer.base_path());
    template.pages = (1..=pages)
        .map(|number| PageLink {
            number,
            href: page_href(&base, &query, number),
            current: number == current,
        })
        .collect();
    template.prev_href = (current > 1).then(|| page_href(&base, &query, current - 1));
    template.next_href = (current < pages).then(|| page_href(&base, &query, current + 1));

    template.into_response()
}

/// Invite a user by email with an initial role.
#[instrument(skip(viewer, state, form))]
pub async fn invite(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Form(form): Form<InviteForm>,
) -> Redirect {
    let email = match Email::parse(form.email.as_deref()) {
        Ok(email) => email,
        Err(e) => return finish(&viewer, &ActionOutcome::error(e.code())),
    };
    let Some(admin) = state.identity_admin() else {
        return finish(&viewer, &ActionOutcome::error("missing_service_role_key"));
    };
    let role = Role::normalize(form.role.as_deref());
    let redirect_to = state.config().invite_redirect_url();

    let invited = match admin.invite(email.as_str(), role, &redirect_to).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Invite failed: {e}");
            return finish(&viewer, &ActionOutcome::error(e.user_message()));
        }
    };

    if let Err(e) = ProfileRepository::new(state.pool())
        .upsert_role(invited.id, role)
        .await
    {
        tracing::warn!(user_id = %invited.id, "Failed to store invited role: {e}");
        return finish(&viewer, &ActionOutcome::error(e.user_message()));
    }

    tracing::info!(user_id = %invited.id, role = role.as_str(), "User invited");
    finish(&viewer, &ActionOutcome::Invited)
}

/// Change a user's role.
#[instrument(skip(viewer, state, form))]
pub async fn update_role(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Form(form): Form<RoleForm>,
) -> Redirect {
    let id = match parse_user_id(form.user_id.as_deref()) {
        Ok(id) => id,
        Err(code) => return finish(&viewer, &ActionOutcome::error(code)),
    };
    if state.identity_admin().is_none() {
        return finish(&viewer, &ActionOutcome::error("missing_service_role_key"));
    }
    let role = Role::normalize(form.role.as_deref());

    match ProfileRepository::new(state.pool()).upsert_role(id, role).await {
        Ok(()) => {
            tracing::info!(user_id = %id, role = role.as_str(), "Role updated");
            finish(&viewer, &ActionOutcome::Updated)
        }
        Err(e) => {
            tracing::warn!(user_id = %id, "Failed to update role: {e}");
            finish(&viewer, &ActionOutcome::error(e.user_message()))
        }
    }
}

/// Remove an identity, then its profile.
#[instrument(skip(viewer, state, form))]
pub async fn delete(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Form(form): Form<DeleteForm>,
) -> Redirect {
    let id = match parse_user_id(form.user_id.as_deref()) {
        Ok(id) => id,
        Err(code) => return finish(&viewer, &ActionOutcome::error(code)),
    };
    let Some(admin) = state.identity_admin() else {
        return finish(&viewer, &ActionOutcome::error("missing_service_role_key"));
    };

    if let Err(e) = admin.delete_user(id).await {
        tracing::warn!(user_id = %id, "Failed to delete identity: {e}");
        return finish(&viewer, &ActionOutcome::error(e.user_message()));
    }
    if let Err(e) = ProfileRepository::new(state.pool()).delete(id).await {
        tracing::warn!(user_id = %id, "Failed to delete profile: {e}");
        return finish(&viewer, &ActionOutcome::error(e.user_message()));
    }

    tracing::info!(user_id = %id, "User removed");
    finish(&viewer, &ActionOutcome::Deleted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn identity(email: &str, username: Option<&str>) -> IdentityUser {
        serde_json::from_value(serde_json::json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "email": email,
            "user_metadata": { "username": username, "full_name": "Meta Name" },
        }))
        .unwrap()
    }

    #[test]
    fn test_page_number_is_at_least_one() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some("0")), 1);
        assert_eq!(page_number(Some("abc")), 1);
        assert_eq!(page_number(Some("3")), 3);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(10), 1);
        assert_eq!(total_pages(11), 2);
    }

    #[test]
    fn test_parse_user_id_codes() {
        assert_eq!(parse_user_id(None), Err("missing_user_id"));
        assert_eq!(parse_user_id(Some("  ")), Err("missing_user_id"));
        assert_eq!(parse_user_id(Some("nope")), Err("invalid_request"));
        assert!(parse_user_id(Some("00000000-0000-0000-0000-000000000001")).is_ok());
    }

    #[test]
    fn test_row_prefers_profile_name_and_defaults_role() {
        let user = identity("aina@agency.gov.my", None);
        let row = UserRow::new(&user, None);
        assert_eq!(row.name, "Meta Name");
        assert_eq!(row.login_id, "aina");
        assert_eq!(row.role, Role::Staff);
        assert_eq!(row.last_sign_in, "Never");

        let profile = Profile {
            id: user.id,
            role: Role::AdminAssistant,
            full_name: Some("Aina Rahman".to_string()),
            created_at: Utc::now(),
        };
        let row = UserRow::new(&user, Some(&profile));
        assert_eq!(row.name, "Aina Rahman");
        assert_eq!(row.role_class(), "badge-assistant");
    }

    #[test]
    fn test_search_covers_login_id_and_role() {
        let row = UserRow::new(&identity("x@agency.gov.my", Some("ict.officer")), None);
        assert!(row.matches("ict.officer"));
        assert!(row.matches("staff"));
        assert!(!row.matches("admin"));
    }

    #[test]
    fn test_page_href_keeps_query() {
        assert_eq!(page_href("/admin/users", "", 2), "/admin/users?page=2");
        assert_eq!(
            page_href("/admin/users", "a b", 2),
            "/admin/users?q=a%20b&page=2"
        );
    }

    mod actions {
        use axum::{
            Extension, Router,
            body::Body,
            http::{Request, header},
            routing::post,
        };
        use tower::ServiceExt;

        use super::super::{delete, invite};
        use crate::{routes::test_support, state::AppState};
        use ict_assets_core::Role;

        async fn submit(state: AppState, path: &str, body: &'static str) -> String {
            let app = Router::new()
                .route("/admin/users/invite", post(invite))
                .route("/admin/users/delete", post(delete))
                .layer(Extension(test_support::viewer(Role::Admin)))
                .with_state(state);
            let response = app
                .oneshot(
                    Request::post(path)
                        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert!(response.status().is_redirection());
            response.headers()[header::LOCATION]
                .to_str()
                .unwrap()
                .to_string()
        }

        #[tokio::test]
        async fn test_blank_invite_email_stops_before_provider() {
            for state in [test_support::state_with_unreachable_admin(), test_support::state(&[])] {
                let location = submit(state, "/admin/users/invite", "email=++&role=staff").await;
                assert_eq!(location, "/admin/users?error=missing_email");
            }
        }

        #[tokio::test]
        async fn test_malformed_invite_email() {
            let location = submit(
                test_support::state_with_unreachable_admin(),
                "/admin/users/invite",
                "email=aina&role=staff",
            )
            .await;
            assert_eq!(location, "/admin/users?error=invalid_email");
        }

        #[tokio::test]
        async fn test_invite_without_service_key() {
            let location = submit(
                test_support::state(&[]),
                "/admin/users/invite",
                "email=aina%40agency.gov.my&role=admin_assistant",
            )
            .await;
            assert_eq!(location, "/admin/users?error=missing_service_role_key");
        }

        #[tokio::test]
        async fn test_failed_invite_reports_provider_error() {
            let location = submit(
                test_support::state_with_unreachable_admin(),
                "/admin/users/invite",
                "email=aina%40agency.gov.my&role=staff",
            )
            .await;
            assert!(location.starts_with("/admin/users?error="), "{location}");
            assert!(!location.contains("invited=1"));
        }

        #[tokio::test]
        async fn test_delete_validates_user_id() {
            let state = test_support::state_with_unreachable_admin();
            let location = submit(state.clone(), "/admin/users/delete", "user_id=+").await;
            assert_eq!(location, "/admin/users?error=missing_user_id");

            let location = submit(state, "/admin/users/delete", "user_id=not-a-uuid").await;
            assert_eq!(location, "/admin/users?error=invalid_request");
        }
    }
}
