//! Role-based route guard for `/admin`, `/assistant` and `/staff`.
//!
//! Every request under a protected prefix resolves the caller from the
//! session, loads the profile role, and either passes through with a
//! [`Viewer`] in the request extensions or redirects.

use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use ict_assets_core::Role;

use crate::{
    db::ProfileRepository,
    error::{AppError, set_sentry_user},
    models::{CurrentUser, Viewer, session_keys},
    state::AppState,
};

/// Outcome of the guard for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectLogin,
    Redirect(&'static str),
}

/// Decide what happens to a request for `path` from a caller with `role`.
///
/// `None` means anonymous. Paths outside every protected prefix are allowed.
#[must_use]
pub fn guard_decision(role: Option<Role>, path: &str) -> GuardDecision {
    let Some(owner) = Role::from_path_prefix(path) else {
        return GuardDecision::Allow;
    };
    match role {
        None => GuardDecision::RedirectLogin,
        Some(role) if role != owner => GuardDecision::Redirect(role.base_path()),
        Some(_) => GuardDecision::Allow,
    }
}

/// Whether `path` lives under one of the role areas.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    Role::from_path_prefix(path).is_some()
}

/// Resolve the signed-in user from the session.
///
/// An access token at or near expiry is refreshed and the session updated;
/// a failed refresh signs the user out.
pub async fn resolve_identity(state: &AppState, session: &Session) -> Option<CurrentUser> {
    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()?;

    let now = chrono::Utc::now().timestamp();
    if !user.needs_refresh(now) {
        return Some(user);
    }

    match state.identity().refresh(&user.refresh_token).await {
        Ok(auth) => {
            let refreshed = auth.into_current_user(now);
            if let Err(e) = session.insert(session_keys::CURRENT_USER, &refreshed).await {
                tracing::warn!(error = %e, "Failed to store refreshed session");
            }
            Some(refreshed)
        }
        Err(e) => {
            tracing::info!(user_id = %user.id, error = %e, "Session refresh failed; signing out");
            let _ = session.remove::<CurrentUser>(session_keys::CURRENT_USER).await;
            None
        }
    }
}

/// Load the viewer (role and name) for a resolved user.
///
/// # Errors
///
/// Returns `AppError::Database` if the profile lookup fails.
pub async fn load_viewer(state: &AppState, user: CurrentUser) -> Result<Viewer, AppError> {
    let profile = ProfileRepository::new(state.pool()).get(user.id).await?;
    let (role, full_name) = profile.map_or((Role::Staff, None), |p| (p.role, p.full_name));

    Ok(Viewer {
        user,
        role,
        full_name,
    })
}

/// Guard middleware; mount with `from_fn_with_state` around the whole
/// router so unmatched paths under a role prefix are guarded too.
///
/// Reads the path from [`OriginalUri`] so nesting does not hide the prefix.
pub async fn route_guard(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| request.uri().path(), |original| original.0.path())
        .to_owned();

    if !is_protected(&path) {
        return next.run(request).await;
    }

    let viewer = match resolve_identity(&state, &session).await {
        Some(user) => match load_viewer(&state, user).await {
            Ok(viewer) => Some(viewer),
            Err(e) => return e.into_response(),
        },
        None => None,
    };

    match guard_decision(viewer.as_ref().map(|v| v.role), &path) {
        GuardDecision::Allow => {
            if let Some(viewer) = viewer {
                set_sentry_user(viewer.id(), viewer.email());
                request.extensions_mut().insert(viewer);
            }
            next.run(request).await
        }
        GuardDecision::RedirectLogin => Redirect::to("/login").into_response(),
        GuardDecision::Redirect(target) => {
            tracing::debug!(%path, %target, "Redirecting to role home");
            Redirect::to(target).into_response()
        }
    }
}
