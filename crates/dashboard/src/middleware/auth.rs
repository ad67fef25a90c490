//! Authentication extractors and session helpers.
//!
//! Guarded pages read the [`Viewer`] the route guard put in the request
//! extensions. API handlers resolve the caller from the session directly
//! and answer `401` JSON instead of redirecting.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::{
    error::ApiError,
    models::{CurrentUser, Viewer, session_keys},
    state::AppState,
};

use super::guard::resolve_identity;

/// Extractor for the guarded caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn page(RequireViewer(viewer): RequireViewer) -> impl IntoResponse {
///     format!("Hello, {}!", viewer.display_name())
/// }
/// ```
pub struct RequireViewer(pub Viewer);

impl<S> FromRequestParts<S> for RequireViewer
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Viewer>()
            .cloned()
            .map(Self)
            .ok_or_else(|| Redirect::to("/login").into_response())
    }
}

/// Extractor that additionally requires an admin or admin assistant.
///
/// Staff are sent back to their own dashboard.
pub struct RequireManager(pub Viewer);

impl<S> FromRequestParts<S> for RequireManager
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireViewer(viewer) = RequireViewer::from_request_parts(parts, state).await?;
        if viewer.role.is_manager() {
            Ok(Self(viewer))
        } else {
            Err(Redirect::to(viewer.base_path()).into_response())
        }
    }
}

/// Extractor for `/api/*` handlers: the signed-in user or `401` JSON.
pub struct ApiUser(pub CurrentUser);

impl FromRequestParts<AppState> for ApiUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(ApiError::unauthorized)?;

        resolve_identity(state, &session)
            .await
            .map(Self)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Extractor that optionally resolves the signed-in user.
pub struct OptionalUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>().cloned() {
            Some(session) => resolve_identity(state, &session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the signed-in user, cycling the session id first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop all session data (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be flushed.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
