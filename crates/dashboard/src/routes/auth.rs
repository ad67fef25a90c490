//! Sign in, sign out, self-registration and invite acceptance.
//!
//! Invite links from the identity provider land on `/register` with the
//! tokens in the URL fragment. `confirm.js` posts them to `/auth/confirm`,
//! which stores the session and continues to `/auth/set-password`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use ict_assets_core::{Email, Role};

use crate::{
    db::ProfileRepository,
    error::clear_sentry_user,
    filters,
    middleware::{
        OptionalUser, clear_current_user,
        guard::{load_viewer, resolve_identity},
        set_current_user,
    },
    models::CurrentUser,
    services::identity::{SignUpOutcome, UserMetadata, UserUpdate},
    state::AppState,
};

use super::clean;

/// Minimum password length for registration and invite acceptance.
pub const MIN_PASSWORD_LEN: usize = 8;

const INVALID_INVITE: &str = "Invite link is invalid or expired.";
const NO_SESSION: &str = "Session not found. Please open the invite link again.";
const ALREADY_REGISTERED: &str =
    "This email already has an account. Use the invite link or sign in.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

/// Tokens lifted from an invite link fragment.
#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<String>,
    pub expires_at: Option<String>,
}

/// Set-password form data.
#[derive(Debug, Deserialize)]
pub struct SetPasswordForm {
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate, Default)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate, Default)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub full_name: String,
    pub email: String,
    pub error: Option<String>,
    /// Sign-up succeeded but the provider wants email confirmation.
    pub check_email: bool,
}

/// Invite confirmation page template.
#[derive(Template, WebTemplate, Default)]
#[template(path = "auth/confirm.html")]
pub struct ConfirmTemplate {
    pub error: Option<String>,
}

/// Set-password page template.
#[derive(Template, WebTemplate, Default)]
#[template(path = "auth/set_password.html")]
pub struct SetPasswordTemplate {
    pub has_session: bool,
    pub email: String,
    pub error: Option<String>,
}

// =============================================================================
// Validation
// =============================================================================

/// Check a new password and its confirmation.
///
/// # Errors
///
/// Returns the message shown above the form.
pub fn validate_password(password: &str, confirm: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 8 characters.");
    }
    if password != confirm {
        return Err("Passwords do not match.");
    }
    Ok(())
}

/// Map a sign-up failure to the message shown on the form.
fn sign_up_message(provider_message: &str) -> String {
    if provider_message.to_lowercase().contains("already") {
        ALREADY_REGISTERED.to_string()
    } else {
        provider_message.to_string()
    }
}

impl ConfirmForm {
    /// Build the session identity skeleton; `None` when a token is missing.
    fn tokens(&self, now: i64) -> Option<(String, String, i64)> {
        let access = clean(self.access_token.as_deref())?;
        let refresh = clean(self.refresh_token.as_deref())?;
        let expires_at = self
            .expires_at
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .or_else(|| {
                self.expires_in
                    .as_deref()
                    .and_then(|v| v.trim().parse::<i64>().ok())
                    .map(|secs| now + secs)
            })
            .unwrap_or(now + 3600);
        Some((access, refresh, expires_at))
    }
}

/// Redirect a signed-in user to their role home.
async fn role_home(state: &AppState, user: CurrentUser) -> Response {
    match load_viewer(state, user).await {
        Ok(viewer) => Redirect::to(viewer.base_path()).into_response(),
        Err(e) => e.into_response(),
    }
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page, or skip it when already signed in.
#[instrument(skip(state, user))]
pub async fn login_page(State(state): State<AppState>, OptionalUser(user): OptionalUser) -> Response {
    match user {
        Some(user) => role_home(&state, user).await,
        None => LoginTemplate::default().into_response(),
    }
}

/// Password sign-in.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = clean(form.email.as_deref()).unwrap_or_default();
    let password = form.password.unwrap_or_default();
    let render = |error: String| {
        LoginTemplate {
            email: email.clone(),
            error: Some(error),
        }
        .into_response()
    };

    if email.is_empty() || password.is_empty() {
        return render("Email and password are required.".to_string());
    }
    let address = match Email::parse(Some(&email)) {
        Ok(address) => address,
        Err(e) => return render(e.to_string()),
    };

    let auth = match state
        .identity()
        .sign_in_with_password(address.as_str(), &password)
        .await
    {
        Ok(auth) => auth,
        Err(e) => {
            tracing::info!("Sign-in failed: {e}");
            return render(e.user_message());
        }
    };

    let user = auth.into_current_user(chrono::Utc::now().timestamp());
    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!("Failed to set session: {e}");
        return render("Login failed".to_string());
    }

    tracing::info!(user_id = %user.id, "Signed in");
    role_home(&state, user).await
}

/// Sign out at the provider (best effort) and drop the session.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    if let Some(user) = resolve_identity(&state, &session).await
        && let Err(e) = state.identity().sign_out(&user.access_token).await
    {
        tracing::warn!("Provider sign-out failed: {e}");
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }
    clear_sentry_user();

    Redirect::to("/login")
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
pub async fn register_page() -> impl IntoResponse {
    RegisterTemplate::default()
}

/// Self sign-up as staff.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let full_name = clean(form.full_name.as_deref());
    let email = clean(form.email.as_deref()).unwrap_or_default();
    let render = |error: Option<String>, check_email: bool| {
        RegisterTemplate {
            full_name: full_name.clone().unwrap_or_default(),
            email: email.clone(),
            error,
            check_email,
        }
        .into_response()
    };

    let address = match Email::parse(Some(&email)) {
        Ok(address) => address,
        Err(e) => return render(Some(e.to_string()), false),
    };
    let password = form.password.unwrap_or_default();
    if let Err(message) =
        validate_password(&password, form.password_confirm.as_deref().unwrap_or_default())
    {
        return render(Some(message.to_string()), false);
    }

    let outcome = match state
        .identity()
        .sign_up(address.as_str(), &password, full_name.as_deref())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::info!("Sign-up failed: {e}");
            return render(Some(sign_up_message(&e.user_message())), false);
        }
    };

    let (user_id, session_user) = match outcome {
        SignUpOutcome::Session(auth) => {
            let user = auth.into_current_user(chrono::Utc::now().timestamp());
            (user.id, Some(user))
        }
        SignUpOutcome::Pending(user) => (user.id, None),
    };

    if let Err(e) = ProfileRepository::new(state.pool())
        .upsert(user_id, Role::Staff, full_name.as_deref())
        .await
    {
        tracing::warn!(%user_id, "Failed to create profile: {e}");
        return render(Some(e.user_message()), false);
    }
    tracing::info!(%user_id, "Account registered");

    match session_user {
        Some(user) => {
            if let Err(e) = set_current_user(&session, &user).await {
                tracing::error!("Failed to set session: {e}");
                return render(Some("Account created. Please sign in.".to_string()), false);
            }
            Redirect::to(Role::Staff.base_path()).into_response()
        }
        None => render(None, true),
    }
}

// =============================================================================
// Invite acceptance
// =============================================================================

/// Page that lifts invite tokens out of the fragment.
pub async fn confirm_page() -> impl IntoResponse {
    ConfirmTemplate::default()
}

/// Verify invite tokens and start a session.
#[instrument(skip(state, session, form))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ConfirmForm>,
) -> Response {
    let render = |error: String| ConfirmTemplate { error: Some(error) }.into_response();

    let now = chrono::Utc::now().timestamp();
    let Some((access_token, refresh_token, expires_at)) = form.tokens(now) else {
        return render(INVALID_INVITE.to_string());
    };

    let identity = match state.identity().get_user(&access_token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::info!("Invite token rejected: {e}");
            return render(e.user_message());
        }
    };

    let user = CurrentUser {
        id: identity.id,
        email: identity.email,
        access_token,
        refresh_token,
        expires_at,
    };
    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!("Failed to set session: {e}");
        return render(INVALID_INVITE.to_string());
    }

    Redirect::to("/auth/set-password").into_response()
}

/// Set-password form for a freshly accepted invite.
#[instrument(skip(user))]
pub async fn set_password_page(OptionalUser(user): OptionalUser) -> impl IntoResponse {
    match user {
        Some(user) => SetPasswordTemplate {
            has_session: true,
            email: user.email.unwrap_or_default(),
            error: None,
        },
        None => SetPasswordTemplate {
            error: Some(NO_SESSION.to_string()),
            ..SetPasswordTemplate::default()
        },
    }
}

/// Set the password and name, then record the invited role.
#[instrument(skip(state, user, form))]
pub async fn set_password(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Form(form): Form<SetPasswordForm>,
) -> Response {
    let Some(user) = user else {
        return SetPasswordTemplate {
            error: Some(NO_SESSION.to_string()),
            ..SetPasswordTemplate::default()
        }
        .into_response();
    };
    let render = |error: String| {
        SetPasswordTemplate {
            has_session: true,
            email: user.email.clone().unwrap_or_default(),
            error: Some(error),
        }
        .into_response()
    };

    let password = form.password.unwrap_or_default();
    if let Err(message) =
        validate_password(&password, form.password_confirm.as_deref().unwrap_or_default())
    {
        return render(message.to_string());
    }

    let full_name = clean(form.full_name.as_deref());
    let update = UserUpdate {
        password: Some(password),
        data: full_name.as_ref().map(|name| UserMetadata {
            full_name: Some(name.clone()),
            ..UserMetadata::default()
        }),
    };
    let identity = match state.identity().update_user(&user.access_token, &update).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(user_id = %user.id, "Password update failed: {e}");
            return render(e.user_message());
        }
    };

    let role = identity.invited_role();
    if let Err(e) = ProfileRepository::new(state.pool())
        .upsert(user.id, role, full_name.as_deref())
        .await
    {
        tracing::warn!(user_id = %user.id, "Failed to store profile: {e}");
        return render(e.user_message());
    }

    tracing::info!(user_id = %user.id, role = role.as_str(), "Invite accepted");
    Redirect::to(role.base_path()).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_rules() {
        assert_eq!(
            validate_password("short", "short"),
            Err("Password must be at least 8 characters.")
        );
        assert_eq!(
            validate_password("longenough", "different"),
            Err("Passwords do not match.")
        );
        assert!(validate_password("longenough", "longenough").is_ok());
    }

    #[test]
    fn test_already_registered_is_rewritten() {
        assert_eq!(sign_up_message("User already registered"), ALREADY_REGISTERED);
        assert_eq!(sign_up_message("Signup disabled"), "Signup disabled");
    }

    fn confirm_form(access: Option<&str>, refresh: Option<&str>) -> ConfirmForm {
        ConfirmForm {
            access_token: access.map(String::from),
            refresh_token: refresh.map(String::from),
            expires_in: Some("600".to_string()),
            expires_at: None,
        }
    }

    #[test]
    fn test_confirm_requires_both_tokens() {
        assert!(confirm_form(None, Some("r")).tokens(0).is_none());
        assert!(confirm_form(Some("a"), Some(" ")).tokens(0).is_none());
    }

    #[test]
    fn test_confirm_expiry_prefers_absolute() {
        let (_, _, expires_at) = confirm_form(Some("a"), Some("r")).tokens(1_000).unwrap();
        assert_eq!(expires_at, 1_600);

        let mut form = confirm_form(Some("a"), Some("r"));
        form.expires_at = Some("5000".to_string());
        assert_eq!(form.tokens(1_000).unwrap().2, 5_000);
    }

    mod forms {
        use axum::{
            Router,
            body::Body,
            http::{Request, StatusCode, header},
            routing::post,
        };
        use tower::ServiceExt;

        use super::super::{login, register};
        use crate::routes::test_support;

        async fn submit(path: &str, body: &'static str) -> (StatusCode, String) {
            let app = Router::new()
                .route("/login", post(login))
                .route("/register", post(register))
                .layer(test_support::anonymous())
                .with_state(test_support::state(&[(
                    "SUPABASE_URL",
                    test_support::UNREACHABLE_IDENTITY,
                )]));
            let response = app
                .oneshot(
                    Request::post(path)
                        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            let status = response.status();
            (status, test_support::body_text(response).await)
        }

        #[tokio::test]
        async fn test_login_rejects_malformed_email() {
            let (status, body) = submit("/login", "email=aina&password=longenough").await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("Enter a valid email address."));
        }

        #[tokio::test]
        async fn test_register_requires_email() {
            let (status, body) = submit(
                "/register",
                "full_name=Aina&email=+&password=longenough&password_confirm=longenough",
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("Email is required."));
        }

        #[tokio::test]
        async fn test_register_rejects_malformed_email() {
            let (status, body) = submit(
                "/register",
                "email=aina%40agency&password=longenough&password_confirm=longenough",
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("Enter a valid email address."));
        }
    }
}
