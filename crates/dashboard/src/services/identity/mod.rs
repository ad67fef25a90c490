//! Identity provider client (GoTrue-compatible REST API).
//!
//! Two clients share one error type:
//!
//! - [`IdentityClient`] uses the public anon key and acts for a signed-in
//!   user (password sign-in, refresh, sign-up, profile updates, sign-out).
//! - [`IdentityAdminClient`] uses the privileged service role key (invite,
//!   delete, list, lookup). It only exists when that key is configured.
//!
//! # API Reference
//!
//! - Base URL: `{SUPABASE_URL}/auth/v1`
//! - Authentication: `apikey` header plus `Authorization: Bearer <token>`

mod admin;
mod types;

pub use admin::IdentityAdminClient;
pub use types::*;

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use thiserror::Error;

use crate::config::IdentityConfig;

/// Errors that can occur when calling the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Token rejected or expired.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Privileged operation requested without a service role key.
    #[error("Service role key missing")]
    MissingServiceKey,
}

impl IdentityError {
    /// Provider message suitable for an `error=` redirect or form error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Unauthorized(message) => message.clone(),
            Self::Http(_) => "Identity service unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

/// Public identity client (anon key).
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: UserMetadata,
}

/// Fields accepted by [`IdentityClient::update_user`].
#[derive(Debug, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UserMetadata>,
}

impl IdentityClient {
    /// Create a new public identity client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.anon_key)
                .map_err(|e| IdentityError::Parse(format!("Invalid anon key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                base_url: format!("{}/auth/v1", config.url),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` with the provider message on bad credentials.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, IdentityError> {
        let response = self
            .inner
            .client
            .post(self.url("/token?grant_type=password"))
            .json(&PasswordGrant { email, password })
            .send()
            .await?;
        handle_response(response).await
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is revoked or expired.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, IdentityError> {
        let response = self
            .inner
            .client
            .post(self.url("/token?grant_type=refresh_token"))
            .json(&RefreshGrant { refresh_token })
            .send()
            .await?;
        handle_response(response).await
    }

    /// Register a new account with a full name in metadata.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` if the email is taken or the password rejected.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, IdentityError> {
        let data = UserMetadata {
            full_name: full_name.map(String::from),
            ..UserMetadata::default()
        };
        let response = self
            .inner
            .client
            .post(self.url("/signup"))
            .json(&SignUpRequest {
                email,
                password,
                data,
            })
            .send()
            .await?;
        handle_response(response).await
    }

    /// Fetch the user an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` if the token is invalid.
    pub async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let response = self
            .inner
            .client
            .get(self.url("/user"))
            .bearer_auth(access_token)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Update the signed-in user's password and/or metadata.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` if the update is rejected.
    pub async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<IdentityUser, IdentityError> {
        let response = self
            .inner
            .client
            .put(self.url("/user"))
            .bearer_auth(access_token)
            .json(update)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Revoke the session's refresh tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .inner
            .client
            .post(self.url("/logout"))
            .bearer_auth(access_token)
            .send()
            .await?;
        handle_empty(response).await
    }
}

/// Handle API response and parse JSON.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, IdentityError> {
    if response.status().is_success() {
        return response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(format!("Failed to parse response: {e}")));
    }

    Err(parse_error(response).await)
}

/// Handle a response whose body is ignored.
async fn handle_empty(response: reqwest::Response) -> Result<(), IdentityError> {
    if response.status().is_success() {
        return Ok(());
    }

    Err(parse_error(response).await)
}

/// Parse an error response from the identity provider.
async fn parse_error(response: reqwest::Response) -> IdentityError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = error_message(status, &text);

    if status == 401 || status == 403 {
        IdentityError::Unauthorized(message)
    } else {
        IdentityError::Api { status, message }
    }
}

/// Extract the human-readable message from an error body.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("Identity provider returned {status}")
            } else {
                trimmed.to_string()
            }
        })
}
