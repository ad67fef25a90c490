//! Privileged identity operations (service role key).

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;

use ict_assets_core::{Role, UserId};

use super::{IdentityError, IdentityUser, UserMetadata, UserPage, handle_empty, handle_response};
use crate::config::IdentityConfig;

/// Admin identity client.
///
/// Constructed only when `SUPABASE_SERVICE_ROLE_KEY` is set; holders of an
/// `Option<IdentityAdminClient>` treat `None` as "privileged features off".
#[derive(Clone)]
pub struct IdentityAdminClient {
    inner: Arc<IdentityAdminInner>,
}

struct IdentityAdminInner {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct InviteRequest<'a> {
    email: &'a str,
    data: UserMetadata,
}

impl IdentityAdminClient {
    /// Create the admin client, or `Ok(None)` when no service key is set.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn from_config(config: &IdentityConfig) -> Result<Option<Self>, IdentityError> {
        let Some(key) = config.service_role_key.as_ref() else {
            return Ok(None);
        };
        let key = key.expose_secret();

        let mut headers = HeaderMap::new();
        let mut apikey = HeaderValue::from_str(key)
            .map_err(|e| IdentityError::Parse(format!("Invalid service key format: {e}")))?;
        apikey.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| IdentityError::Parse(format!("Invalid service key format: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Some(Self {
            inner: Arc::new(IdentityAdminInner {
                client,
                base_url: format!("{}/auth/v1", config.url),
            }),
        }))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Email an invite; the intended role travels in user metadata.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` with the provider message on failure.
    pub async fn invite(
        &self,
        email: &str,
        role: Role,
        redirect_to: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let data = UserMetadata {
            role: Some(role.as_str().to_string()),
            ..UserMetadata::default()
        };
        let response = self
            .inner
            .client
            .post(self.url("/invite"))
            .query(&[("redirect_to", redirect_to)])
            .json(&InviteRequest { email, data })
            .send()
            .await?;
        handle_response(response).await
    }

    /// Delete an identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` if the user does not exist or deletion fails.
    pub async fn delete_user(&self, id: UserId) -> Result<(), IdentityError> {
        let response = self
            .inner
            .client
            .delete(self.url(&format!("/admin/users/{id}")))
            .send()
            .await?;
        handle_empty(response).await
    }

    /// One page of users (1-based `page`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_users(&self, page: u32, per_page: u32) -> Result<UserPage, IdentityError> {
        let response = self
            .inner
            .client
            .get(self.url("/admin/users"))
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;
        let total = response
            .headers()
            .get("x-total-count")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        let mut users: UserPage = handle_response(response).await?;
        users.total = total;
        Ok(users)
    }

    /// Look up one user by id.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` if the user does not exist.
    pub async fn get_user(&self, id: UserId) -> Result<IdentityUser, IdentityError> {
        let response = self
            .inner
            .client
            .get(self.url(&format!("/admin/users/{id}")))
            .send()
            .await?;
        handle_response(response).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config(key: Option<&str>) -> IdentityConfig {
        IdentityConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: key.map(SecretString::from),
        }
    }

    #[test]
    fn test_absent_without_service_key() {
        assert!(IdentityAdminClient::from_config(&config(None)).unwrap().is_none());
    }

    #[test]
    fn test_built_with_service_key() {
        let client = IdentityAdminClient::from_config(&config(Some("service-key")))
            .unwrap()
            .unwrap();
        assert_eq!(
            client.url("/admin/users"),
            "https://project.supabase.co/auth/v1/admin/users"
        );
    }

    #[test]
    fn test_invalid_header_value_rejected() {
        let result = IdentityAdminClient::from_config(&config(Some("bad\nkey")));
        assert!(matches!(result, Err(IdentityError::Parse(_))));
    }
}
