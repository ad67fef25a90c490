//! Identity provider (GoTrue) wire types.

use serde::{Deserialize, Serialize};

use ict_assets_core::{Role, UserId};

use crate::models::CurrentUser;

/// Free-form metadata attached to an identity.
///
/// Invites store the intended `role`; self sign-up stores `full_name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A user record as returned by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
}

impl IdentityUser {
    /// Name from metadata: `full_name`, then `name`.
    #[must_use]
    pub fn metadata_name(&self) -> Option<&str> {
        [
            self.user_metadata.full_name.as_deref(),
            self.user_metadata.name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
    }

    /// Login identifier: metadata `username`, else the email's local part.
    #[must_use]
    pub fn login_id(&self) -> String {
        if let Some(username) = self
            .user_metadata
            .username
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return username.to_string();
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .unwrap_or_default()
            .to_string()
    }

    /// Role recorded at invite time, normalized.
    #[must_use]
    pub fn invited_role(&self) -> Role {
        Role::normalize(self.user_metadata.role.as_deref())
    }
}

/// Tokens issued by a password, refresh, or sign-up grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Absolute expiry (unix seconds); older servers omit it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: IdentityUser,
}

impl AuthSession {
    /// Convert into the session-stored identity.
    #[must_use]
    pub fn into_current_user(self, now: i64) -> CurrentUser {
        CurrentUser {
            id: self.user.id,
            email: self.user.email,
            expires_at: self.expires_at.unwrap_or(now + self.expires_in),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
        }
    }
}

/// Result of a sign-up: a live session when auto-confirm is on, otherwise
/// just the pending user (email confirmation required).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    Session(Box<AuthSession>),
    Pending(IdentityUser),
}

/// One page of the admin user listing.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<IdentityUser>,
    /// Total users across all pages (from the `x-total-count` header).
    #[serde(skip)]
    pub total: Option<u64>,
}

/// Error payload shapes used by the identity provider.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ErrorBody {
    pub msg: Option<String>,
    pub message: Option<String>,
    pub error_description: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub(super) fn into_message(self) -> Option<String> {
        [self.msg, self.message, self.error_description, self.error]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}
