//! Session-related types for dashboard authentication.

use serde::{Deserialize, Serialize};

use ict_assets_core::{Role, UserId};

/// Seconds before expiry at which an access token is refreshed.
const REFRESH_LEEWAY_SECONDS: i64 = 60;

/// Session-stored identity.
///
/// Holds the identity provider's tokens so the server can act on behalf of
/// the user and refresh the access token when it lapses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    /// Identity provider user id (also the profile id).
    pub id: UserId,
    /// Email on the identity record, if any.
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which `access_token` expires.
    pub expires_at: i64,
}

impl CurrentUser {
    /// Whether the access token is expired or about to expire at `now`.
    #[must_use]
    pub const fn needs_refresh(&self, now: i64) -> bool {
        now >= self.expires_at - REFRESH_LEEWAY_SECONDS
    }
}

/// The resolved caller of a guarded request.
///
/// Inserted into request extensions by the route guard.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user: CurrentUser,
    pub role: Role,
    pub full_name: Option<String>,
}

impl Viewer {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.user.id
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref().filter(|e| !e.trim().is_empty())
    }

    /// Full name, then email, then `Someone`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or_else(|| self.email())
            .unwrap_or("Someone")
            .to_string()
    }

    /// Value matched against `assets.user_name` for ownership checks.
    ///
    /// Full name when set, else email. `None` means the viewer owns nothing.
    #[must_use]
    pub fn owner_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or_else(|| self.email())
    }

    #[must_use]
    pub const fn base_path(&self) -> &'static str {
        self.role.base_path()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(email: Option<&str>) -> CurrentUser {
        CurrentUser {
            id: UserId::new(uuid::Uuid::nil()),
            email: email.map(String::from),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: 10_000,
        }
    }

    #[test]
    fn test_needs_refresh_with_leeway() {
        let current = user(None);
        assert!(!current.needs_refresh(9_000));
        assert!(current.needs_refresh(9_950));
        assert!(current.needs_refresh(10_001));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let named = Viewer {
            user: user(Some("aina@agency.gov.my")),
            role: Role::Staff,
            full_name: Some("Aina Rahman".to_string()),
        };
        assert_eq!(named.display_name(), "Aina Rahman");

        let email_only = Viewer {
            full_name: Some("  ".to_string()),
            ..named.clone()
        };
        assert_eq!(email_only.display_name(), "aina@agency.gov.my");
        assert_eq!(email_only.owner_name(), Some("aina@agency.gov.my"));

        let anonymous = Viewer {
            user: user(None),
            role: Role::Staff,
            full_name: None,
        };
        assert_eq!(anonymous.display_name(), "Someone");
        assert_eq!(anonymous.owner_name(), None);
    }
}
