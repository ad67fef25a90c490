//! Role model and role-based routing table.
//!
//! Every signed-in identity has exactly one [`Role`]. The role decides which
//! protected prefix (`/admin`, `/assistant`, `/staff`) the identity may
//! browse. Profiles store the role as free text that may be missing or
//! stale, so reads always go through [`Role::normalize`], which cannot fail.

use serde::{Deserialize, Serialize};

/// Error returned by the strict [`FromStr`](std::str::FromStr) parser.
///
/// Form input and database values should use [`Role::normalize`] instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0}")]
pub struct ParseRoleError(pub String);

/// Access role for a dashboard user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including user management and feedback review.
    Admin,
    /// Manages assets, QR codes, and maintenance; no user management.
    AdminAssistant,
    /// Views assigned assets, files maintenance requests and feedback.
    #[default]
    Staff,
}

impl Role {
    /// All roles, in privilege order.
    pub const ALL: [Self; 3] = [Self::Admin, Self::AdminAssistant, Self::Staff];

    /// Map raw profile text to a role.
    ///
    /// Only the exact literals `admin` and `admin_assistant` select the
    /// elevated roles. Anything else, including `None`, blank, unknown, or
    /// differently-cased text, becomes [`Role::Staff`].
    #[must_use]
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw {
            Some("admin") => Self::Admin,
            Some("admin_assistant") => Self::AdminAssistant,
            _ => Self::Staff,
        }
    }

    /// Storage literal for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::AdminAssistant => "admin_assistant",
            Self::Staff => "staff",
        }
    }

    /// Human-readable label for badges and selects.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::AdminAssistant => "Admin Assistant",
            Self::Staff => "Staff",
        }
    }

    /// The protected route prefix owned by this role.
    #[must_use]
    pub const fn base_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::AdminAssistant => "/assistant",
            Self::Staff => "/staff",
        }
    }

    /// Admins and admin assistants manage assets and maintenance.
    #[must_use]
    pub const fn is_manager(self) -> bool {
        matches!(self, Self::Admin | Self::AdminAssistant)
    }

    /// Which role's prefix a request path falls under, if any.
    ///
    /// Matching is per path segment: `/admin` and `/admin/assets` belong to
    /// [`Role::Admin`], `/administrator` does not.
    #[must_use]
    pub fn from_path_prefix(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| {
            path.strip_prefix(role.base_path())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

/// Compose [`Role::normalize`] with the routing table.
///
/// ```
/// use ict_assets_core::role_to_path;
///
/// assert_eq!(role_to_path(Some("admin_assistant")), "/assistant");
/// assert_eq!(role_to_path(Some("superuser")), "/staff");
/// assert_eq!(role_to_path(None), "/staff");
/// ```
#[must_use]
pub fn role_to_path(raw: Option<&str>) -> &'static str {
    Role::normalize(raw).base_path()
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "admin_assistant" => Ok(Self::AdminAssistant),
            "staff" => Ok(Self::Staff),
            _ => Err(ParseRoleError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLES: &[Option<&str>] = &[
        None,
        Some(""),
        Some(" "),
        Some("admin"),
        Some("admin_assistant"),
        Some("staff"),
        Some("Admin"),
        Some("ADMIN_ASSISTANT"),
        Some(" admin"),
        Some("assistant"),
        Some("superuser"),
        Some("null"),
    ];

    #[test]
    fn test_normalize_known_literals() {
        assert_eq!(Role::normalize(Some("admin")), Role::Admin);
        assert_eq!(
            Role::normalize(Some("admin_assistant")),
            Role::AdminAssistant
        );
        assert_eq!(Role::normalize(Some("staff")), Role::Staff);
    }

    #[test]
    fn test_normalize_unknown_defaults_to_staff() {
        assert_eq!(Role::normalize(None), Role::Staff);
        assert_eq!(Role::normalize(Some("")), Role::Staff);
        assert_eq!(Role::normalize(Some("Admin")), Role::Staff);
        assert_eq!(Role::normalize(Some("assistant")), Role::Staff);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in SAMPLES {
            let once = Role::normalize(*raw);
            let twice = Role::normalize(Some(once.as_str()));
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_normalize_output_is_always_valid() {
        for raw in SAMPLES {
            let role = Role::normalize(*raw);
            assert!(Role::ALL.contains(&role));
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_each_role_maps_to_exactly_one_prefix() {
        for role in Role::ALL {
            let matching: Vec<Role> = Role::ALL
                .into_iter()
                .filter(|other| other.base_path() == role.base_path())
                .collect();
            assert_eq!(matching, vec![role]);
            assert_eq!(role_to_path(Some(role.as_str())), role.base_path());
        }
    }

    #[test]
    fn test_from_path_prefix_is_segment_aware() {
        assert_eq!(Role::from_path_prefix("/admin"), Some(Role::Admin));
        assert_eq!(Role::from_path_prefix("/admin/assets"), Some(Role::Admin));
        assert_eq!(
            Role::from_path_prefix("/assistant/qr"),
            Some(Role::AdminAssistant)
        );
        assert_eq!(Role::from_path_prefix("/staff/"), Some(Role::Staff));
        assert_eq!(Role::from_path_prefix("/administrator"), None);
        assert_eq!(Role::from_path_prefix("/login"), None);
        assert_eq!(Role::from_path_prefix("/"), None);
    }

    #[test]
    fn test_from_str_is_strict() {
        assert!("Admin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_uses_storage_literals() {
        let json = serde_json::to_string(&Role::AdminAssistant).unwrap();
        assert_eq!(json, "\"admin_assistant\"");
    }

    #[test]
    fn test_is_manager() {
        assert!(Role::Admin.is_manager());
        assert!(Role::AdminAssistant.is_manager());
        assert!(!Role::Staff.is_manager());
    }
}
