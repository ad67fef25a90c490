//! Per-identity profile metadata.

use chrono::{DateTime, Utc};

use ict_assets_core::{Role, UserId};

/// A `profiles` row with its role already normalized.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: UserId,
    pub role: Role,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Trimmed, non-blank full name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}
