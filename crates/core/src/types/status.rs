//! Status enums for maintenance requests and notifications.

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not one of the accepted values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: {0}")]
pub struct ParseStatusError(pub String);

/// Lifecycle of a maintenance request.
///
/// Stored as `Pending`, `In Progress`, or `Resolved`. Rows written by older
/// clients used `pending`, `in_progress`, and `completed`; those are read as
/// the matching variant by [`MaintenanceStatus::from_stored`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MaintenanceStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl MaintenanceStatus {
    /// All statuses in workflow order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Resolved];

    /// Canonical storage and display form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }

    /// CSS modifier used by the status badge.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Pending => "status-pending",
            Self::InProgress => "status-progress",
            Self::Resolved => "status-resolved",
        }
    }

    /// Whether moving to this status closes out the request's notifications.
    #[must_use]
    pub const fn clears_notifications(self) -> bool {
        matches!(self, Self::InProgress | Self::Resolved)
    }

    /// Whether the request still needs attention.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Lenient parse for values read back from the database.
    #[must_use]
    pub fn from_stored(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Pending" | "pending" => Some(Self::Pending),
            "In Progress" | "in_progress" => Some(Self::InProgress),
            "Resolved" | "resolved" | "completed" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse used for form submissions: only the canonical spellings.
impl std::str::FromStr for MaintenanceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_owned()))
    }
}

/// Notification category.
///
/// Maintenance notifications feed the bell; general ones (feedback) also
/// feed the feedback counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    General,
    Maintenance,
}

impl NotificationType {
    /// Storage literal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "maintenance" => Ok(Self::Maintenance),
            _ => Err(ParseStatusError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_form_parse_accepts_only_canonical() {
        assert_eq!(
            "In Progress".parse::<MaintenanceStatus>().unwrap(),
            MaintenanceStatus::InProgress
        );
        assert!("in_progress".parse::<MaintenanceStatus>().is_err());
        assert!("Done".parse::<MaintenanceStatus>().is_err());
        assert!("".parse::<MaintenanceStatus>().is_err());
    }

    #[test]
    fn test_from_stored_reads_legacy_values() {
        assert_eq!(
            MaintenanceStatus::from_stored("pending"),
            Some(MaintenanceStatus::Pending)
        );
        assert_eq!(
            MaintenanceStatus::from_stored("in_progress"),
            Some(MaintenanceStatus::InProgress)
        );
        assert_eq!(
            MaintenanceStatus::from_stored("completed"),
            Some(MaintenanceStatus::Resolved)
        );
        assert_eq!(MaintenanceStatus::from_stored("archived"), None);
    }

    #[test]
    fn test_clears_notifications() {
        assert!(!MaintenanceStatus::Pending.clears_notifications());
        assert!(MaintenanceStatus::InProgress.clears_notifications());
        assert!(MaintenanceStatus::Resolved.clears_notifications());
    }

    #[test]
    fn test_serde_matches_storage() {
        let json = serde_json::to_string(&MaintenanceStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let kind: NotificationType = serde_json::from_str("\"maintenance\"").unwrap();
        assert_eq!(kind, NotificationType::Maintenance);
    }
}
