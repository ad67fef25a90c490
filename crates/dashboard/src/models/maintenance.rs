//! Maintenance requests raised against assets.

use chrono::{DateTime, Utc};

use ict_assets_core::{AssetId, MaintenanceId, MaintenanceStatus, UserId};

/// Insert payload for a maintenance request.
#[derive(Debug, Clone)]
pub struct NewMaintenanceRequest {
    pub title: String,
    pub asset_id: Option<AssetId>,
    pub description: Option<String>,
    pub requested_by: UserId,
}

/// A maintenance request joined with requester and asset names.
#[derive(Debug, Clone)]
pub struct MaintenanceRequest {
    pub id: MaintenanceId,
    pub title: String,
    pub asset_id: Option<AssetId>,
    pub asset_label: Option<String>,
    pub description: Option<String>,
    pub requested_by: Option<UserId>,
    pub requester_name: Option<String>,
    /// `None` when the stored value is not a recognised status.
    pub status: Option<MaintenanceStatus>,
    /// Stored status text, kept for display of unrecognised values.
    pub status_raw: String,
    pub created_at: DateTime<Utc>,
}

impl MaintenanceRequest {
    /// Status label for display.
    #[must_use]
    pub fn status_label(&self) -> &str {
        match self.status {
            Some(status) => status.as_str(),
            None => &self.status_raw,
        }
    }

    /// Badge class; unknown statuses get the pending style.
    #[must_use]
    pub fn status_class(&self) -> &'static str {
        self.status.unwrap_or_default().css_class()
    }

    /// Requester shown in lists.
    #[must_use]
    pub fn requester_label(&self) -> &str {
        self.requester_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Unknown")
    }

    /// Case-insensitive substring match over title, description and requester.
    #[must_use]
    pub fn matches(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty()
            || [
                Some(self.title.as_str()),
                self.description.as_deref(),
                self.requester_name.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle_lower))
    }
}

/// Title used for a staff request: `Maintenance request for <asset>`.
#[must_use]
pub fn request_title(asset_label: Option<&str>) -> String {
    match asset_label.map(str::trim).filter(|s| !s.is_empty()) {
        Some(label) => format!("Maintenance request for {label}"),
        None => "Maintenance request".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(status_raw: &str) -> MaintenanceRequest {
        MaintenanceRequest {
            id: MaintenanceId::random(),
            title: "Laptop fan noise".to_string(),
            asset_id: None,
            asset_label: None,
            description: Some("Loud when charging".to_string()),
            requested_by: None,
            requester_name: Some("Hafiz".to_string()),
            status: MaintenanceStatus::from_stored(status_raw),
            status_raw: status_raw.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_request_title() {
        assert_eq!(
            request_title(Some("ThinkPad T14")),
            "Maintenance request for ThinkPad T14"
        );
        assert_eq!(request_title(Some("  ")), "Maintenance request");
        assert_eq!(request_title(None), "Maintenance request");
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let r = request("Pending");
        assert!(r.matches("fan"));
        assert!(r.matches("charging"));
        assert!(r.matches("hafiz"));
        assert!(r.matches(""));
        assert!(!r.matches("printer"));
    }

    #[test]
    fn test_unknown_status_label() {
        let r = request("archived");
        assert_eq!(r.status, None);
        assert_eq!(r.status_label(), "archived");
        assert_eq!(r.status_class(), "status-pending");

        let legacy = request("completed");
        assert_eq!(legacy.status_label(), "Resolved");
    }
}
