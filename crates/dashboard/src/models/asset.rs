//! ICT assets and their categories.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use ict_assets_core::{AssetId, CategoryId};

/// An `asset_categories` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Editable asset fields, already sanitized (trimmed, blanks as `None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetInput {
    pub asset_no: String,
    pub asset_name: String,
    pub category_id: Option<CategoryId>,
    pub asset_type: Option<String>,
    pub qr_code: Option<String>,
    pub year: Option<i32>,
    pub department: Option<String>,
    pub unit: Option<String>,
    pub user_name: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub price: Option<Decimal>,
    pub supplier: Option<String>,
    pub source: Option<String>,
    pub model: Option<String>,
    pub serial_no: Option<String>,
    pub processor: Option<String>,
    pub ram_capacity: Option<String>,
    pub hdd_capacity: Option<String>,
    pub monitor_model: Option<String>,
    pub monitor_serial_no: Option<String>,
    pub monitor_asset_no: Option<String>,
    pub keyboard_model: Option<String>,
    pub keyboard_serial_no: Option<String>,
    pub keyboard_asset_no: Option<String>,
    pub mouse_model: Option<String>,
    pub mouse_serial_no: Option<String>,
    pub mouse_asset_no: Option<String>,
    pub accessories: Option<String>,
}

/// A stored asset with its category name.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: AssetId,
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub fields: AssetInput,
}

impl std::ops::Deref for Asset {
    type Target = AssetInput;

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl Asset {
    /// Assigned to someone.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.fields
            .user_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty())
    }

    /// Name for pickers and titles: asset name, else asset number.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.fields.asset_name.trim().is_empty() {
            &self.fields.asset_no
        } else {
            &self.fields.asset_name
        }
    }

    /// Encoded value for the QR image: stored code, else asset number, else id.
    #[must_use]
    pub fn qr_payload(&self) -> String {
        [self.fields.qr_code.as_deref(), Some(self.fields.asset_no.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map_or_else(|| self.id.to_string(), String::from)
    }

    /// Whether `owner` is the assigned user.
    #[must_use]
    pub fn is_assigned_to(&self, owner: &str) -> bool {
        self.fields.user_name.as_deref().map(str::trim) == Some(owner.trim())
    }

    /// Labelled detail rows for the detail view; empty values show `-`.
    #[must_use]
    pub fn detail_rows(&self) -> Vec<(&'static str, String)> {
        let f = &self.fields;
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        vec![
            ("Asset No", f.asset_no.clone()),
            ("Asset Name", f.asset_name.clone()),
            (
                "Category",
                self.category_name.clone().unwrap_or_else(|| "-".to_string()),
            ),
            ("Type", text(&f.asset_type)),
            ("QR Code", text(&f.qr_code)),
            (
                "Year",
                f.year.map_or_else(|| "-".to_string(), |y| y.to_string()),
            ),
            ("Department", text(&f.department)),
            ("Unit", text(&f.unit)),
            ("User", text(&f.user_name)),
            (
                "Purchase Date",
                f.purchase_date
                    .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string()),
            ),
            (
                "Price",
                f.price
                    .map_or_else(|| "-".to_string(), |p| format!("RM {p:.2}")),
            ),
            ("Supplier", text(&f.supplier)),
            ("Source", text(&f.source)),
            ("Model", text(&f.model)),
            ("Serial No", text(&f.serial_no)),
            ("Processor", text(&f.processor)),
            ("RAM", text(&f.ram_capacity)),
            ("HDD", text(&f.hdd_capacity)),
            ("Monitor Model", text(&f.monitor_model)),
            ("Monitor Serial No", text(&f.monitor_serial_no)),
            ("Monitor Asset No", text(&f.monitor_asset_no)),
            ("Keyboard Model", text(&f.keyboard_model)),
            ("Keyboard Serial No", text(&f.keyboard_serial_no)),
            ("Keyboard Asset No", text(&f.keyboard_asset_no)),
            ("Mouse Model", text(&f.mouse_model)),
            ("Mouse Serial No", text(&f.mouse_serial_no)),
            ("Mouse Asset No", text(&f.mouse_asset_no)),
            ("Accessories", text(&f.accessories)),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn asset(asset_no: &str, qr_code: Option<&str>, user_name: Option<&str>) -> Asset {
        Asset {
            id: AssetId::new(uuid::Uuid::nil()),
            category_name: None,
            created_at: Utc::now(),
            fields: AssetInput {
                asset_no: asset_no.to_string(),
                asset_name: "Dell OptiPlex".to_string(),
                qr_code: qr_code.map(String::from),
                user_name: user_name.map(String::from),
                ..AssetInput::default()
            },
        }
    }

    #[test]
    fn test_qr_payload_prefers_stored_code() {
        assert_eq!(asset("PC-01", Some("QR-9"), None).qr_payload(), "QR-9");
        assert_eq!(asset("PC-01", Some("  "), None).qr_payload(), "PC-01");
        assert_eq!(
            asset(" ", None, None).qr_payload(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_active_means_assigned() {
        assert!(asset("PC-01", None, Some("Aina")).is_active());
        assert!(!asset("PC-01", None, Some(" ")).is_active());
        assert!(!asset("PC-01", None, None).is_active());
    }

    #[test]
    fn test_assignment_match_ignores_padding() {
        let a = asset("PC-01", None, Some("Aina Rahman "));
        assert!(a.is_assigned_to("Aina Rahman"));
        assert!(!a.is_assigned_to("aina rahman"));
    }

    #[test]
    fn test_detail_rows_cover_every_field() {
        let rows = asset("PC-01", None, None).detail_rows();
        assert_eq!(rows.len(), 28);
        assert_eq!(rows[0], ("Asset No", "PC-01".to_string()));
        assert_eq!(rows[3], ("Type", "-".to_string()));
    }
}
