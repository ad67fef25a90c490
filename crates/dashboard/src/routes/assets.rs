//! Asset register route handlers.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use ict_assets_core::{ActionOutcome, AssetId, CategoryId, Toast, ToastScope};

use crate::{
    db::{AssetRepository, AssetSearch, CategoryRepository, MaintenanceRepository},
    error::AppError,
    filters,
    middleware::{RequireManager, RequireViewer},
    models::{Asset, AssetInput, Category, Viewer},
    state::AppState,
};

use super::{PageContext, clean, redirect_base};

// =============================================================================
// Form Types
// =============================================================================

/// Create/update/delete form. Every field arrives as raw text.
#[derive(Debug, Default, Deserialize)]
pub struct AssetForm {
    pub id: Option<String>,
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
    pub asset_no: Option<String>,
    pub asset_name: Option<String>,
    pub category_id: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    pub qr_code: Option<String>,
    pub year: Option<String>,
    pub department: Option<String>,
    pub unit: Option<String>,
    pub user_name: Option<String>,
    pub purchase_date: Option<String>,
    pub price: Option<String>,
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

fn parse_field<T: std::str::FromStr>(value: Option<&str>) -> Result<Option<T>, &'static str> {
    clean(value)
        .map(|v| v.parse::<T>())
        .transpose()
        .map_err(|_| "invalid_field")
}

impl AssetForm {
    /// Validate into sanitized input, or the error code to redirect with.
    ///
    /// # Errors
    ///
    /// `missing_required_fields` without asset number and name,
    /// `invalid_field` when year, date, price or category do not parse.
    pub fn to_input(&self) -> Result<AssetInput, &'static str> {
        let (Some(asset_no), Some(asset_name)) = (
            clean(self.asset_no.as_deref()),
            clean(self.asset_name.as_deref()),
        ) else {
            return Err("missing_required_fields");
        };
        let text = |v: &Option<String>| clean(v.as_deref());

        let purchase_date = text(&self.purchase_date)
            .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
            .transpose()
            .map_err(|_| "invalid_field")?;
        let category_id = text(&self.category_id)
            .map(|c| CategoryId::parse(&c).ok_or("invalid_field"))
            .transpose()?;

        Ok(AssetInput {
            asset_no,
            asset_name,
            category_id,
            asset_type: text(&self.asset_type),
            qr_code: text(&self.qr_code),
            year: parse_field::<i32>(self.year.as_deref())?,
            department: text(&self.department),
            unit: text(&self.unit),
            user_name: text(&self.user_name),
            purchase_date,
            price: parse_field::<Decimal>(self.price.as_deref())?,
            supplier: text(&self.supplier),
            source: text(&self.source),
            model: text(&self.model),
            serial_no: text(&self.serial_no),
            processor: text(&self.processor),
            ram_capacity: text(&self.ram_capacity),
            hdd_capacity: text(&self.hdd_capacity),
            monitor_model: text(&self.monitor_model),
            monitor_serial_no: text(&self.monitor_serial_no),
            monitor_asset_no: text(&self.monitor_asset_no),
            keyboard_model: text(&self.keyboard_model),
            keyboard_serial_no: text(&self.keyboard_serial_no),
            keyboard_asset_no: text(&self.keyboard_asset_no),
            mouse_model: text(&self.mouse_model),
            mouse_serial_no: text(&self.mouse_serial_no),
            mouse_asset_no: text(&self.mouse_asset_no),
            accessories: text(&self.accessories),
        })
    }

    fn asset_id(&self) -> Option<AssetId> {
        self.id.as_deref().and_then(AssetId::parse)
    }

    fn redirect(&self, viewer: &Viewer, outcome: &ActionOutcome) -> Redirect {
        let fallback = format!("{}/assets", viewer.base_path());
        let base = redirect_base(self.redirect_to.as_deref(), &fallback);
        Redirect::to(&outcome.redirect_to(&base))
    }
}

// =============================================================================
// View Types
// =============================================================================

/// Text inputs of the asset form, in display order: `(name, label, input type)`.
const FORM_FIELDS: &[(&str, &str, &str)] = &[
    ("asset_no", "Asset No", "text"),
    ("asset_name", "Asset Name", "text"),
    ("type", "Type", "text"),
    ("qr_code", "QR Code", "text"),
    ("year", "Year", "number"),
    ("department", "Department", "text"),
    ("unit", "Unit", "text"),
    ("user_name", "User", "text"),
    ("purchase_date", "Purchase Date", "date"),
    ("price", "Price (RM)", "number"),
    ("supplier", "Supplier", "text"),
    ("source", "Source", "text"),
    ("model", "Model", "text"),
    ("serial_no", "Serial No", "text"),
    ("processor", "Processor", "text"),
    ("ram_capacity", "RAM", "text"),
    ("hdd_capacity", "HDD", "text"),
    ("monitor_model", "Monitor Model", "text"),
    ("monitor_serial_no", "Monitor Serial No", "text"),
    ("monitor_asset_no", "Monitor Asset No", "text"),
    ("keyboard_model", "Keyboard Model", "text"),
    ("keyboard_serial_no", "Keyboard Serial No", "text"),
    ("keyboard_asset_no", "Keyboard Asset No", "text"),
    ("mouse_model", "Mouse Model", "text"),
    ("mouse_serial_no", "Mouse Serial No", "text"),
    ("mouse_asset_no", "Mouse Asset No", "text"),
    ("accessories", "Accessories", "text"),
];

/// One input of the asset form with its current value.
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: &'static str,
    pub value: String,
    pub required: bool,
}

fn field_value(input: &AssetInput, name: &str) -> String {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    match name {
        "asset_no" => input.asset_no.clone(),
        "asset_name" => input.asset_name.clone(),
        "type" => text(&input.asset_type),
        "qr_code" => text(&input.qr_code),
        "year" => input.year.map(|y| y.to_string()).unwrap_or_default(),
        "department" => text(&input.department),
        "unit" => text(&input.unit),
        "user_name" => text(&input.user_name),
        "purchase_date" => input
            .purchase_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        "price" => input.price.map(|p| p.to_string()).unwrap_or_default(),
        "supplier" => text(&input.supplier),
        "source" => text(&input.source),
        "model" => text(&input.model),
        "serial_no" => text(&input.serial_no),
        "processor" => text(&input.processor),
        "ram_capacity" => text(&input.ram_capacity),
        "hdd_capacity" => text(&input.hdd_capacity),
        "monitor_model" => text(&input.monitor_model),
        "monitor_serial_no" => text(&input.monitor_serial_no),
        "monitor_asset_no" => text(&input.monitor_asset_no),
        "keyboard_model" => text(&input.keyboard_model),
        "keyboard_serial_no" => text(&input.keyboard_serial_no),
        "keyboard_asset_no" => text(&input.keyboard_asset_no),
        "mouse_model" => text(&input.mouse_model),
        "mouse_serial_no" => text(&input.mouse_serial_no),
        "mouse_asset_no" => text(&input.mouse_asset_no),
        "accessories" => text(&input.accessories),
        _ => String::new(),
    }
}

/// Form inputs filled from `input`; empty for the create form.
#[must_use]
pub fn form_fields(input: &AssetInput) -> Vec<FormField> {
    FORM_FIELDS
        .iter()
        .map(|&(name, label, kind)| FormField {
            name,
            label,
            kind,
            value: field_value(input, name),
            required: matches!(name, "asset_no" | "asset_name"),
        })
        .collect()
}

/// Asset row for the list.
#[derive(Debug, Clone)]
pub struct AssetRow {
    pub id: String,
    pub asset_no: String,
    pub asset_name: String,
    pub category: String,
    pub category_id: String,
    pub asset_type: String,
    pub department: String,
    pub user_name: String,
    pub is_active: bool,
    pub qr_payload: String,
    pub form: Vec<FormField>,
}

impl From<&Asset> for AssetRow {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id.to_string(),
            asset_no: asset.asset_no.clone(),
            asset_name: asset.asset_name.clone(),
            category: asset.category_name.clone().unwrap_or_default(),
            category_id: asset
                .category_id
                .map(|c| c.to_string())
                .unwrap_or_default(),
            asset_type: asset.asset_type.clone().unwrap_or_default(),
            department: asset.department.clone().unwrap_or_default(),
            user_name: asset.user_name.clone().unwrap_or_default(),
            is_active: asset.is_active(),
            qr_payload: asset.qr_payload(),
            form: form_fields(&asset.fields),
        }
    }
}

/// Header numbers on the asset page.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetStats {
    pub total: i64,
    pub active: i64,
    pub open_maintenance: i64,
}

/// Asset list page template.
#[derive(Template, WebTemplate)]
#[template(path = "assets/index.html")]
pub struct AssetsIndexTemplate {
    pub page: PageContext,
    pub assets: Vec<AssetRow>,
    pub query: String,
    pub searched: bool,
    pub can_manage: bool,
    pub categories: Vec<Category>,
    pub blank_form: Vec<FormField>,
    pub stats: AssetStats,
    pub redirect_to: String,
}

/// Asset detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "assets/show.html")]
pub struct AssetShowTemplate {
    pub page: PageContext,
    pub asset_id: String,
    pub title: String,
    pub qr_payload: String,
    pub rows: Vec<(&'static str, String)>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn load_stats(state: &AppState, viewer: &Viewer) -> AssetStats {
    let assets = AssetRepository::new(state.pool());
    let maintenance = MaintenanceRepository::new(state.pool());

    let (counts, requests) = if viewer.role.is_manager() {
        (
            assets.counts(None).await,
            maintenance.counts(None).await,
        )
    } else if let Some(owner) = viewer.owner_name() {
        (
            assets.counts(Some(owner)).await,
            maintenance.counts(Some(viewer.id())).await,
        )
    } else {
        return AssetStats::default();
    };

    let (total, active) = counts.unwrap_or_else(|e| {
        tracing::error!("Failed to count assets: {e}");
        (0, 0)
    });
    let open_maintenance = requests.map(|c| c.open()).unwrap_or_else(|e| {
        tracing::error!("Failed to count maintenance requests: {e}");
        0
    });

    AssetStats {
        total,
        active,
        open_maintenance,
    }
}

/// Asset list. Staff see only their own assets; managers search first.
#[instrument(skip(viewer, state, params), fields(role = %viewer.role))]
pub async fn index(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let term = clean(params.get("q").map(String::as_str));
    let can_manage = viewer.role.is_manager();
    let repo = AssetRepository::new(state.pool());

    let filter = if can_manage {
        term.clone().map(|term| AssetSearch {
            term: Some(term),
            ..AssetSearch::default()
        })
    } else {
        viewer.owner_name().map(|owner| AssetSearch {
            term: term.clone(),
            owner: Some(owner.to_string()),
            limit: None,
        })
    };

    let assets = match filter {
        Some(filter) => match repo.search(&filter).await {
            Ok(assets) => assets.iter().map(AssetRow::from).collect(),
            Err(e) => {
                tracing::error!("Failed to search assets: {e}");
                vec![]
            }
        },
        None => vec![],
    };

    let categories = if can_manage {
        CategoryRepository::new(state.pool())
            .list()
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Failed to fetch categories: {e}");
                vec![]
            })
    } else {
        vec![]
    };

    let page = PageContext::new(&viewer, "Assets", "/assets")
        .with_toast(Toast::from_query(ToastScope::Asset, &params));
    let redirect_to = term.as_ref().map_or_else(
        || page.current_path.clone(),
        |q| format!("{}?q={}", page.current_path, urlencoding::encode(q)),
    );

    AssetsIndexTemplate {
        stats: load_stats(&state, &viewer).await,
        searched: !can_manage || term.is_some(),
        query: term.unwrap_or_default(),
        page,
        assets,
        can_manage,
        categories,
        blank_form: form_fields(&AssetInput::default()),
        redirect_to,
    }
}

/// Asset detail. Staff may only open assets assigned to them.
#[instrument(skip(viewer, state))]
pub async fn show(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("asset {id}"));
    let asset_id = AssetId::parse(&id).ok_or_else(not_found)?;
    let asset = AssetRepository::new(state.pool())
        .get(asset_id)
        .await?
        .ok_or_else(not_found)?;

    if !viewer.role.is_manager()
        && !viewer
            .owner_name()
            .is_some_and(|owner| asset.is_assigned_to(owner))
    {
        return Err(not_found());
    }

    Ok(AssetShowTemplate {
        page: PageContext::new(&viewer, "Asset details", "/assets"),
        asset_id: asset.id.to_string(),
        title: asset.label().to_string(),
        qr_payload: asset.qr_payload(),
        rows: asset.detail_rows(),
    }
    .into_response())
}

/// Create an asset.
#[instrument(skip(viewer, state, form))]
pub async fn create(
    RequireManager(viewer): RequireManager,
    State(state): State<AppState>,
    Form(form): Form<AssetForm>,
) -> Redirect {
    let input = match form.to_input() {
        Ok(input) => input,
        Err(code) => return form.redirect(&viewer, &ActionOutcome::error(code)),
    };

    let outcome = match AssetRepository::new(state.pool()).create(&input).await {
        Ok(id) => {
            tracing::info!(asset_id = %id, "Asset created");
            ActionOutcome::Saved
        }
        Err(e) => {
            tracing::warn!("Failed to create asset: {e}");
            ActionOutcome::error(e.user_message())
        }
    };
    form.redirect(&viewer, &outcome)
}

/// Update an asset.
#[instrument(skip(viewer, state, form))]
pub async fn update(
    RequireManager(viewer): RequireManager,
    State(state): State<AppState>,
    Form(form): Form<AssetForm>,
) -> Redirect {
    let Some(id) = form.asset_id() else {
        return form.redirect(&viewer, &ActionOutcome::error("missing_asset_id"));
    };
    let input = match form.to_input() {
        Ok(input) => input,
        Err(code) => return form.redirect(&viewer, &ActionOutcome::error(code)),
    };

    let outcome = match AssetRepository::new(state.pool()).update(id, &input).await {
        Ok(()) => ActionOutcome::Updated,
        Err(e) => {
            tracing::warn!(asset_id = %id, "Failed to update asset: {e}");
            ActionOutcome::error(e.user_message())
        }
    };
    form.redirect(&viewer, &outcome)
}

/// Delete an asset.
#[instrument(skip(viewer, state, form))]
pub async fn delete(
    RequireManager(viewer): RequireManager,
    State(state): State<AppState>,
    Form(form): Form<AssetForm>,
) -> Redirect {
    let Some(id) = form.asset_id() else {
        return form.redirect(&viewer, &ActionOutcome::error("missing_asset_id"));
    };

    let outcome = match AssetRepository::new(state.pool()).delete(id).await {
        Ok(_) => ActionOutcome::Deleted,
        Err(e) => {
            tracing::warn!(asset_id = %id, "Failed to delete asset: {e}");
            ActionOutcome::error(e.user_message())
        }
    };
    form.redirect(&viewer, &outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> AssetForm {
        let map: serde_json::Map<String, serde_json::Value> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }

    #[test]
    fn test_required_fields() {
        let err = form(&[("asset_no", " "), ("asset_name", "Laptop")])
            .to_input()
            .unwrap_err();
        assert_eq!(err, "missing_required_fields");
    }

    #[test]
    fn test_sanitizes_and_parses() {
        let input = form(&[
            ("asset_no", " PC-01 "),
            ("asset_name", "Dell OptiPlex"),
            ("type", "Desktop"),
            ("year", "2024"),
            ("price", "3499.90"),
            ("purchase_date", "2024-02-01"),
            ("department", "   "),
        ])
        .to_input()
        .unwrap();

        assert_eq!(input.asset_no, "PC-01");
        assert_eq!(input.asset_type.as_deref(), Some("Desktop"));
        assert_eq!(input.year, Some(2024));
        assert_eq!(input.price, Some(Decimal::new(349_990, 2)));
        assert_eq!(input.purchase_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(input.department, None);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        for (field, value) in [
            ("year", "twenty"),
            ("price", "RM10"),
            ("purchase_date", "01/02/2024"),
            ("category_id", "not-a-uuid"),
        ] {
            let err = form(&[("asset_no", "PC-01"), ("asset_name", "PC"), (field, value)])
                .to_input()
                .unwrap_err();
            assert_eq!(err, "invalid_field", "{field}");
        }
    }

    #[test]
    fn test_form_fields_round_values() {
        let input = form(&[("asset_no", "PC-01"), ("asset_name", "PC"), ("year", "2023")])
            .to_input()
            .unwrap();
        let fields = form_fields(&input);
        assert_eq!(fields.len(), FORM_FIELDS.len());
        let year = fields.iter().find(|f| f.name == "year").unwrap();
        assert_eq!(year.value, "2023");
        assert!(fields.iter().filter(|f| f.required).count() == 2);
    }
}
