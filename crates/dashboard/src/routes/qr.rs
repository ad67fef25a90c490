//! QR code management and the image proxy.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use ict_assets_core::{ActionOutcome, AssetId, Toast, ToastScope};

use crate::{
    db::{AssetRepository, AssetSearch},
    error::ApiError,
    filters,
    middleware::RequireManager,
    models::Asset,
    services::qr::{self, QrError},
    state::AppState,
};

use super::{PageContext, clean, redirect_base};

/// QR generation form.
#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    pub id: Option<String>,
    pub asset_no: Option<String>,
    pub q: Option<String>,
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Query for the image proxy.
#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub data: Option<String>,
}

/// Asset option in the picker.
#[derive(Debug, Clone)]
pub struct AssetOption {
    pub id: String,
    pub label: String,
    pub asset_no: String,
    pub selected: bool,
}

/// Selected asset with its QR preview.
#[derive(Debug, Clone)]
pub struct SelectedAsset {
    pub id: String,
    pub label: String,
    pub asset_no: String,
    pub payload: String,
    pub has_code: bool,
    pub image_url: String,
}

impl From<&Asset> for SelectedAsset {
    fn from(asset: &Asset) -> Self {
        let payload = asset.qr_payload();
        Self {
            id: asset.id.to_string(),
            label: asset.label().to_string(),
            asset_no: asset.asset_no.clone(),
            image_url: format!("/api/qr?data={}", urlencoding::encode(&payload)),
            payload,
            has_code: asset
                .qr_code
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty()),
        }
    }
}

/// QR management page template.
#[derive(Template, WebTemplate)]
#[template(path = "qr/index.html")]
pub struct QrIndexTemplate {
    pub page: PageContext,
    pub query: String,
    pub options: Vec<AssetOption>,
    pub selected: Option<SelectedAsset>,
}

/// QR management page: pick an asset, preview and store its code.
#[instrument(skip(viewer, state, params))]
pub async fn index(
    RequireManager(viewer): RequireManager,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let term = clean(params.get("q").map(String::as_str));
    let selected_id = params.get("asset").and_then(|a| AssetId::parse(a));
    let repo = AssetRepository::new(state.pool());

    let filter = AssetSearch {
        term: term.clone(),
        ..AssetSearch::default()
    };
    let assets = repo.search(&filter).await.unwrap_or_else(|e| {
        tracing::error!("Failed to search assets: {e}");
        vec![]
    });

    let selected = match selected_id {
        Some(id) => match assets.iter().find(|a| a.id == id) {
            Some(asset) => Some(SelectedAsset::from(asset)),
            None => repo
                .get(id)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Failed to load selected asset: {e}");
                    None
                })
                .as_ref()
                .map(SelectedAsset::from),
        },
        None => None,
    };

    let options = assets
        .iter()
        .map(|a| AssetOption {
            id: a.id.to_string(),
            label: a.label().to_string(),
            asset_no: a.asset_no.clone(),
            selected: Some(a.id) == selected_id,
        })
        .collect();

    QrIndexTemplate {
        page: PageContext::new(&viewer, "QR Codes", "/qr")
            .with_toast(Toast::from_query(ToastScope::Qr, &params)),
        query: term.unwrap_or_default(),
        options,
        selected,
    }
}

/// Code encoded for an asset: the submitted asset number, else the stored
/// asset number, else the asset id. Blank numbers count as missing.
#[must_use]
pub fn qr_code_for(submitted: Option<&str>, stored: Option<&str>, id: AssetId) -> String {
    clean(submitted)
        .or_else(|| clean(stored))
        .unwrap_or_else(|| id.to_string())
}

/// Store the QR code for an asset.
#[instrument(skip(viewer, state, form))]
pub async fn generate(
    RequireManager(viewer): RequireManager,
    State(state): State<AppState>,
    Form(form): Form<GenerateForm>,
) -> Redirect {
    let fallback = format!("{}/qr", viewer.base_path());
    let base = redirect_base(form.redirect_to.as_deref(), &fallback);
    let fail = |message: String| Redirect::to(&ActionOutcome::error(message).redirect_to(&base));

    let Some(id) = form.id.as_deref().and_then(AssetId::parse) else {
        return fail("missing_asset_id".to_string());
    };
    let repo = AssetRepository::new(state.pool());

    let submitted = clean(form.asset_no.as_deref());
    let stored = if submitted.is_some() {
        None
    } else {
        match repo.get(id).await {
            Ok(Some(asset)) => Some(asset.fields.asset_no),
            Ok(None) => return fail("Asset not found".to_string()),
            Err(e) => return fail(e.user_message()),
        }
    };
    let code = qr_code_for(submitted.as_deref(), stored.as_deref(), id);

    if let Err(e) = repo.set_qr_code(id, &code).await {
        tracing::warn!(asset_id = %id, "Failed to store QR code: {e}");
        return fail(e.user_message());
    }

    let id = id.to_string();
    let query = form.q.unwrap_or_default();
    Redirect::to(
        &ActionOutcome::QrGenerated.redirect_with(&base, &[("asset", &id), ("q", query.trim())]),
    )
}

/// `GET /api/qr?data=`: proxy the image service and return a download.
#[instrument(skip(state))]
pub async fn image(State(state): State<AppState>, Query(query): Query<ImageQuery>) -> Response {
    let data = query.data.unwrap_or_default();
    let base = &state.config().qr_service_url;

    match qr::fetch(state.http(), base, &data).await {
        Ok(image) => (
            [
                (header::CONTENT_TYPE, image.content_type.clone()),
                (header::CONTENT_DISPOSITION, image.content_disposition()),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            image.bytes,
        )
            .into_response(),
        Err(e @ QrError::MissingData) => ApiError::bad_request(e.to_string()).into_response(),
        Err(e @ QrError::Upstream(_)) => {
            tracing::warn!(error = ?e, "QR service request failed");
            ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::AssetInput;

    #[test]
    fn test_code_without_asset_number_is_row_id() {
        let id = AssetId::new(uuid::Uuid::nil());
        assert_eq!(qr_code_for(None, None, id), id.to_string());
        assert_eq!(qr_code_for(Some("  "), Some(""), id), id.to_string());
    }

    #[test]
    fn test_code_prefers_submitted_then_stored_number() {
        let id = AssetId::random();
        assert_eq!(qr_code_for(Some(" ICT-0042 "), Some("ICT-0001"), id), "ICT-0042");
        assert_eq!(qr_code_for(None, Some("ICT-0001"), id), "ICT-0001");
    }

    #[test]
    fn test_selected_asset_preview_url() {
        let asset = Asset {
            id: AssetId::new(uuid::Uuid::nil()),
            category_name: None,
            created_at: Utc::now(),
            fields: AssetInput {
                asset_no: "ICT 01/A".to_string(),
                asset_name: "Printer".to_string(),
                ..AssetInput::default()
            },
        };
        let selected = SelectedAsset::from(&asset);
        assert_eq!(selected.payload, "ICT 01/A");
        assert_eq!(selected.image_url, "/api/qr?data=ICT%2001%2FA");
        assert!(!selected.has_code);
    }
}
