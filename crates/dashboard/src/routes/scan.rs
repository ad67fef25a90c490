//! Scan page and scan lookup.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use crate::{
    db::AssetRepository,
    filters,
    middleware::RequireViewer,
    models::{Asset, Viewer},
    state::AppState,
};

use super::{PageContext, clean};

/// Scan page template.
#[derive(Template, WebTemplate)]
#[template(path = "scan/index.html")]
pub struct ScanTemplate {
    pub page: PageContext,
}

/// Scan result template.
#[derive(Template, WebTemplate)]
#[template(path = "scan/result.html")]
pub struct ScanResultTemplate {
    pub page: PageContext,
    pub code: String,
    pub asset: Option<ScannedAsset>,
    pub error: Option<String>,
}

/// Found asset.
#[derive(Debug, Clone)]
pub struct ScannedAsset {
    pub id: String,
    pub title: String,
    pub detail_url: String,
    pub rows: Vec<(&'static str, String)>,
}

/// Whether `viewer` may see `asset` from a scan.
fn visible_to(viewer: &Viewer, asset: &Asset) -> bool {
    viewer.role.is_manager()
        || viewer
            .owner_name()
            .is_some_and(|owner| asset.is_assigned_to(owner))
}

/// Code entry page. Camera scanning posts to the result page client-side.
#[instrument(skip(viewer))]
pub async fn index(RequireViewer(viewer): RequireViewer) -> impl IntoResponse {
    ScanTemplate {
        page: PageContext::new(&viewer, "Scan", "/scan"),
    }
}

/// Look up a scanned or typed code.
#[instrument(skip(viewer, state, params))]
pub async fn result(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let code = clean(params.get("code").map(String::as_str)).unwrap_or_default();

    let (asset, error) = if code.is_empty() {
        (None, None)
    } else {
        match AssetRepository::new(state.pool()).find_by_code(&code).await {
            Ok(found) => (found.filter(|a| visible_to(&viewer, a)), None),
            Err(e) => {
                tracing::error!("Scan lookup failed: {e}");
                (None, Some(e.user_message()))
            }
        }
    };

    let base = viewer.base_path();
    ScanResultTemplate {
        page: PageContext::new(&viewer, "Scan result", "/scan"),
        asset: asset.map(|a| ScannedAsset {
            id: a.id.to_string(),
            title: a.label().to_string(),
            detail_url: format!("{base}/assets/{}", a.id),
            rows: a.detail_rows(),
        }),
        code,
        error,
    }
}
