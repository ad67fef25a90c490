//! Maintenance request route handlers.
//!
//! Managers review and move requests through `Pending`, `In Progress` and
//! `Resolved`. Staff file requests against assets assigned to them.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use ict_assets_core::{
    ActionOutcome, AssetId, MaintenanceId, MaintenanceStatus, TagKind, Toast, ToastScope,
};

use crate::{
    db::{AssetRepository, AssetSearch, MaintenanceRepository, StatusCounts},
    filters,
    middleware::{RequireManager, RequireViewer},
    models::{MaintenanceRequest, NewMaintenanceRequest, Viewer, maintenance::request_title},
    services::{Announcement, NotificationService},
    state::AppState,
};

use super::{PageContext, clean, format_timestamp, redirect_base};

// =============================================================================
// Form Types
// =============================================================================

/// Status update form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Staff request form.
#[derive(Debug, Deserialize)]
pub struct RequestForm {
    pub asset_id: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// View Types
// =============================================================================

/// Request row for lists.
#[derive(Debug, Clone)]
pub struct RequestView {
    pub id: String,
    pub title: String,
    pub asset: String,
    pub description: String,
    pub requester: String,
    pub status: String,
    pub status_class: &'static str,
    pub created_at: String,
}

impl From<&MaintenanceRequest> for RequestView {
    fn from(request: &MaintenanceRequest) -> Self {
        Self {
            id: request.id.to_string(),
            title: request.title.clone(),
            asset: request.asset_label.clone().unwrap_or_default(),
            description: request.description.clone().unwrap_or_default(),
            requester: request.requester_label().to_string(),
            status: request.status_label().to_string(),
            status_class: request.status_class(),
            created_at: format_timestamp(request.created_at),
        }
    }
}

/// Status filter option.
#[derive(Debug, Clone)]
pub struct FilterOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Manager list template.
#[derive(Template, WebTemplate)]
#[template(path = "maintenance/index.html")]
pub struct MaintenanceIndexTemplate {
    pub page: PageContext,
    pub requests: Vec<RequestView>,
    pub counts: StatusCounts,
    pub query: String,
    pub status_options: Vec<FilterOption>,
    pub statuses: Vec<&'static str>,
    pub redirect_to: String,
}

/// Assigned asset option for the staff form.
#[derive(Debug, Clone)]
pub struct AssetChoice {
    pub id: String,
    pub label: String,
}

/// Staff request page template.
#[derive(Template, WebTemplate)]
#[template(path = "maintenance/staff.html")]
pub struct StaffMaintenanceTemplate {
    pub page: PageContext,
    pub assets: Vec<AssetChoice>,
    pub requests: Vec<RequestView>,
}

/// Parse the `status` filter; `all`, blank or unknown mean no filter.
fn status_filter(raw: Option<&str>) -> Option<MaintenanceStatus> {
    raw.and_then(MaintenanceStatus::from_stored)
}

fn filter_options(selected: Option<MaintenanceStatus>) -> Vec<FilterOption> {
    std::iter::once(FilterOption {
        value: "all",
        label: "All",
        selected: selected.is_none(),
    })
    .chain(MaintenanceStatus::ALL.into_iter().map(|status| FilterOption {
        value: status.as_str(),
        label: status.as_str(),
        selected: selected == Some(status),
    }))
    .collect()
}

/// Apply the status filter and search term.
fn filter_requests(
    requests: &[MaintenanceRequest],
    status: Option<MaintenanceStatus>,
    term: Option<&str>,
) -> Vec<RequestView> {
    let needle = term.map(str::to_lowercase).unwrap_or_default();
    requests
        .iter()
        .filter(|r| status.is_none() || r.status == status)
        .filter(|r| r.matches(&needle))
        .map(RequestView::from)
        .collect()
}

// =============================================================================
// Manager Handlers
// =============================================================================

/// Maintenance list for admins and assistants.
#[instrument(skip(viewer, state, params))]
pub async fn index(
    RequireManager(viewer): RequireManager,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let term = clean(params.get("q").map(String::as_str));
    let status = status_filter(params.get("status").map(String::as_str));

    let all = MaintenanceRepository::new(state.pool())
        .list_all()
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch maintenance requests: {e}");
            vec![]
        });

    let page = PageContext::new(&viewer, "Maintenance", "/maintenance")
        .with_toast(Toast::from_query(ToastScope::Maintenance, &params));
    let redirect_to = page.current_path.clone();

    MaintenanceIndexTemplate {
        requests: filter_requests(&all, status, term.as_deref()),
        counts: StatusCounts::tally(&all),
        query: term.unwrap_or_default(),
        status_options: filter_options(status),
        statuses: MaintenanceStatus::ALL.iter().map(|s| s.as_str()).collect(),
        page,
        redirect_to,
    }
}

/// Move a request to a new status.
///
/// Moving to `In Progress` or `Resolved` also marks every recipient's
/// notifications about the request read, when the privileged credential is
/// configured.
#[instrument(skip(viewer, state, form))]
pub async fn update_status(
    RequireManager(viewer): RequireManager,
    State(state): State<AppState>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let fallback = format!("{}/maintenance", viewer.base_path());
    let base = redirect_base(form.redirect_to.as_deref(), &fallback);
    let finish = |outcome: ActionOutcome| Redirect::to(&outcome.redirect_to(&base));

    let id = form.id.as_deref().and_then(MaintenanceId::parse);
    let status = form
        .status
        .as_deref()
        .and_then(|s| s.trim().parse::<MaintenanceStatus>().ok());
    let (Some(id), Some(status)) = (id, status) else {
        return finish(ActionOutcome::error("invalid_request"));
    };

    if let Err(e) = MaintenanceRepository::new(state.pool())
        .update_status(id, status)
        .await
    {
        tracing::warn!(maintenance_id = %id, "Failed to update status: {e}");
        return finish(ActionOutcome::error(e.user_message()));
    }

    if status.clears_notifications() && state.identity_admin().is_some() {
        match NotificationService::new(state.pool(), true)
            .clear_maintenance(id)
            .await
        {
            Ok(count) => tracing::debug!(count, "Cleared maintenance notifications"),
            Err(e) => tracing::warn!("Failed to clear maintenance notifications: {e}"),
        }
    }

    finish(ActionOutcome::Updated)
}

// =============================================================================
// Staff Handlers
// =============================================================================

async fn assigned_assets(state: &AppState, viewer: &Viewer) -> Vec<AssetChoice> {
    let Some(owner) = viewer.owner_name() else {
        return vec![];
    };
    let filter = AssetSearch {
        owner: Some(owner.to_string()),
        ..AssetSearch::default()
    };
    let mut assets: Vec<AssetChoice> = AssetRepository::new(state.pool())
        .search(&filter)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch assigned assets: {e}");
            vec![]
        })
        .iter()
        .map(|a| AssetChoice {
            id: a.id.to_string(),
            label: if a.asset_name.trim().is_empty() {
                a.asset_no.clone()
            } else {
                format!("{} ({})", a.asset_name, a.asset_no)
            },
        })
        .collect();
    assets.sort_by(|a, b| a.label.cmp(&b.label));
    assets
}

/// Staff request form plus the caller's own requests.
#[instrument(skip(viewer, state, params))]
pub async fn staff_index(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let requests = MaintenanceRepository::new(state.pool())
        .list_by_requester(viewer.id())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch own maintenance requests: {e}");
            vec![]
        });

    StaffMaintenanceTemplate {
        assets: assigned_assets(&state, &viewer).await,
        requests: requests.iter().map(RequestView::from).collect(),
        page: PageContext::new(&viewer, "Maintenance", "/maintenance")
            .with_toast(Toast::from_query(ToastScope::MaintenanceRequest, &params)),
    }
}

/// File a maintenance request, then notify managers (best effort).
#[instrument(skip(viewer, state, form))]
pub async fn staff_submit(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Form(form): Form<RequestForm>,
) -> Redirect {
    let base = format!("{}/maintenance", viewer.base_path());
    let finish = |outcome: ActionOutcome| Redirect::to(&outcome.redirect_to(&base));

    let asset = match form.asset_id.as_deref().and_then(AssetId::parse) {
        Some(id) => AssetRepository::new(state.pool())
            .get(id)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Failed to load asset for request: {e}");
                None
            }),
        None => None,
    };
    let Some(asset) = asset.filter(|a| {
        viewer
            .owner_name()
            .is_some_and(|owner| a.is_assigned_to(owner))
    }) else {
        return finish(ActionOutcome::error("missing_asset"));
    };

    let title = request_title(Some(asset.label()));
    let request = NewMaintenanceRequest {
        title: title.clone(),
        asset_id: Some(asset.id),
        description: clean(form.description.as_deref()),
        requested_by: viewer.id(),
    };

    let id = match MaintenanceRepository::new(state.pool()).create(&request).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Failed to create maintenance request: {e}");
            return finish(ActionOutcome::error(e.user_message()));
        }
    };
    tracing::info!(maintenance_id = %id, "Maintenance request created");

    let subject = id.to_string();
    let announcement = Announcement {
        kind: TagKind::Maintenance,
        title: Some(&title),
        subject_id: Some(&subject),
    };
    if let Err(e) = NotificationService::new(state.pool(), state.identity_admin().is_some())
        .announce(viewer.id(), viewer.email(), &announcement)
        .await
    {
        tracing::warn!("Failed to send maintenance notification: {e}");
    }

    finish(ActionOutcome::Saved)
}
