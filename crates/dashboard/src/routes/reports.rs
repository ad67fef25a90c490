//! Reports page for admins and admin assistants.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::{
    db::{AssetRepository, MaintenanceRepository},
    filters,
    middleware::RequireManager,
    services::{ChartSeries, ReportMetrics, reports},
    state::AppState,
};

use super::PageContext;

/// One chart with its table fallback.
#[derive(Debug, Clone)]
pub struct ChartPanel {
    pub id: &'static str,
    pub title: &'static str,
    /// Chart style hint for the client script (`bar`, `doughnut`, `line`).
    pub kind: &'static str,
    pub json: String,
    pub rows: Vec<(String, i64)>,
}

impl ChartPanel {
    fn new(id: &'static str, title: &'static str, kind: &'static str, series: &ChartSeries) -> Self {
        Self {
            id,
            title,
            kind,
            json: series.to_json(),
            rows: series
                .rows()
                .map(|(label, count)| (label.to_string(), count))
                .collect(),
        }
    }
}

/// Reports page template.
#[derive(Template, WebTemplate)]
#[template(path = "reports/index.html")]
pub struct ReportsTemplate {
    pub page: PageContext,
    pub metrics: ReportMetrics,
    pub charts: Vec<ChartPanel>,
    pub insights: Vec<String>,
    pub error: Option<String>,
}

/// Metrics, chart payloads and insights over all assets and requests.
#[instrument(skip(viewer, state))]
pub async fn index(RequireManager(viewer): RequireManager, State(state): State<AppState>) -> Response {
    let page = PageContext::new(&viewer, "Reports", "/reports");

    let assets = AssetRepository::new(state.pool()).facts().await;
    let requests = MaintenanceRepository::new(state.pool()).facts().await;
    let (assets, requests) = match (assets, requests) {
        (Ok(assets), Ok(requests)) => (assets, requests),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Failed to load report data: {e}");
            return ReportsTemplate {
                page,
                metrics: ReportMetrics::default(),
                charts: vec![],
                insights: vec![],
                error: Some(e.user_message()),
            }
            .into_response();
        }
    };

    let report = reports::build(&assets, &requests, chrono::Utc::now());
    let charts = vec![
        ChartPanel::new("chart-category", "Assets by category", "doughnut", &report.by_category),
        ChartPanel::new("chart-type", "Assets by type", "bar", &report.by_type),
        ChartPanel::new("chart-status", "Maintenance by status", "bar", &report.by_status),
        ChartPanel::new("chart-trend", "Maintenance requests (6 months)", "line", &report.trend),
    ];

    ReportsTemplate {
        page,
        metrics: report.metrics,
        charts,
        insights: report.insights,
        error: None,
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_copies_rows_and_payload() {
        let series = ChartSeries {
            labels: vec!["Laptop".to_string(), "Printer".to_string()],
            data: vec![3, 1],
        };
        let panel = ChartPanel::new("c", "Assets", "bar", &series);
        assert_eq!(panel.rows, vec![("Laptop".to_string(), 3), ("Printer".to_string(), 1)]);
        assert_eq!(panel.json, series.to_json());
    }
}
