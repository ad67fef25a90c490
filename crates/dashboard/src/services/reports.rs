//! Report aggregation: metrics, chart payloads and insights.
//!
//! Everything here is pure; the route loads the rows and passes them in.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use ict_assets_core::MaintenanceStatus;

use crate::db::AssetFact;

/// Share of all assets above which one category is called dominant.
const DOMINANT_SHARE_PERCENT: f64 = 40.0;

/// Months shown in the request trend.
const TREND_MONTHS: u32 = 6;

/// Labels and values for one chart, rendered client-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub data: Vec<i64>,
}

impl ChartSeries {
    /// Count occurrences and order by count descending, then label.
    fn tally<I>(items: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for item in items {
            *counts.entry(item).or_default() += 1;
        }
        let mut entries: Vec<(String, i64)> = counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let (labels, data) = entries.into_iter().unzip();
        Self { labels, data }
    }

    /// `(label, value)` pairs for the HTML table fallback.
    pub fn rows(&self) -> impl Iterator<Item = (&str, i64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.data.iter().copied())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// JSON payload for the chart script.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"labels\":[],\"data\":[]}".to_string())
    }
}

/// Headline numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportMetrics {
    pub total_assets: i64,
    pub total_requests: i64,
    pub pending: i64,
    pub in_progress: i64,
    /// Resolved requests.
    pub completed: i64,
}

/// Everything the reports page shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub metrics: ReportMetrics,
    pub by_category: ChartSeries,
    pub by_type: ChartSeries,
    pub by_status: ChartSeries,
    pub trend: ChartSeries,
    pub insights: Vec<String>,
}

fn label_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn status_label(raw: &str) -> String {
    MaintenanceStatus::from_stored(raw)
        .map_or_else(|| label_or(Some(raw), "unknown"), |s| s.as_str().to_string())
}

/// First day of the month `back` months before `now`'s month.
fn month_start(now: DateTime<Utc>, back: u32) -> Option<NaiveDate> {
    let index = i64::from(now.year()) * 12 + i64::from(now.month0()) - i64::from(back);
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Requests per month for the last six months, oldest first, labelled
/// `Mon YYYY`.
fn monthly_trend(created: &[DateTime<Utc>], now: DateTime<Utc>) -> ChartSeries {
    let months: Vec<NaiveDate> = (0..TREND_MONTHS)
        .rev()
        .filter_map(|back| month_start(now, back))
        .collect();

    let data = months
        .iter()
        .map(|month| {
            let count = created
                .iter()
                .filter(|ts| ts.year() == month.year() && ts.month() == month.month())
                .count();
            i64::try_from(count).unwrap_or(i64::MAX)
        })
        .collect();

    ChartSeries {
        labels: months.iter().map(|m| m.format("%b %Y").to_string()).collect(),
        data,
    }
}

fn insights(
    metrics: &ReportMetrics,
    by_category: &ChartSeries,
    created: &[DateTime<Utc>],
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut out = Vec::new();

    if metrics.pending > metrics.completed {
        out.push(
            "Maintenance backlog is high compared with resolved tickets. Consider adding service slots or a weekly schedule."
                .to_string(),
        );
    }

    if let Some((name, count)) = by_category.rows().next()
        && metrics.total_assets > 0
    {
        #[allow(clippy::cast_precision_loss)]
        let share = count as f64 / metrics.total_assets as f64 * 100.0;
        if share >= DOMINANT_SHARE_PERCENT {
            out.push(format!(
                "Category {name} dominates the inventory ({share:.0}%). A service policy for this category may be worthwhile."
            ));
        }
    }

    let last_30 = now - Duration::days(30);
    let previous_30 = now - Duration::days(60);
    let recent = created.iter().filter(|ts| **ts >= last_30).count();
    let previous = created
        .iter()
        .filter(|ts| **ts >= previous_30 && **ts < last_30)
        .count();
    if previous > 0 && recent > previous {
        out.push(
            "Maintenance requests in the last 30 days rose compared with the previous 30 days. Review the main causes of faults."
                .to_string(),
        );
    }

    if out.is_empty() {
        out.push(
            "Activity is stable. Keep monitoring regularly to reveal clearer patterns.".to_string(),
        );
    }
    out
}

/// Build the report from asset facts and `(status, created_at)` request rows.
#[must_use]
pub fn build(
    assets: &[AssetFact],
    requests: &[(String, DateTime<Utc>)],
    now: DateTime<Utc>,
) -> Report {
    let by_category = ChartSeries::tally(
        assets
            .iter()
            .map(|a| label_or(a.category_name.as_deref(), "Uncategorized")),
    );
    let by_type = ChartSeries::tally(
        assets
            .iter()
            .map(|a| label_or(a.asset_type.as_deref(), "Other")),
    );
    let by_status = ChartSeries::tally(requests.iter().map(|(status, _)| status_label(status)));

    let count_status = |wanted: MaintenanceStatus| {
        let n = requests
            .iter()
            .filter(|(status, _)| MaintenanceStatus::from_stored(status) == Some(wanted))
            .count();
        i64::try_from(n).unwrap_or(i64::MAX)
    };

    let metrics = ReportMetrics {
        total_assets: i64::try_from(assets.len()).unwrap_or(i64::MAX),
        total_requests: i64::try_from(requests.len()).unwrap_or(i64::MAX),
        pending: count_status(MaintenanceStatus::Pending),
        in_progress: count_status(MaintenanceStatus::InProgress),
        completed: count_status(MaintenanceStatus::Resolved),
    };

    let created: Vec<DateTime<Utc>> = requests.iter().map(|(_, ts)| *ts).collect();
    let trend = monthly_trend(&created, now);
    let insights = insights(&metrics, &by_category, &created, now);

    Report {
        metrics,
        by_category,
        by_type,
        by_status,
        trend,
        insights,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn asset(category: Option<&str>, kind: Option<&str>) -> AssetFact {
        AssetFact {
            category_name: category.map(String::from),
            asset_type: kind.map(String::from),
        }
    }

    fn request(status: &str, days_ago: i64) -> (String, DateTime<Utc>) {
        (status.to_string(), now() - Duration::days(days_ago))
    }

    #[test]
    fn test_chart_defaults_and_ordering() {
        let assets = vec![
            asset(Some("Laptop"), Some("Dell")),
            asset(None, None),
            asset(Some("Desktop"), Some("  ")),
            asset(Some("Laptop"), Some("Dell")),
        ];
        let report = build(&assets, &[], now());

        assert_eq!(report.by_category.labels, vec!["Laptop", "Desktop", "Uncategorized"]);
        assert_eq!(report.by_category.data, vec![2, 1, 1]);
        assert_eq!(report.by_type.labels, vec!["Dell", "Other"]);
        assert_eq!(report.by_type.data, vec![2, 2]);
    }

    #[test]
    fn test_metrics_read_legacy_statuses() {
        let requests = vec![
            request("Pending", 1),
            request("pending", 2),
            request("In Progress", 3),
            request("completed", 4),
            request("Resolved", 5),
            request("", 6),
        ];
        let report = build(&[], &requests, now());

        assert_eq!(
            report.metrics,
            ReportMetrics {
                total_assets: 0,
                total_requests: 6,
                pending: 2,
                in_progress: 1,
                completed: 2,
            }
        );
        assert_eq!(report.by_status.labels, vec!["Pending", "Resolved", "In Progress", "unknown"]);
    }

    #[test]
    fn test_trend_covers_six_months_oldest_first() {
        let requests = vec![request("Pending", 0), request("Pending", 40), request("Pending", 400)];
        let report = build(&[], &requests, now());

        assert_eq!(
            report.trend.labels,
            vec!["Oct 2025", "Nov 2025", "Dec 2025", "Jan 2026", "Feb 2026", "Mar 2026"]
        );
        assert_eq!(report.trend.data, vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_backlog_and_dominant_category_insights() {
        let assets = vec![
            asset(Some("Laptop"), None),
            asset(Some("Laptop"), None),
            asset(Some("Printer"), None),
        ];
        let requests = vec![request("Pending", 100)];
        let report = build(&assets, &requests, now());

        assert_eq!(report.insights.len(), 2);
        assert!(report.insights[0].starts_with("Maintenance backlog is high"));
        assert!(report.insights[1].contains("Category Laptop dominates the inventory (67%)"));
    }

    #[test]
    fn test_rising_demand_insight() {
        let requests = vec![
            request("Resolved", 5),
            request("Resolved", 10),
            request("Resolved", 45),
        ];
        let report = build(&[], &requests, now());
        assert_eq!(report.insights.len(), 1);
        assert!(report.insights[0].starts_with("Maintenance requests in the last 30 days rose"));
    }

    #[test]
    fn test_stable_when_nothing_stands_out() {
        let assets: Vec<AssetFact> = ["A", "B", "C"].iter().map(|c| asset(Some(*c), None)).collect();
        let report = build(&assets, &[request("Resolved", 5)], now());
        assert_eq!(report.insights, vec![
            "Activity is stable. Keep monitoring regularly to reveal clearer patterns.".to_string()
        ]);
    }

    #[test]
    fn test_month_start_wraps_years() {
        let jan = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(month_start(jan, 1), NaiveDate::from_ymd_opt(2025, 12, 1));
        assert_eq!(month_start(jan, 13), NaiveDate::from_ymd_opt(2024, 12, 1));
    }
}
