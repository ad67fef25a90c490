//! Role home pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use ict_assets_core::Role;

use crate::{
    db::{AssetRepository, FeedbackRepository, MaintenanceRepository},
    filters,
    middleware::RequireViewer,
    models::Viewer,
    state::AppState,
};

use super::PageContext;

/// Headline number on a dashboard.
#[derive(Debug, Clone)]
pub struct StatCard {
    pub label: &'static str,
    pub value: i64,
    pub href: Option<String>,
}

/// Link card on the assistant and staff dashboards.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub title: &'static str,
    pub description: &'static str,
    pub href: String,
}

/// Category label and asset count.
#[derive(Debug, Clone)]
pub struct CategoryCount {
    pub name: String,
    pub count: i64,
}

/// Dashboard template shared by all roles.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub stats: Vec<StatCard>,
    pub categories: Vec<CategoryCount>,
    pub shortcuts: Vec<Shortcut>,
    pub error: Option<String>,
}

const ASSISTANT_SHORTCUTS: &[(&str, &str, &str)] = &[
    ("Assets", "Register and update asset records.", "/assets"),
    ("Maintenance", "Review and update maintenance requests.", "/maintenance"),
    ("QR Codes", "Generate QR codes for assets.", "/qr"),
    ("Reports", "View asset distribution and maintenance history.", "/reports"),
    ("Feedback", "Send feedback to the asset team.", "/feedback"),
];

const STAFF_SHORTCUTS: &[(&str, &str, &str)] = &[
    ("View Assets", "Browse inventory and verify asset details.", "/assets"),
    ("Scan QR", "Retrieve asset details using a QR code.", "/scan"),
    ("Maintenance Request", "Report issues and track service status.", "/maintenance"),
    ("Notifications", "See updates on maintenance and reminders.", "/notifications"),
    ("Feedback", "Share suggestions with the asset team.", "/feedback"),
];

/// Shortcut cards for `role`; admins get none.
#[must_use]
pub fn shortcuts(role: Role) -> Vec<Shortcut> {
    let entries = match role {
        Role::Admin => &[][..],
        Role::AdminAssistant => ASSISTANT_SHORTCUTS,
        Role::Staff => STAFF_SHORTCUTS,
    };
    entries
        .iter()
        .map(|&(title, description, suffix)| Shortcut {
            title,
            description,
            href: format!("{}{suffix}", role.base_path()),
        })
        .collect()
}

/// Category counts with blank names shown as `Unknown`.
fn category_rows(rows: Vec<(Option<String>, i64)>) -> Vec<CategoryCount> {
    rows.into_iter()
        .map(|(name, count)| CategoryCount {
            name: name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            count,
        })
        .collect()
}

async fn admin_stats(
    state: &AppState,
    viewer: &Viewer,
) -> Result<(Vec<StatCard>, Vec<CategoryCount>), crate::db::RepositoryError> {
    let base = viewer.base_path();
    let (total, _) = AssetRepository::new(state.pool()).counts(None).await?;
    let categories = AssetRepository::new(state.pool()).category_counts().await?;
    let maintenance = MaintenanceRepository::new(state.pool()).counts(None).await?;
    let feedback = FeedbackRepository::new(state.pool()).count().await?;

    let stats = vec![
        StatCard {
            label: "Total assets",
            value: total,
            href: Some(format!("{base}/assets")),
        },
        StatCard {
            label: "Open maintenance",
            value: maintenance.open(),
            href: Some(format!("{base}/maintenance")),
        },
        StatCard {
            label: "Feedback received",
            value: feedback,
            href: Some(format!("{base}/feedback")),
        },
    ];
    Ok((stats, category_rows(categories)))
}

async fn own_stats(state: &AppState, viewer: &Viewer) -> Result<Vec<StatCard>, crate::db::RepositoryError> {
    let (owner, requester) = if viewer.role.is_manager() {
        (None, None)
    } else {
        (Some(viewer.owner_name().unwrap_or_default()), Some(viewer.id()))
    };

    let (total, active) = AssetRepository::new(state.pool()).counts(owner).await?;
    let maintenance = MaintenanceRepository::new(state.pool())
        .counts(requester)
        .await?;

    Ok(vec![
        StatCard {
            label: if owner.is_some() { "My assets" } else { "Total assets" },
            value: total,
            href: None,
        },
        StatCard {
            label: "Assigned",
            value: active,
            href: None,
        },
        StatCard {
            label: "Open maintenance",
            value: maintenance.open(),
            href: None,
        },
        StatCard {
            label: "Resolved",
            value: maintenance.resolved,
            href: None,
        },
    ])
}

/// `GET /{role}`: the role's home page.
#[instrument(skip(viewer, state))]
pub async fn home(RequireViewer(viewer): RequireViewer, State(state): State<AppState>) -> Response {
    let title = match viewer.role {
        Role::Admin => "Admin Dashboard",
        Role::AdminAssistant => "Assistant Dashboard",
        Role::Staff => "Staff Dashboard",
    };

    let loaded = if viewer.role == Role::Admin {
        admin_stats(&state, &viewer).await
    } else {
        own_stats(&state, &viewer).await.map(|stats| (stats, vec![]))
    };
    let (stats, categories, error) = match loaded {
        Ok((stats, categories)) => (stats, categories, None),
        Err(e) => {
            tracing::error!("Failed to load dashboard counts: {e}");
            (vec![], vec![], Some(e.user_message()))
        }
    };

    DashboardTemplate {
        page: PageContext::new(&viewer, title, ""),
        stats,
        categories,
        shortcuts: shortcuts(viewer.role),
        error,
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcuts_follow_role_prefix() {
        assert!(shortcuts(Role::Admin).is_empty());
        let staff = shortcuts(Role::Staff);
        assert_eq!(staff.len(), 5);
        assert!(staff.iter().all(|s| s.href.starts_with("/staff/")));
        assert_eq!(shortcuts(Role::AdminAssistant)[2].href, "/assistant/qr");
    }

    #[test]
    fn test_blank_category_is_unknown() {
        let rows = category_rows(vec![
            (Some("Laptop".to_string()), 3),
            (None, 2),
            (Some("  ".to_string()), 1),
        ]);
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Laptop", "Unknown", "Unknown"]);
    }
}
