//! Notification list page and the `/api/notifications` endpoints.

use std::convert::Infallible;
use std::time::Duration;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
};
use serde_json::{Value, json};
use tracing::instrument;

use ict_assets_core::{NotificationType, TagKind, strip_leading_tag};

use crate::{
    db::NotificationRepository,
    error::ApiError,
    filters,
    middleware::{ApiUser, RequireViewer},
    models::Notification,
    services::{
        Announcement, NotificationService, NotifyError,
        live::badge_stream,
    },
    state::AppState,
};

use super::{PageContext, clean, format_timestamp};

/// Body shared by `POST` and `PATCH /api/notifications`.
///
/// Read leniently: a body that is not a JSON object, or a field that is not
/// a string, counts as absent.
#[derive(Debug, Default)]
pub struct NotificationBody {
    pub kind: Option<String>,
    pub title: Option<String>,
    pub maintenance_id: Option<String>,
    pub feedback_id: Option<String>,
}

impl NotificationBody {
    /// Parse raw request bytes.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(raw).unwrap_or(Value::Null);
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(String::from);
        Self {
            kind: text("kind"),
            title: text("title"),
            maintenance_id: text("maintenanceId"),
            feedback_id: text("feedbackId"),
        }
    }

    /// The requested kind, or `None` when missing or unknown.
    fn kind(&self) -> Option<TagKind> {
        self.kind.as_deref().and_then(|k| k.trim().parse().ok())
    }

    /// Id of the subject matching `kind`, when non-blank.
    fn subject_id(&self, kind: TagKind) -> Option<String> {
        match kind {
            TagKind::Maintenance => clean(self.maintenance_id.as_deref()),
            TagKind::Feedback => clean(self.feedback_id.as_deref()),
        }
    }
}

/// One row on the notifications page.
#[derive(Debug, Clone)]
pub struct NotificationView {
    pub message: String,
    pub kind: &'static str,
    pub read: bool,
    pub date: String,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        Self {
            message: strip_leading_tag(&n.message).to_string(),
            kind: match n.kind {
                NotificationType::Maintenance => "Maintenance",
                NotificationType::General => "General",
            },
            read: n.read,
            date: format_timestamp(n.date),
        }
    }
}

/// Notifications page template.
#[derive(Template, WebTemplate)]
#[template(path = "notifications/index.html")]
pub struct NotificationsTemplate {
    pub page: PageContext,
    pub items: Vec<NotificationView>,
    pub error: Option<String>,
}

fn notify_error(e: &NotifyError) -> ApiError {
    ApiError::internal(e.user_message())
}

/// All of the caller's notifications, newest first.
#[instrument(skip(viewer, state))]
pub async fn index(RequireViewer(viewer): RequireViewer, State(state): State<AppState>) -> Response {
    let (items, error) = match NotificationRepository::new(state.pool())
        .list_for_user(viewer.id())
        .await
    {
        Ok(rows) => (rows.iter().map(NotificationView::from).collect(), None),
        Err(e) => {
            tracing::error!("Failed to load notifications: {e}");
            (vec![], Some("Failed to load notifications.".to_string()))
        }
    };

    NotificationsTemplate {
        page: PageContext::new(&viewer, "Notifications", "/notifications"),
        items,
        error,
    }
    .into_response()
}

/// `POST /api/notifications`: fan out a maintenance or feedback notice.
#[instrument(skip(user, state, body))]
pub async fn announce(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body = NotificationBody::parse(&body);
    let kind = body
        .kind()
        .ok_or_else(|| ApiError::bad_request("Invalid kind"))?;
    let subject = body.subject_id(kind);
    let announcement = Announcement {
        kind,
        title: body.title.as_deref(),
        subject_id: subject.as_deref(),
    };

    let count = NotificationService::new(state.pool(), state.identity_admin().is_some())
        .announce(user.id, user.email.as_deref(), &announcement)
        .await
        .map_err(|e| notify_error(&e))?;

    Ok(Json(json!({ "ok": true, "count": count })))
}

/// `PATCH /api/notifications`: mark the caller's notifications read.
#[instrument(skip(user, state, body))]
pub async fn mark_read(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body = NotificationBody::parse(&body);
    let kind = body
        .kind()
        .ok_or_else(|| ApiError::bad_request("Invalid kind"))?;
    let subject = body.subject_id(kind);

    let count = NotificationService::new(state.pool(), state.identity_admin().is_some())
        .mark_read_for(user.id, kind, subject.as_deref())
        .await
        .map_err(|e| notify_error(&e))?;
    tracing::debug!(count, kind = kind.as_str(), "Notifications marked read");

    Ok(Json(json!({ "ok": true })))
}

/// `GET /api/notifications/stream`: live badge state over SSE.
#[instrument(skip(user, state))]
pub async fn stream(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    Sse::new(badge_stream(state, user.id))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(20)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ict_assets_core::{NotificationId, UserId};

    fn body(value: Value) -> NotificationBody {
        NotificationBody::parse(value.to_string().as_bytes())
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(body(json!({"kind": "maintenance"})).kind(), Some(TagKind::Maintenance));
        assert_eq!(body(json!({"kind": "feedback"})).kind(), Some(TagKind::Feedback));
        assert_eq!(body(json!({"kind": "other"})).kind(), None);
        assert_eq!(body(json!({})).kind(), None);
    }

    #[test]
    fn test_mistyped_fields_are_absent() {
        assert_eq!(body(json!({"kind": 5})).kind(), None);
        assert_eq!(body(json!(["maintenance"])).kind(), None);

        let b = body(json!({"kind": "feedback", "title": 7, "feedbackId": 3}));
        assert_eq!(b.kind(), Some(TagKind::Feedback));
        assert_eq!(b.title, None);
        assert_eq!(b.subject_id(TagKind::Feedback), None);
    }

    #[test]
    fn test_non_json_body_has_no_kind() {
        assert_eq!(NotificationBody::parse(b"not json").kind(), None);
        assert_eq!(NotificationBody::parse(b"").kind(), None);
    }

    #[test]
    fn test_subject_follows_kind() {
        let b = body(json!({"kind": "feedback", "feedbackId": "f-1", "maintenanceId": "m-1"}));
        assert_eq!(b.subject_id(TagKind::Feedback).as_deref(), Some("f-1"));
        assert_eq!(b.subject_id(TagKind::Maintenance).as_deref(), Some("m-1"));

        let blank = body(json!({"kind": "feedback", "feedbackId": "  "}));
        assert_eq!(blank.subject_id(TagKind::Feedback), None);
    }

    #[test]
    fn test_view_strips_tag() {
        let row = Notification {
            id: NotificationId::random(),
            user_id: UserId::random(),
            message: "[maintenance:42] New maintenance request from Aina.".to_string(),
            kind: NotificationType::Maintenance,
            read: false,
            date: Utc::now(),
        };
        let view = NotificationView::from(&row);
        assert_eq!(view.message, "New maintenance request from Aina.");
        assert_eq!(view.kind, "Maintenance");
    }
}
