//! Feedback form (staff, assistants) and inbox (admins).

use std::collections::{HashMap, HashSet};

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use ict_assets_core::{
    ActionOutcome, CorrelationTag, FeedbackId, NotificationType, TagKind, Toast, ToastScope,
    UserId,
};

use crate::{
    db::{FeedbackRepository, NotificationRepository},
    error::AppError,
    filters,
    middleware::RequireViewer,
    models::{FeedbackEntry, NewFeedback},
    services::{Announcement, NotificationService},
    state::AppState,
};

use super::{PageContext, clean, format_timestamp};

/// Last-resort author label.
const UNKNOWN_AUTHOR: &str = "Staff member";

/// Feedback submission form.
#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    pub message: Option<String>,
}

/// Feedback row for the inbox.
#[derive(Debug, Clone)]
pub struct FeedbackView {
    pub id: String,
    pub author: String,
    pub email: String,
    pub role: String,
    pub message: String,
    pub created_at: String,
    pub unread: bool,
}

/// Feedback form template.
#[derive(Template, WebTemplate)]
#[template(path = "feedback/form.html")]
pub struct FeedbackFormTemplate {
    pub page: PageContext,
}

/// Feedback inbox template.
#[derive(Template, WebTemplate)]
#[template(path = "feedback/index.html")]
pub struct FeedbackIndexTemplate {
    pub page: PageContext,
    pub entries: Vec<FeedbackView>,
    pub error: Option<String>,
}

/// Feedback detail template.
#[derive(Template, WebTemplate)]
#[template(path = "feedback/show.html")]
pub struct FeedbackShowTemplate {
    pub page: PageContext,
    pub entry: FeedbackView,
}

/// Whether any unread message carries the tag for `id`.
fn has_unread_tag(messages: &[String], id: FeedbackId) -> bool {
    CorrelationTag::new(TagKind::Feedback, id.to_string())
        .map(|tag| tag.to_string())
        .is_some_and(|tag| messages.iter().any(|m| m.contains(&tag)))
}

/// Build the inbox row; `provider_email` comes from the identity provider.
fn feedback_view(
    entry: &FeedbackEntry,
    provider_email: Option<&str>,
    unread: bool,
) -> FeedbackView {
    let author = entry
        .known_author()
        .or(provider_email)
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_string();
    let email = clean(entry.email.as_deref())
        .or_else(|| clean(provider_email))
        .unwrap_or_default();

    FeedbackView {
        id: entry.id.to_string(),
        author,
        email,
        role: clean(entry.role.as_deref()).unwrap_or_else(|| "staff".to_string()),
        message: entry.message.clone(),
        created_at: format_timestamp(entry.created_at),
        unread,
    }
}

/// Identity-provider emails for authors the database cannot name.
async fn provider_emails(state: &AppState, entries: &[FeedbackEntry]) -> HashMap<UserId, String> {
    let Some(admin) = state.identity_admin() else {
        return HashMap::new();
    };
    let ids: HashSet<UserId> = entries
        .iter()
        .filter(|e| e.known_author().is_none())
        .filter_map(|e| e.created_by)
        .collect();

    let lookups = ids.into_iter().map(|id| async move {
        match admin.get_user(id).await {
            Ok(user) => user.email.map(|email| (id, email)),
            Err(e) => {
                tracing::debug!(user_id = %id, "Author lookup failed: {e}");
                None
            }
        }
    });

    futures::future::join_all(lookups)
        .await
        .into_iter()
        .flatten()
        .collect()
}

/// Feedback form for staff and admin assistants.
#[instrument(skip(viewer, params))]
pub async fn form(
    RequireViewer(viewer): RequireViewer,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    FeedbackFormTemplate {
        page: PageContext::new(&viewer, "Feedback", "/feedback")
            .with_toast(Toast::from_query(ToastScope::Feedback, &params)),
    }
}

/// Store feedback, then notify managers (best effort).
#[instrument(skip(viewer, state, form))]
pub async fn submit(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Form(form): Form<FeedbackForm>,
) -> Redirect {
    let base = format!("{}/feedback", viewer.base_path());
    let finish = |outcome: ActionOutcome| Redirect::to(&outcome.redirect_to(&base));

    let Some(message) = clean(form.message.as_deref()) else {
        return finish(ActionOutcome::error("missing_message"));
    };

    let feedback = NewFeedback {
        message,
        role: viewer.role,
        created_by: viewer.id(),
        email: viewer.email().map(String::from),
    };
    let id = match FeedbackRepository::new(state.pool()).create(&feedback).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Failed to store feedback: {e}");
            return finish(ActionOutcome::error(e.user_message()));
        }
    };

    let subject = id.to_string();
    let announcement = Announcement {
        kind: TagKind::Feedback,
        title: None,
        subject_id: Some(&subject),
    };
    if let Err(e) = NotificationService::new(state.pool(), state.identity_admin().is_some())
        .announce(viewer.id(), viewer.email(), &announcement)
        .await
    {
        tracing::warn!("Failed to send feedback notification: {e}");
    }

    finish(ActionOutcome::Saved)
}

/// Feedback inbox (admins only; the route lives under `/admin`).
#[instrument(skip(viewer, state))]
pub async fn inbox(RequireViewer(viewer): RequireViewer, State(state): State<AppState>) -> Response {
    let page = PageContext::new(&viewer, "Feedback", "/feedback");

    let entries = match FeedbackRepository::new(state.pool()).list_all().await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Failed to fetch feedback: {e}");
            return FeedbackIndexTemplate {
                page,
                entries: vec![],
                error: Some("Unable to load feedback. Please try again later.".to_string()),
            }
            .into_response();
        }
    };

    let unread = NotificationRepository::new(state.pool())
        .unread_messages(viewer.id(), NotificationType::General)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load unread feedback notifications: {e}");
            vec![]
        });
    let emails = provider_emails(&state, &entries).await;

    let entries = entries
        .iter()
        .map(|entry| {
            let provider_email = entry
                .created_by
                .and_then(|id| emails.get(&id))
                .map(String::as_str);
            feedback_view(entry, provider_email, has_unread_tag(&unread, entry.id))
        })
        .collect();

    FeedbackIndexTemplate {
        page,
        entries,
        error: None,
    }
    .into_response()
}

/// Feedback detail; marks the viewer's notifications about it read.
#[instrument(skip(viewer, state))]
pub async fn show(
    RequireViewer(viewer): RequireViewer,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("feedback {id}"));
    let feedback_id = FeedbackId::parse(&id).ok_or_else(not_found)?;
    let entry = FeedbackRepository::new(state.pool())
        .get(feedback_id)
        .await?
        .ok_or_else(not_found)?;

    let provider_email = match (entry.known_author(), entry.created_by, state.identity_admin()) {
        (None, Some(author), Some(admin)) => admin.get_user(author).await.ok().and_then(|u| u.email),
        _ => None,
    };

    let subject = feedback_id.to_string();
    match NotificationService::new(state.pool(), state.identity_admin().is_some())
        .mark_read_for(viewer.id(), TagKind::Feedback, Some(&subject))
        .await
    {
        Ok(count) => tracing::debug!(count, "Marked feedback notifications read"),
        Err(e) => tracing::warn!("Failed to mark feedback notifications read: {e}"),
    }

    Ok(FeedbackShowTemplate {
        page: PageContext::new(&viewer, "Feedback", "/feedback"),
        entry: feedback_view(&entry, provider_email.as_deref(), false),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(author: Option<&str>, email: Option<&str>) -> FeedbackEntry {
        FeedbackEntry {
            id: FeedbackId::new(uuid::Uuid::nil()),
            message: "Projector in room 3 flickers".to_string(),
            role: None,
            created_by: Some(UserId::random()),
            email: email.map(String::from),
            author_name: author.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_author_fallback_chain() {
        assert_eq!(feedback_view(&entry(Some("Aina"), None), None, false).author, "Aina");
        assert_eq!(
            feedback_view(&entry(None, Some("a@x.my")), Some("b@x.my"), false).author,
            "a@x.my"
        );
        assert_eq!(
            feedback_view(&entry(None, None), Some("b@x.my"), false).author,
            "b@x.my"
        );
        assert_eq!(feedback_view(&entry(None, None), None, false).author, "Staff member");
    }

    #[test]
    fn test_role_defaults_to_staff() {
        assert_eq!(feedback_view(&entry(None, None), None, false).role, "staff");
    }

    #[test]
    fn test_unread_marker_matches_tag() {
        let id = FeedbackId::new(uuid::Uuid::nil());
        let messages = vec![format!("[feedback:{id}] New feedback submitted by Aina.")];
        assert!(has_unread_tag(&messages, id));
        assert!(!has_unread_tag(&messages, FeedbackId::random()));
        assert!(!has_unread_tag(&[], id));
    }
}
