//! Live badge stream over the `notification_changes` change feed.
//!
//! Each SSE response owns its own `PgListener`; dropping the stream (client
//! disconnect) closes that connection. Delivery is best effort: events
//! missed while the listener reconnects are not replayed.

use std::convert::Infallible;

use axum::response::sse::Event;
use futures::Stream;
use sqlx::postgres::PgListener;

use ict_assets_core::{NotificationType, UserId};

use super::badge::{BADGE_LIMIT, BadgeState, FeedbackCounter, NotificationBadge, NotificationChange};
use crate::{db::NotificationRepository, state::AppState};

/// Channel the notifications trigger publishes on.
pub const CHANNEL: &str = "notification_changes";

/// Load the bell and feedback counter for `user`.
///
/// A failed load yields a badge carrying the load error.
pub async fn load_snapshot(state: &AppState, user: UserId) -> (NotificationBadge, FeedbackCounter) {
    let repo = NotificationRepository::new(state.pool());
    let limit = i64::try_from(BADGE_LIMIT).unwrap_or(5);

    let badge = match (
        repo.list_unread(user, limit).await,
        repo.count_unread(user, None).await,
    ) {
        (Ok(items), Ok(unread)) => {
            NotificationBadge::from_snapshot(items, u64::try_from(unread).unwrap_or(0))
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(%user, error = %e, "Failed to load notifications");
            NotificationBadge::failed()
        }
    };

    let feedback = match repo
        .count_unread(user, Some(NotificationType::General))
        .await
    {
        Ok(count) => FeedbackCounter::new(u64::try_from(count).unwrap_or(0)),
        Err(e) => {
            tracing::error!(%user, error = %e, "Failed to load feedback count");
            FeedbackCounter::default()
        }
    };

    (badge, feedback)
}

fn to_event(badge: &NotificationBadge, feedback: FeedbackCounter) -> Event {
    let json = serde_json::to_string(&BadgeState::new(badge, feedback)).unwrap_or_else(|_| {
        r#"{"items":[],"unread":0,"feedback_unread":0,"error":"Failed to load notifications."}"#
            .to_string()
    });
    Event::default().event("badge").data(json)
}

/// Stream of badge states for one user: a snapshot, then one event per
/// applied change.
pub fn badge_stream(state: AppState, user: UserId) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let (mut badge, mut feedback) = load_snapshot(&state, user).await;
        yield Ok(to_event(&badge, feedback));

        let mut listener = match PgListener::connect_with(state.pool()).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::warn!(%user, error = %e, "Failed to open notification listener");
                return;
            }
        };
        if let Err(e) = listener.listen(CHANNEL).await {
            tracing::warn!(%user, error = %e, "Failed to LISTEN on {CHANNEL}");
            return;
        }
        tracing::debug!(%user, "Notification listener attached");

        loop {
            let notification = match listener.recv().await {
                Ok(notification) => notification,
                Err(e) => {
                    tracing::warn!(%user, error = %e, "Notification listener closed");
                    break;
                }
            };

            let change = match NotificationChange::parse(notification.payload()) {
                Ok(change) => change,
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed notification change payload");
                    continue;
                }
            };
            if change.row.user_id != user {
                continue;
            }

            let badge_changed = badge.apply(&change);
            let feedback_changed = feedback.apply(&change);
            if badge_changed || feedback_changed {
                yield Ok(to_event(&badge, feedback));
            }
        }
    }
}
