//! Notification badge and feedback counter state.
//!
//! Both start from a database snapshot and then fold change-feed events.
//! They are plain values so the live stream (and tests) can drive them
//! without I/O.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ict_assets_core::{NotificationId, NotificationType, strip_leading_tag};

use crate::models::Notification;

/// Most recent unread notifications shown in the bell.
pub const BADGE_LIMIT: usize = 5;

/// Shown when the initial snapshot could not be loaded.
pub const LOAD_ERROR: &str = "Failed to load notifications.";

/// Row operation reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
}

/// One `notification_changes` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationChange {
    pub op: ChangeOp,
    #[serde(flatten)]
    pub row: Notification,
}

impl NotificationChange {
    /// Parse a `pg_notify` payload.
    ///
    /// # Errors
    ///
    /// Returns the JSON error for malformed payloads.
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Bell state: the newest unread notifications plus a running unread count.
///
/// `seen` remembers every id the count has moved for (`true` while it is
/// counted unread), so redelivered events never count twice even after the
/// row has left `items`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationBadge {
    items: Vec<Notification>,
    unread: u64,
    seen: HashMap<NotificationId, bool>,
    error: Option<String>,
}

impl NotificationBadge {
    /// Start from a loaded snapshot. `items` should be newest first.
    #[must_use]
    pub fn from_snapshot(mut items: Vec<Notification>, unread: u64) -> Self {
        items.retain(|n| !n.read);
        items.truncate(BADGE_LIMIT);
        let unread = unread.max(items.len() as u64);
        let seen = items.iter().map(|n| (n.id, true)).collect();
        Self {
            items,
            unread,
            seen,
            error: None,
        }
    }

    /// Badge whose initial load failed.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            error: Some(LOAD_ERROR.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    #[must_use]
    pub const fn unread(&self) -> u64 {
        self.unread
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fold one change. Returns whether the state changed.
    pub fn apply(&mut self, change: &NotificationChange) -> bool {
        let row = &change.row;
        match change.op {
            ChangeOp::Insert => {
                if row.read || self.seen.contains_key(&row.id) {
                    return false;
                }
                self.seen.insert(row.id, true);
                self.items.insert(0, row.clone());
                self.items.truncate(BADGE_LIMIT);
                self.unread += 1;
                true
            }
            ChangeOp::Update => {
                if !row.read || self.seen.insert(row.id, false) == Some(false) {
                    return false;
                }
                self.items.retain(|n| n.id != row.id);
                self.unread = self.unread.saturating_sub(1);
                true
            }
        }
    }
}

/// Unread `general` (feedback) notifications as a bare count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackCounter {
    count: u64,
}

impl FeedbackCounter {
    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self { count }
    }

    #[must_use]
    pub const fn count(self) -> u64 {
        self.count
    }

    /// Fold one change. Returns whether the count changed.
    pub fn apply(&mut self, change: &NotificationChange) -> bool {
        let row = &change.row;
        if row.kind != NotificationType::General {
            return false;
        }
        match (change.op, row.read) {
            (ChangeOp::Insert, false) => {
                self.count += 1;
                true
            }
            (ChangeOp::Update, true) => {
                let before = self.count;
                self.count = self.count.saturating_sub(1);
                before != self.count
            }
            _ => false,
        }
    }
}

/// Bell item as sent to the browser.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BadgeItem {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub date: DateTime<Utc>,
}

impl From<&Notification> for BadgeItem {
    fn from(n: &Notification) -> Self {
        let message = strip_leading_tag(&n.message);
        Self {
            id: n.id,
            title: format!("{} update", n.kind),
            message: if message.trim().is_empty() {
                "No details provided.".to_string()
            } else {
                message.to_string()
            },
            date: n.date,
        }
    }
}

/// JSON payload of each SSE event.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BadgeState {
    pub items: Vec<BadgeItem>,
    pub unread: u64,
    pub feedback_unread: u64,
    pub error: Option<String>,
}

impl BadgeState {
    #[must_use]
    pub fn new(badge: &NotificationBadge, feedback: FeedbackCounter) -> Self {
        Self {
            items: badge.items().iter().map(BadgeItem::from).collect(),
            unread: badge.unread(),
            feedback_unread: feedback.count(),
            error: badge.error.clone(),
        }
    }
}
