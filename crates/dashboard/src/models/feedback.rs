//! Feedback submitted by staff and admin assistants.

use chrono::{DateTime, Utc};

use ict_assets_core::{FeedbackId, Role, UserId};

/// Insert payload for a feedback row.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub message: String,
    pub role: Role,
    pub created_by: UserId,
    pub email: Option<String>,
}

/// A feedback row joined with its author's profile name.
#[derive(Debug, Clone)]
pub struct FeedbackEntry {
    pub id: FeedbackId,
    pub message: String,
    pub role: Option<String>,
    pub created_by: Option<UserId>,
    pub email: Option<String>,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedbackEntry {
    /// Profile name, then the email stored on the row.
    ///
    /// Callers fall back to the identity provider and finally `Staff member`.
    #[must_use]
    pub fn known_author(&self) -> Option<&str> {
        [self.author_name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}
