//! Notification fan-out and mark-read flows.
//!
//! Maintenance requests and feedback notify every admin and admin
//! assistant except the sender. Each message carries a correlation tag so
//! opening the related record can mark all of its notifications read.

use sqlx::PgPool;
use thiserror::Error;

use ict_assets_core::{CorrelationTag, MaintenanceId, NotificationType, TagKind, UserId};

use crate::db::{NotificationRepository, ProfileRepository, RepositoryError};

/// Errors from notification flows.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The privileged credential is not configured.
    #[error("Service role key missing")]
    MissingServiceKey,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl NotifyError {
    /// Message returned to API callers.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingServiceKey => self.to_string(),
            Self::Repository(e) => e.user_message(),
        }
    }
}

/// Display name used in notification text.
#[must_use]
pub fn sender_name(full_name: Option<&str>, email: Option<&str>) -> String {
    [full_name, email]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Someone")
        .to_string()
}

/// Compose the notification text for a new maintenance request or feedback.
///
/// The `[kind:id]` prefix is added only when `id` is non-blank; the
/// `: title` part only for maintenance with a non-blank title.
#[must_use]
pub fn compose_message(kind: TagKind, sender: &str, title: Option<&str>, id: Option<&str>) -> String {
    let prefix = id
        .and_then(|id| CorrelationTag::new(kind, id))
        .map(|tag| format!("{tag} "))
        .unwrap_or_default();

    match kind {
        TagKind::Maintenance => {
            let title = title
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| format!(": {t}"))
                .unwrap_or_default();
            format!("{prefix}New maintenance request{title} from {sender}.")
        }
        TagKind::Feedback => format!("{prefix}New feedback submitted by {sender}."),
    }
}

/// What a fan-out is about.
#[derive(Debug, Clone)]
pub struct Announcement<'a> {
    pub kind: TagKind,
    pub title: Option<&'a str>,
    /// Id of the maintenance request or feedback row, for the tag.
    pub subject_id: Option<&'a str>,
}

/// Notification flows over the database.
pub struct NotificationService<'a> {
    pool: &'a PgPool,
    privileged: bool,
}

impl<'a> NotificationService<'a> {
    /// `privileged` is whether the service role key is configured.
    #[must_use]
    pub const fn new(pool: &'a PgPool, privileged: bool) -> Self {
        Self { pool, privileged }
    }

    const fn require_privileged(&self) -> Result<(), NotifyError> {
        if self.privileged {
            Ok(())
        } else {
            Err(NotifyError::MissingServiceKey)
        }
    }

    /// Notify every manager except the sender. Returns the recipient count.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingServiceKey` without the privileged
    /// credential, or the repository error on database failure.
    #[tracing::instrument(skip(self, sender_email, announcement), fields(kind = announcement.kind.as_str()))]
    pub async fn announce(
        &self,
        sender: UserId,
        sender_email: Option<&str>,
        announcement: &Announcement<'_>,
    ) -> Result<u64, NotifyError> {
        let profiles = ProfileRepository::new(self.pool);
        let profile = profiles.get(sender).await?;
        let name = sender_name(
            profile.as_ref().and_then(|p| p.full_name.as_deref()),
            sender_email,
        );
        let message = compose_message(
            announcement.kind,
            &name,
            announcement.title,
            announcement.subject_id,
        );

        self.require_privileged()?;

        let recipients = profiles.manager_ids_except(sender).await?;
        if recipients.is_empty() {
            return Ok(0);
        }

        let count = NotificationRepository::new(self.pool)
            .insert_for(&recipients, &message, announcement.kind.notification_type())
            .await?;
        tracing::info!(count, "Notifications sent");
        Ok(count)
    }

    /// Mark the caller's unread notifications of `kind` read, narrowed to
    /// one record when `subject_id` is given.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingServiceKey` without the privileged
    /// credential, or the repository error on database failure.
    pub async fn mark_read_for(
        &self,
        user: UserId,
        kind: TagKind,
        subject_id: Option<&str>,
    ) -> Result<u64, NotifyError> {
        self.require_privileged()?;
        let pattern = subject_id
            .and_then(|id| CorrelationTag::new(kind, id))
            .map(|tag| tag.like_pattern());

        Ok(NotificationRepository::new(self.pool)
            .mark_read_for_user(user, kind.notification_type(), pattern.as_deref())
            .await?)
    }

    /// Mark every recipient's notifications about a maintenance request read.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingServiceKey` without the privileged
    /// credential, or the repository error on database failure.
    pub async fn clear_maintenance(&self, id: MaintenanceId) -> Result<u64, NotifyError> {
        self.require_privileged()?;
        let Some(tag) = CorrelationTag::new(TagKind::Maintenance, id.to_string()) else {
            return Ok(0);
        };

        Ok(NotificationRepository::new(self.pool)
            .mark_read_for_all(NotificationType::Maintenance, &tag.like_pattern())
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_maintenance_message_with_tag_and_title() {
        assert_eq!(
            compose_message(TagKind::Maintenance, "Aina", Some("Laptop"), Some("42")),
            "[maintenance:42] New maintenance request: Laptop from Aina."
        );
    }

    #[test]
    fn test_maintenance_message_without_id_or_title() {
        assert_eq!(
            compose_message(TagKind::Maintenance, "Aina", Some("  "), None),
            "New maintenance request from Aina."
        );
    }

    #[test]
    fn test_feedback_message_ignores_title() {
        assert_eq!(
            compose_message(TagKind::Feedback, "Someone", Some("ignored"), Some("f-1")),
            "[feedback:f-1] New feedback submitted by Someone."
        );
    }

    #[test]
    fn test_sender_name_fallbacks() {
        assert_eq!(sender_name(Some("Aina"), Some("a@x.my")), "Aina");
        assert_eq!(sender_name(Some(" "), Some("a@x.my")), "a@x.my");
        assert_eq!(sender_name(None, None), "Someone");
    }

    #[test]
    fn test_missing_key_message() {
        assert_eq!(
            NotifyError::MissingServiceKey.user_message(),
            "Service role key missing"
        );
    }
}
