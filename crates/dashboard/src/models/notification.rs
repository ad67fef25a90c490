//! Persisted per-recipient notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ict_assets_core::{NotificationId, NotificationType, UserId};

/// A `notifications` row.
///
/// Also the payload shape of the `notification_changes` change feed, which
/// is why it derives `Deserialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationType,
    #[serde(default)]
    pub read: bool,
    pub date: DateTime<Utc>,
}
