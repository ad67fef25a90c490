//! Business logic services for the dashboard.
//!
//! # Services
//!
//! - `badge` - Notification bell state and change application
//! - `identity` - Hosted identity provider client (public and privileged)
//! - `live` - Server-sent badge updates over `LISTEN/NOTIFY`
//! - `notifications` - Manager fan-out and mark-read flows
//! - `qr` - QR image proxy
//! - `reports` - Report metrics, chart payloads and insights

pub mod badge;
pub mod identity;
pub mod live;
pub mod notifications;
pub mod qr;
pub mod reports;

pub use badge::{BadgeState, FeedbackCounter, NotificationBadge, NotificationChange};
pub use identity::{IdentityAdminClient, IdentityClient, IdentityError};
pub use notifications::{Announcement, NotificationService, NotifyError};
pub use qr::{QrError, QrImage};
pub use reports::{ChartSeries, Report, ReportMetrics};
