//! Domain models for the dashboard.
//!
//! Repositories in [`crate::db`] map database rows into these types;
//! handlers and services only ever see the typed form.

pub mod asset;
pub mod feedback;
pub mod maintenance;
pub mod notification;
pub mod profile;
pub mod session;

pub use asset::{Asset, AssetInput, Category};
pub use feedback::{FeedbackEntry, NewFeedback};
pub use maintenance::{MaintenanceRequest, NewMaintenanceRequest};
pub use notification::Notification;
pub use profile::Profile;
pub use session::{CurrentUser, Viewer, keys as session_keys};
