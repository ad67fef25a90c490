//! Core types for the asset desk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod outcome;
pub mod role;
pub mod status;
pub mod tag;

pub use email::{Email, EmailError};
pub use id::*;
pub use outcome::{ActionOutcome, Toast, ToastScope, ToastVariant};
pub use role::{ParseRoleError, Role, role_to_path};
pub use status::{MaintenanceStatus, NotificationType, ParseStatusError};
pub use tag::{CorrelationTag, TagKind, strip_leading_tag};
