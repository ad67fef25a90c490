//! ICT Asset Desk Core - Shared domain types.
//!
//! This crate provides the types used across the asset desk components:
//! - `dashboard` - Role-gated web dashboard for admins, assistants, and staff
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encoding is available behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Role model, ID newtypes, emails, statuses, correlation tags,
//!   and the redirect outcome convention

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
