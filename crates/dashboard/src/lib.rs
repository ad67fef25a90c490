//! ICT Asset Desk dashboard library.
//!
//! The server binary and the router tests both build on this crate.
//!
//! # Security
//!
//! The dashboard may hold the identity provider's service role key, which
//! can invite and delete any user. Keep `SUPABASE_SERVICE_ROLE_KEY` out of
//! environments that do not need user administration.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
