//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use ict_assets_core::Role;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Renders blank values as `-`.
///
/// Usage in templates: `{{ asset.department|dash }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn dash(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = value.to_string();
    if text.trim().is_empty() {
        Ok("-".to_string())
    } else {
        Ok(text)
    }
}

/// Human label for a stored role literal; unknown values read as Staff.
///
/// Usage in templates: `{{ user.role|role_label }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn role_label(value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(Role::normalize(Some(&value.to_string())).label())
}
