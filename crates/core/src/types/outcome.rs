//! Post-action redirect outcomes and the toasts they produce.
//!
//! Every mutating form performs one change, then redirects back to a page
//! with exactly one outcome flag in the query string (`saved=1`,
//! `updated=1`, `deleted=1`, `invited=1`, `qr=1`, or `error=<message>`).
//! The destination page reads the flag once and renders a toast keyed by a
//! deterministic id so the same navigation never shows it twice.
//!
//! Producers and consumers both go through [`ActionOutcome`], so the set of
//! flags cannot drift between them.

use std::collections::HashMap;

use serde::Serialize;

/// Error code substituted when a failure carries no message.
pub const UNKNOWN_ERROR: &str = "unknown_error";

/// Terminal result of a form action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Saved,
    Updated,
    Deleted,
    Invited,
    QrGenerated,
    /// A validation code (`missing_email`) or a backend message, verbatim.
    Error(String),
}

impl ActionOutcome {
    /// Build an error outcome. Blank messages become [`UNKNOWN_ERROR`].
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Error(UNKNOWN_ERROR.to_owned())
        } else {
            Self::Error(message)
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Query parameter name carrying this outcome.
    #[must_use]
    pub const fn param(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Invited => "invited",
            Self::QrGenerated => "qr",
            Self::Error(_) => "error",
        }
    }

    /// The `name=value` pair, with error text percent-encoded.
    #[must_use]
    pub fn query_pair(&self) -> String {
        match self {
            Self::Error(message) => format!("error={}", urlencoding::encode(message)),
            other => format!("{}=1", other.param()),
        }
    }

    /// Redirect target: `base` plus this outcome's flag.
    #[must_use]
    pub fn redirect_to(&self, base: &str) -> String {
        self.redirect_with(base, &[])
    }

    /// Redirect target with extra parameters after the outcome flag.
    ///
    /// Extra parameters with blank values are skipped.
    #[must_use]
    pub fn redirect_with(&self, base: &str, extra: &[(&str, &str)]) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        let mut target = format!("{base}{separator}{}", self.query_pair());
        for (name, value) in extra {
            if value.trim().is_empty() {
                continue;
            }
            target.push('&');
            target.push_str(name);
            target.push('=');
            target.push_str(&urlencoding::encode(value));
        }
        target
    }

    /// Read the outcome back from already-decoded query parameters.
    ///
    /// An error always wins over success flags. Blank values are ignored.
    #[must_use]
    pub fn from_query(params: &HashMap<String, String>) -> Option<Self> {
        let present = |name: &str| params.get(name).is_some_and(|v| !v.trim().is_empty());

        if let Some(message) = params.get("error").filter(|v| !v.trim().is_empty()) {
            return Some(Self::Error(message.clone()));
        }
        [
            Self::Deleted,
            Self::Updated,
            Self::Invited,
            Self::QrGenerated,
            Self::Saved,
        ]
        .into_iter()
        .find(|outcome| present(outcome.param()))
    }

    const fn key(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Invited => "invited",
            Self::QrGenerated => "generated",
            Self::Error(_) => "error",
        }
    }
}

/// Which page family a toast belongs to. Prefixes the toast id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastScope {
    Asset,
    Maintenance,
    MaintenanceRequest,
    Qr,
    Users,
    Feedback,
    Account,
}

impl ToastScope {
    const fn key(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Maintenance => "maintenance",
            Self::MaintenanceRequest => "maintenance-request",
            Self::Qr => "qr",
            Self::Users => "users",
            Self::Feedback => "feedback",
            Self::Account => "account",
        }
    }

    const fn fallback_error(self) -> &'static str {
        match self {
            Self::Maintenance => "Unable to update maintenance status.",
            Self::MaintenanceRequest => "Unable to submit the maintenance request.",
            Self::Qr => "Unable to generate QR code.",
            Self::Users => "Unable to complete action.",
            Self::Feedback => "Unable to send feedback.",
            Self::Asset | Self::Account => "Something went wrong.",
        }
    }

    fn success_text(self, outcome: &ActionOutcome) -> (&'static str, &'static str) {
        match (self, outcome) {
            (Self::Asset, ActionOutcome::Deleted) => {
                ("Asset removed", "Asset removed successfully.")
            }
            (Self::Asset, _) => ("Update saved", "Your asset changes have been stored."),
            (Self::Maintenance, _) => (
                "Status updated",
                "Maintenance status updated successfully.",
            ),
            (Self::MaintenanceRequest, _) => {
                ("Request submitted", "Request submitted successfully.")
            }
            (Self::Qr, _) => ("QR code updated", "QR code stored for the selected asset."),
            (Self::Users, ActionOutcome::Invited) => {
                ("Invite sent", "Invitation email sent successfully.")
            }
            (Self::Users, ActionOutcome::Deleted) => {
                ("User removed", "User removed from the system.")
            }
            (Self::Users, _) => ("Role updated", "User role updated successfully."),
            (Self::Feedback, _) => ("Feedback sent", "Feedback submitted. Thank you!"),
            (Self::Account, _) => ("Account updated", "Your account has been updated."),
        }
    }
}

/// Visual style of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Success,
    Warning,
    Error,
}

impl ToastVariant {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A one-shot notice rendered on the destination page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    /// Deterministic id, e.g. `asset-error` or `users-invited`.
    pub id: String,
    pub title: String,
    pub message: String,
    pub variant: ToastVariant,
}

impl Toast {
    /// Describe `outcome` for a page in `scope`.
    #[must_use]
    pub fn for_outcome(scope: ToastScope, outcome: &ActionOutcome) -> Self {
        let id = format!("{}-{}", scope.key(), outcome.key());
        match outcome {
            ActionOutcome::Error(code) => Self {
                id,
                title: "Action needed".to_owned(),
                message: describe_error(code).unwrap_or_else(|| {
                    if code == UNKNOWN_ERROR {
                        scope.fallback_error().to_owned()
                    } else {
                        code.clone()
                    }
                }),
                variant: ToastVariant::Error,
            },
            success => {
                let (title, message) = scope.success_text(success);
                Self {
                    id,
                    title: title.to_owned(),
                    message: message.to_owned(),
                    variant: if matches!(success, ActionOutcome::Deleted) {
                        ToastVariant::Warning
                    } else {
                        ToastVariant::Success
                    },
                }
            }
        }
    }

    /// Convenience: parse the query and build the toast, if any.
    #[must_use]
    pub fn from_query(scope: ToastScope, params: &HashMap<String, String>) -> Option<Self> {
        ActionOutcome::from_query(params).map(|outcome| Self::for_outcome(scope, &outcome))
    }
}

/// Friendly text for the fixed validation codes.
fn describe_error(code: &str) -> Option<String> {
    let text = match code {
        "missing_required_fields" => "Asset number and asset name are required.",
        "missing_asset_id" => "Select an asset first.",
        "invalid_request" => "The request was incomplete or used an unknown status.",
        "invalid_field" => "One of the fields has an invalid value.",
        "missing_email" => "Enter an email address to send the invite.",
        "invalid_email" => "Enter a valid email address.",
        "missing_user_id" => "No user was selected.",
        "missing_service_role_key" => {
            "User management is disabled: the service role key is not configured."
        }
        "missing_asset" => "Please select an asset.",
        "missing_message" => "Write a message before sending.",
        _ => return None,
    };
    Some(text.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    /// Decode a redirect target the way axum's `Query` extractor would.
    fn parse_target(target: &str) -> HashMap<String, String> {
        let (_, qs) = target.split_once('?').unwrap();
        url::form_urlencoded::parse(qs.as_bytes())
            .into_owned()
            .collect()
    }

    #[test]
    fn test_success_flags() {
        assert_eq!(
            ActionOutcome::Saved.redirect_to("/admin/assets"),
            "/admin/assets?saved=1"
        );
        assert_eq!(
            ActionOutcome::Invited.redirect_to("/admin/users"),
            "/admin/users?invited=1"
        );
        assert_eq!(
            ActionOutcome::Deleted.redirect_to("/staff/x?tab=1"),
            "/staff/x?tab=1&deleted=1"
        );
    }

    #[test]
    fn test_error_is_encoded_and_never_blank() {
        let target = ActionOutcome::error("duplicate key value").redirect_to("/admin/assets");
        assert_eq!(target, "/admin/assets?error=duplicate%20key%20value");

        let blank = ActionOutcome::error("   ").redirect_to("/admin/assets");
        assert_eq!(blank, "/admin/assets?error=unknown_error");
    }

    #[test]
    fn test_error_never_carries_success_flags() {
        for message in ["missing_email", "x", "a&saved=1", "weird ?updated=1"] {
            let target = ActionOutcome::error(message).redirect_to("/admin/users");
            let params = parse_target(&target);
            assert!(!params.get("error").unwrap().is_empty());
            for flag in ["saved", "updated", "deleted", "invited", "qr"] {
                assert!(!params.contains_key(flag), "{target} leaked {flag}");
            }
            assert_eq!(
                ActionOutcome::from_query(&params),
                Some(ActionOutcome::Error(message.to_owned()))
            );
        }
    }

    #[test]
    fn test_redirect_with_extra_params() {
        let target =
            ActionOutcome::QrGenerated.redirect_with("/admin/qr", &[("asset", "abc"), ("q", "")]);
        assert_eq!(target, "/admin/qr?qr=1&asset=abc");

        let target = ActionOutcome::QrGenerated
            .redirect_with("/admin/qr", &[("asset", "abc"), ("q", "dell laptop")]);
        assert_eq!(target, "/admin/qr?qr=1&asset=abc&q=dell%20laptop");
    }

    #[test]
    fn test_from_query_error_wins() {
        let params = query(&[("saved", "1"), ("error", "boom")]);
        assert_eq!(
            ActionOutcome::from_query(&params),
            Some(ActionOutcome::Error("boom".to_owned()))
        );
    }

    #[test]
    fn test_from_query_ignores_blank_values() {
        assert_eq!(ActionOutcome::from_query(&query(&[("error", "")])), None);
        assert_eq!(ActionOutcome::from_query(&query(&[("q", "x")])), None);
    }

    #[test]
    fn test_toast_ids_are_deterministic() {
        let err = Toast::for_outcome(ToastScope::Asset, &ActionOutcome::error("boom"));
        assert_eq!(err.id, "asset-error");
        assert_eq!(err.variant, ToastVariant::Error);
        assert_eq!(err.message, "boom");

        let deleted = Toast::for_outcome(ToastScope::Asset, &ActionOutcome::Deleted);
        assert_eq!(deleted.id, "asset-deleted");
        assert_eq!(deleted.variant, ToastVariant::Warning);

        let saved = Toast::for_outcome(ToastScope::Asset, &ActionOutcome::Saved);
        assert_eq!(saved.id, "asset-saved");
        assert_eq!(saved, Toast::for_outcome(ToastScope::Asset, &ActionOutcome::Saved));
    }

    #[test]
    fn test_toast_maps_known_codes() {
        let toast = Toast::for_outcome(
            ToastScope::Users,
            &ActionOutcome::error("missing_service_role_key"),
        );
        assert!(toast.message.contains("service role key"));

        let toast = Toast::for_outcome(ToastScope::Qr, &ActionOutcome::error(""));
        assert_eq!(toast.message, "Unable to generate QR code.");
    }

    #[test]
    fn test_toast_from_query() {
        let toast = Toast::from_query(ToastScope::Users, &query(&[("invited", "1")])).unwrap();
        assert_eq!(toast.id, "users-invited");
        assert_eq!(toast.title, "Invite sent");
        assert!(Toast::from_query(ToastScope::Users, &query(&[])).is_none());
    }
}
