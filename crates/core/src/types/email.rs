//! Email addresses typed into the sign-in, registration and invite forms.

use std::fmt;

use serde::Serialize;

/// Why a form's email field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    #[error("Email is required.")]
    Missing,
    #[error("Enter a valid email address.")]
    Malformed,
}

impl EmailError {
    /// Outcome code used when a form action redirects with this error.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Missing => "missing_email",
            Self::Malformed => "invalid_email",
        }
    }
}

/// A trimmed, lowercased address with one `@`, a non-empty local part and
/// a dotted domain.
///
/// ```
/// use ict_assets_core::{Email, EmailError};
///
/// let email = Email::parse(Some("  Aminah@Agency.Gov.My ")).unwrap();
/// assert_eq!(email.as_str(), "aminah@agency.gov.my");
/// assert_eq!(email.login_id(), "aminah");
///
/// assert_eq!(Email::parse(Some("  ")), Err(EmailError::Missing));
/// assert_eq!(Email::parse(Some("aminah")), Err(EmailError::Malformed));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate an optional form field.
    ///
    /// # Errors
    ///
    /// [`EmailError::Missing`] for an absent or blank field,
    /// [`EmailError::Malformed`] for anything that is not `local@domain.tld`.
    pub fn parse(raw: Option<&str>) -> Result<Self, EmailError> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Err(EmailError::Missing);
        }
        if value.len() > Self::MAX_LENGTH || value.chars().any(char::is_whitespace) {
            return Err(EmailError::Malformed);
        }

        let (local, domain) = value.split_once('@').ok_or(EmailError::Malformed)?;
        let domain_ok = !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains("..");
        if local.is_empty() || !domain_ok {
            return Err(EmailError::Malformed);
        }

        Ok(Self(value.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the `@`, shown as the login id in the user list.
    #[must_use]
    pub fn login_id(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_agency_addresses() {
        for raw in ["it.helpdesk@agency.gov.my", "a+tag@unit.example.org", "x@y.co"] {
            assert!(Email::parse(Some(raw)).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_blank_is_missing() {
        assert_eq!(Email::parse(None), Err(EmailError::Missing));
        assert_eq!(Email::parse(Some("\t ")), Err(EmailError::Missing));
        assert_eq!(EmailError::Missing.code(), "missing_email");
    }

    #[test]
    fn test_rejects_malformed() {
        for raw in [
            "no-at-sign",
            "@agency.gov.my",
            "user@",
            "user@localhost",
            "user@.gov.my",
            "user@agency..my",
            "a@b@c.com",
            "first last@agency.gov.my",
        ] {
            assert_eq!(Email::parse(Some(raw)), Err(EmailError::Malformed), "{raw}");
        }
        assert_eq!(EmailError::Malformed.code(), "invalid_email");
    }

    #[test]
    fn test_rejects_overlong() {
        let long = format!("{}@agency.gov.my", "a".repeat(250));
        assert_eq!(Email::parse(Some(&long)), Err(EmailError::Malformed));
    }

    #[test]
    fn test_login_id_is_local_part() {
        let email = Email::parse(Some("Tech.Lead@Agency.gov.my")).unwrap();
        assert_eq!(email.login_id(), "tech.lead");
        assert_eq!(email.to_string(), "tech.lead@agency.gov.my");
    }
}
