//! Correlation tags embedded in notification messages.
//!
//! A notification about a specific maintenance request or feedback entry
//! starts with `[maintenance:<id>]` or `[feedback:<id>]`. Opening the
//! related record later marks every matching unread notification as read
//! with a substring match on that tag.

use serde::{Deserialize, Serialize};

use super::status::{NotificationType, ParseStatusError};

/// What a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Maintenance,
    Feedback,
}

impl TagKind {
    /// Literal used inside the tag and in API payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::Feedback => "feedback",
        }
    }

    /// Notification type rows of this kind are stored under.
    #[must_use]
    pub const fn notification_type(self) -> NotificationType {
        match self {
            Self::Maintenance => NotificationType::Maintenance,
            Self::Feedback => NotificationType::General,
        }
    }
}

impl std::str::FromStr for TagKind {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "maintenance" => Ok(Self::Maintenance),
            "feedback" => Ok(Self::Feedback),
            _ => Err(ParseStatusError(s.to_owned())),
        }
    }
}

/// A `[kind:id]` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationTag {
    kind: TagKind,
    id: String,
}

impl CorrelationTag {
    /// Build a tag; returns `None` when the id is blank.
    #[must_use]
    pub fn new(kind: TagKind, id: impl AsRef<str>) -> Option<Self> {
        let id = id.as_ref().trim();
        (!id.is_empty()).then(|| Self {
            kind,
            id: id.to_owned(),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> TagKind {
        self.kind
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `ILIKE` pattern matching any message that contains this tag.
    ///
    /// `%`, `_` and `\` inside the id are escaped so only the literal tag
    /// matches.
    #[must_use]
    pub fn like_pattern(&self) -> String {
        let mut escaped = String::with_capacity(self.id.len());
        for c in self.id.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        format!("%[{}:{escaped}]%", self.kind.as_str())
    }
}

/// Message text without a leading `[maintenance:..]` / `[feedback:..]` tag.
#[must_use]
pub fn strip_leading_tag(message: &str) -> &str {
    let trimmed = message.trim_start();
    let Some(rest) = trimmed.strip_prefix('[') else {
        return message;
    };
    let Some((inner, after)) = rest.split_once(']') else {
        return message;
    };
    let is_tag = inner
        .split_once(':')
        .is_some_and(|(kind, id)| kind.parse::<TagKind>().is_ok() && !id.trim().is_empty());
    if is_tag { after.trim_start() } else { message }
}

impl std::fmt::Display for CorrelationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}]", self.kind.as_str(), self.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let tag = CorrelationTag::new(TagKind::Maintenance, "42").unwrap();
        assert_eq!(tag.to_string(), "[maintenance:42]");
    }

    #[test]
    fn test_blank_id_yields_none() {
        assert!(CorrelationTag::new(TagKind::Feedback, "  ").is_none());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let tag = CorrelationTag::new(TagKind::Feedback, "a_b%c").unwrap();
        assert_eq!(tag.like_pattern(), r"%[feedback:a\_b\%c]%");
    }

    #[test]
    fn test_kind_maps_to_notification_type() {
        assert_eq!(
            TagKind::Maintenance.notification_type(),
            NotificationType::Maintenance
        );
        assert_eq!(
            TagKind::Feedback.notification_type(),
            NotificationType::General
        );
    }

    #[test]
    fn test_strip_leading_tag() {
        assert_eq!(
            strip_leading_tag("[feedback:9b2e] New feedback submitted by Aina."),
            "New feedback submitted by Aina."
        );
        assert_eq!(
            strip_leading_tag("[maintenance:42] New maintenance request."),
            "New maintenance request."
        );
        assert_eq!(strip_leading_tag("[note] keep me"), "[note] keep me");
        assert_eq!(strip_leading_tag("No tag here"), "No tag here");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("feedback".parse::<TagKind>().unwrap(), TagKind::Feedback);
        assert!("Feedback".parse::<TagKind>().is_err());
        assert!("general".parse::<TagKind>().is_err());
    }
}
