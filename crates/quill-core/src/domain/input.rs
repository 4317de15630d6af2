//! Post input validation.
//!
//! Requests are checked here before any stored post is loaded, so a rejected
//! request never touches the repository.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::DomainError;

/// Maximum title length, in characters.
pub const TITLE_MAX_CHARS: usize = 255;

/// Which operation the input is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Create,
    Update,
}

/// Unvalidated post fields as received from a client.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_draft: Option<bool>,
    /// Outer `None`: field absent. `Some(None)`: explicit null.
    pub published_at: Option<Option<String>>,
}

/// Post fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPost {
    pub title: String,
    pub content: String,
    pub is_draft: Option<bool>,
    /// Outer `None`: leave unchanged. `Some(None)`: clear.
    pub published_at: Option<Option<DateTime<Utc>>>,
}

impl PostInput {
    /// Validate every field, collecting one message per failing field.
    pub fn validate(self, mode: InputMode) -> Result<ValidatedPost, DomainError> {
        let mut errors = Vec::new();

        let title = required_string("title", self.title, &mut errors);
        if let Some(title) = &title {
            if title.chars().count() > TITLE_MAX_CHARS {
                errors.push(format!(
                    "The title field must not be greater than {TITLE_MAX_CHARS} characters."
                ));
            }
        }

        let content = required_string("content", self.content, &mut errors);

        if mode == InputMode::Update && self.is_draft.is_none() {
            errors.push("The is draft field is required.".to_string());
        }

        let published_at = match self.published_at {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.trim().is_empty() => Some(None),
            Some(Some(raw)) => match parse_datetime(&raw) {
                Some(at) => Some(Some(at)),
                None => {
                    errors.push("The published at field must be a valid date.".to_string());
                    None
                }
            },
        };

        match (title, content) {
            (Some(title), Some(content)) if errors.is_empty() => Ok(ValidatedPost {
                title,
                content,
                is_draft: self.is_draft,
                published_at,
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}

fn required_string(field: &str, value: Option<String>, errors: &mut Vec<String>) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.push(format!("The {field} field is required."));
            None
        }
    }
}

/// Parse a client-supplied date-time. Values without an offset are read as UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(title: &str, content: &str) -> PostInput {
        PostInput {
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    fn messages(err: DomainError) -> Vec<String> {
        match err {
            DomainError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_requires_title_and_content() {
        let err = PostInput::default().validate(InputMode::Create).unwrap_err();
        let errors = messages(err);

        assert_eq!(
            errors,
            vec![
                "The title field is required.".to_string(),
                "The content field is required.".to_string(),
            ]
        );
    }

    #[test]
    fn test_blank_title_counts_as_missing() {
        let err = input("   ", "Body").validate(InputMode::Create).unwrap_err();
        assert_eq!(messages(err), vec!["The title field is required.".to_string()]);
    }

    #[test]
    fn test_title_length_limit() {
        let at_limit = "a".repeat(TITLE_MAX_CHARS);
        assert!(input(&at_limit, "Body").validate(InputMode::Create).is_ok());

        let too_long = "a".repeat(TITLE_MAX_CHARS + 1);
        let err = input(&too_long, "Body").validate(InputMode::Create).unwrap_err();
        assert_eq!(messages(err).len(), 1);
    }

    #[test]
    fn test_title_limit_counts_characters_not_bytes() {
        let accented = "é".repeat(TITLE_MAX_CHARS);
        assert!(input(&accented, "Body").validate(InputMode::Create).is_ok());
    }

    #[test]
    fn test_update_requires_draft_flag() {
        let err = input("T", "C").validate(InputMode::Update).unwrap_err();
        assert_eq!(messages(err), vec!["The is draft field is required.".to_string()]);

        let ok = PostInput {
            is_draft: Some(false),
            ..input("T", "C")
        }
        .validate(InputMode::Update)
        .unwrap();
        assert_eq!(ok.is_draft, Some(false));
    }

    #[test]
    fn test_published_at_tri_state() {
        let absent = input("T", "C").validate(InputMode::Create).unwrap();
        assert_eq!(absent.published_at, None);

        let null = PostInput {
            published_at: Some(None),
            ..input("T", "C")
        }
        .validate(InputMode::Create)
        .unwrap();
        assert_eq!(null.published_at, Some(None));

        let empty = PostInput {
            published_at: Some(Some(String::new())),
            ..input("T", "C")
        }
        .validate(InputMode::Create)
        .unwrap();
        assert_eq!(empty.published_at, Some(None));
    }

    #[test]
    fn test_invalid_published_at_is_rejected() {
        let err = PostInput {
            published_at: Some(Some("next tuesday".to_string())),
            ..input("T", "C")
        }
        .validate(InputMode::Create)
        .unwrap_err();

        assert_eq!(
            messages(err),
            vec!["The published at field must be a valid date.".to_string()]
        );
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        assert_eq!(parse_datetime("2024-05-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01 12:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01T12:30:00"), Some(expected));
        assert_eq!(
            parse_datetime("2024-05-01"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_datetime("2024-13-01"), None);
    }

    #[test]
    fn test_values_are_trimmed() {
        let validated = input("  Hello  ", "\nBody\n").validate(InputMode::Create).unwrap();
        assert_eq!(validated.title, "Hello");
        assert_eq!(validated.content, "Body");
    }
}
