//! Profile input validation
//!
//! Names and emails are checked before anything reaches the credential
//! store. Emails are also normalized here, so lookups and the uniqueness
//! check always see the same form.

use std::fmt;

/// Validation error with field context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation
    pub field: String,
    /// Error code for programmatic handling
    pub code: ValidationErrorCode,
    /// Human-readable message
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for a specific field
    pub fn for_field(
        field: impl Into<String>,
        code: ValidationErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// Value is required but missing/empty
    Required,
    /// Value is too long
    TooLong,
    /// Value contains control characters
    InvalidCharacters,
    /// Email format is invalid
    InvalidEmail,
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::TooLong => write!(f, "too_long"),
            Self::InvalidCharacters => write!(f, "invalid_characters"),
            Self::InvalidEmail => write!(f, "invalid_email"),
        }
    }
}

/// Longest accepted first or last name, in characters
pub const MAX_NAME_LENGTH: usize = 100;

/// Canonical form of an email: trimmed and ASCII-lowercased
pub fn normalize_email(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// Validate a first or last name
pub fn validate_name(value: &str, field: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::Required,
            "Field is required",
        ));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooLong,
            format!("Must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::InvalidCharacters,
            "Control characters are not allowed",
        ));
    }
    Ok(())
}

/// Validate email format
///
/// Pragmatic checks only; deliverability is not verified.
/// - exactly one `@`
/// - local part: 1-64 chars, no leading/trailing/consecutive dots
/// - domain: 1-255 chars, at least one dot, letters/digits/dots/hyphens
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    let invalid = |message: &str| {
        ValidationError::for_field("email", ValidationErrorCode::InvalidEmail, message)
    };

    let (local, domain) = match value.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => return Err(invalid("Invalid email format")),
    };

    if local.is_empty() || local.len() > 64 {
        return Err(invalid("Invalid email local part"));
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(invalid("Invalid email local part"));
    }
    if local.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("Invalid email local part"));
    }

    if domain.is_empty() || domain.len() > 255 || !domain.contains('.') {
        return Err(invalid("Invalid email domain"));
    }
    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err(invalid("Invalid email domain"));
    }
    if !domain.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '-') {
        return Err(invalid("Invalid email domain characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("jane.doe+tutor@school.edu.vn").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        for bad in [
            "",
            "jane",
            "jane@",
            "@example.com",
            "jane@@example.com",
            "jane@example",
            ".jane@example.com",
            "ja..ne@example.com",
            "jane@exa_mple.com",
            "jane doe@example.com",
            "jane@example..com",
        ] {
            let err = validate_email(bad).unwrap_err();
            assert_eq!(err.code, ValidationErrorCode::InvalidEmail, "{:?}", bad);
        }
    }

    #[test]
    fn test_names() {
        assert!(validate_name("Jane", "first_name").is_ok());
        assert!(validate_name("Nguyễn", "last_name").is_ok());

        let err = validate_name("   ", "first_name").unwrap_err();
        assert_eq!(err.code, ValidationErrorCode::Required);
        assert_eq!(err.field, "first_name");

        let long = "a".repeat(MAX_NAME_LENGTH + 1);
        assert_eq!(
            validate_name(&long, "last_name").unwrap_err().code,
            ValidationErrorCode::TooLong
        );

        assert_eq!(
            validate_name("Ja\u{0}ne", "first_name").unwrap_err().code,
            ValidationErrorCode::InvalidCharacters
        );
    }
}
