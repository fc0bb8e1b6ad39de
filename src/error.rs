//! Error types
//!
//! Two layers:
//!
//! - [`AccessError`]: the typed outcome of store, verifier, router and
//!   session operations. Callers match on it; nothing here is meant to
//!   escape to a top-level log only.
//! - [`AppError`]: the HTTP rendering of a failure. It logs internal details
//!   and returns a safe JSON body, so a login failure never reveals whether
//!   the account exists.
//!
//! # Usage
//!
//! ```ignore
//! use tutorhub::error::{AppError, ErrorConfig};
//!
//! tutorhub::error::init(ErrorConfig::from_env());
//!
//! async fn handler() -> Result<String, AppError> {
//!     let user = store.find_by_id(&id).ok_or_else(|| AppError::not_found("User not found"))?;
//!     Ok(user.email)
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::password::PasswordError;
use crate::role::Role;
use crate::router::Section;
use crate::validation::ValidationError;

// ============================================================================
// Domain Errors
// ============================================================================

/// Failure outcomes of the access-control core
#[derive(Debug, Error)]
pub enum AccessError {
    /// Creation or email change collided with an existing account
    #[error("an account with email {email} already exists")]
    DuplicateEmail { email: String },

    /// Unknown account or wrong secret; the two are deliberately one variant
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Navigation outside the role's section table
    #[error("role {role} may not access {section}")]
    UnauthorizedSection { role: Role, section: Section },

    /// A stored or submitted role outside the closed set
    #[error("unknown role {0:?}")]
    UnknownRole(String),

    /// Too many failed attempts for this identifier
    #[error("too many failed login attempts; retry in {retry_after_secs} seconds")]
    LockedOut { retry_after_secs: u64 },

    /// No account with the given identifier
    #[error("no user with id {0}")]
    NotFound(String),

    /// Malformed profile input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Secret rejected by the password policy
    #[error(transparent)]
    WeakSecret(#[from] PasswordError),

    /// A stored hash that is not a valid PHC string
    #[error("stored password hash is malformed: {0}")]
    CorruptHash(String),

    /// Argon2 failed to produce a hash
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Durable storage could not be read or written
    #[error("storage error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another handle already holds the store file
    #[error("credential store {} is already in use", path.display())]
    StoreLocked { path: PathBuf },

    /// Durable storage contained malformed JSON
    #[error("malformed data in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AccessError {
    /// Whether the caller can recover by changing its input and retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEmail { .. }
                | Self::InvalidCredentials
                | Self::UnauthorizedSection { .. }
                | Self::LockedOut { .. }
                | Self::NotFound(_)
                | Self::Validation(_)
                | Self::WeakSecret(_)
        )
    }
}

// ============================================================================
// Error Configuration
// ============================================================================

/// Controls how much detail HTTP error bodies reveal
#[derive(Debug, Clone)]
pub struct ErrorConfig {
    /// Whether to expose detailed error messages
    /// Should be `false` in production
    pub expose_details: bool,

    /// Whether to log errors
    pub log_errors: bool,

    /// Custom message for internal errors in production
    pub internal_error_message: String,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl ErrorConfig {
    /// Production configuration (secure defaults)
    pub fn production() -> Self {
        Self {
            expose_details: false,
            log_errors: true,
            internal_error_message: "An internal error occurred".to_string(),
        }
    }

    /// Development configuration (detailed errors)
    pub fn development() -> Self {
        Self {
            expose_details: true,
            log_errors: true,
            internal_error_message: "Internal server error".to_string(),
        }
    }

    /// Load from environment
    ///
    /// Uses `RUST_ENV` or `APP_ENV`: "development" or "dev" selects the
    /// development config, anything else (or nothing) production.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = lookup("RUST_ENV").or_else(|| lookup("APP_ENV"));

        match env.as_deref().map(str::to_lowercase).as_deref() {
            Some("development" | "dev") => Self::development(),
            _ => Self::production(),
        }
    }
}

static ERROR_CONFIG: std::sync::OnceLock<ErrorConfig> = std::sync::OnceLock::new();

/// Initialize error handling configuration. Later calls are ignored.
pub fn init(config: ErrorConfig) {
    let _ = ERROR_CONFIG.set(config);
}

/// Get the current error configuration
pub fn config() -> &'static ErrorConfig {
    ERROR_CONFIG.get_or_init(ErrorConfig::default)
}

// ============================================================================
// HTTP Errors
// ============================================================================

/// HTTP-facing error with safe rendering
#[derive(Debug)]
pub struct AppError {
    /// Error kind determines HTTP status and handling
    pub kind: ErrorKind,
    /// User-facing message (safe to expose)
    pub message: String,
    /// Internal details (logged, not exposed in production)
    pub details: Option<String>,
    /// Seconds until a locked-out client may retry
    pub retry_after: Option<u64>,
    /// Original error (for logging)
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Error categories with their HTTP status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 401 - authentication failed
    Unauthorized,
    /// 403 - authenticated but not authorized
    Forbidden,
    /// 404
    NotFound,
    /// 409 - resource state conflict
    Conflict,
    /// 422 - validation error
    Validation,
    /// 429 - locked out
    RateLimited,
    /// 500 - hide details
    Internal,
}

impl ErrorKind {
    /// Get the HTTP status code for this error kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether details can be safely exposed for this error kind
    pub fn expose_details(&self) -> bool {
        matches!(self, Self::Validation | Self::NotFound | Self::Conflict)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation_error"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Internal => write!(f, "internal_error"),
        }
    }
}

impl AppError {
    /// Create a new error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            retry_after: None,
            source: None,
        }
    }

    /// Create an unauthorized error (401)
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a forbidden error (403)
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a not found error (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a conflict error (409)
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a validation error (422)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a locked-out error (429) carrying a retry hint
    pub fn locked_out(retry_after_secs: u64) -> Self {
        let mut err = Self::new(ErrorKind::RateLimited, "Too many failed login attempts");
        err.retry_after = Some(retry_after_secs);
        err
    }

    /// Create an internal error (500) with source
    ///
    /// The message is what users see; the source is logged but not exposed.
    pub fn internal(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            details: Some(source.to_string()),
            retry_after: None,
            source: Some(Box::new(source)),
        }
    }

    /// Add internal details (logged but not exposed)
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn log(&self) {
        if !config().log_errors {
            return;
        }

        let details = self.details.as_deref().unwrap_or("none");

        match self.kind {
            ErrorKind::Internal => {
                tracing::error!(
                    error_kind = %self.kind,
                    message = %self.message,
                    details = %details,
                    "Internal error"
                );
            }
            ErrorKind::Unauthorized | ErrorKind::Forbidden | ErrorKind::RateLimited => {
                tracing::warn!(
                    error_kind = %self.kind,
                    message = %self.message,
                    "Auth error"
                );
            }
            _ => {
                tracing::debug!(
                    error_kind = %self.kind,
                    message = %self.message,
                    "Client error"
                );
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// JSON error body
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable message
    pub message: String,
    /// Error details (only in development)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// The body this error renders to under the given configuration
    pub fn to_body(&self, cfg: &ErrorConfig) -> ErrorResponse {
        let message = if cfg.expose_details || self.kind.expose_details() {
            self.message.clone()
        } else {
            match self.kind {
                ErrorKind::Internal => cfg.internal_error_message.clone(),
                ErrorKind::Unauthorized => "invalid credentials".to_string(),
                ErrorKind::Forbidden => "Access denied".to_string(),
                _ => self.message.clone(),
            }
        };

        ErrorResponse {
            error: self.kind.to_string(),
            message,
            details: if cfg.expose_details {
                self.details.clone()
            } else {
                None
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let body = self.to_body(config());
        let mut response = (self.kind.status_code(), Json(body)).into_response();

        if let Some(secs) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::DuplicateEmail { .. } => AppError::conflict(err.to_string()),
            // One message for every credential failure.
            AccessError::InvalidCredentials => AppError::unauthorized("invalid credentials"),
            AccessError::UnauthorizedSection { .. } => {
                AppError::forbidden("Access denied").with_details(err.to_string())
            }
            AccessError::LockedOut { retry_after_secs } => AppError::locked_out(retry_after_secs),
            AccessError::NotFound(_) => AppError::not_found(err.to_string()),
            AccessError::Validation(_) | AccessError::WeakSecret(_) => {
                AppError::validation(err.to_string())
            }
            AccessError::UnknownRole(_)
            | AccessError::CorruptHash(_)
            | AccessError::Hashing(_)
            | AccessError::Io { .. }
            | AccessError::StoreLocked { .. }
            | AccessError::Json { .. } => AppError::internal("Credential store failure", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_status_codes() {
        assert_eq!(ErrorKind::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorKind::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_access_error_mapping() {
        let err: AppError = AccessError::DuplicateEmail {
            email: "jane@example.com".into(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err: AppError = AccessError::InvalidCredentials.into();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, "invalid credentials");

        let err: AppError = AccessError::LockedOut { retry_after_secs: 90 }.into();
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert_eq!(err.retry_after, Some(90));

        let err: AppError = AccessError::UnknownRole("staff".into()).into();
        assert_eq!(err.kind, ErrorKind::Internal);

        let err: AppError = AccessError::StoreLocked {
            path: PathBuf::from("users.json"),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_config_from_lookup() {
        let lookup = |vars: &'static [(&'static str, &'static str)]| {
            move |key: &str| {
                vars.iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.to_string())
            }
        };

        assert!(!ErrorConfig::from_lookup(lookup(&[])).expose_details);
        assert!(!ErrorConfig::from_lookup(lookup(&[("RUST_ENV", "production")])).expose_details);
        assert!(!ErrorConfig::from_lookup(lookup(&[("APP_ENV", "staging")])).expose_details);
        assert!(ErrorConfig::from_lookup(lookup(&[("RUST_ENV", "Development")])).expose_details);
        assert!(ErrorConfig::from_lookup(lookup(&[("APP_ENV", "dev")])).expose_details);
        // RUST_ENV wins over APP_ENV.
        assert!(
            !ErrorConfig::from_lookup(lookup(&[("RUST_ENV", "prod"), ("APP_ENV", "dev")]))
                .expose_details
        );
    }

    #[tokio::test]
    async fn test_response_uses_installed_config() {
        init(ErrorConfig::development());
        let installed = config();
        // Only the first init takes effect.
        init(ErrorConfig::production());
        assert!(std::ptr::eq(installed, config()));

        let err: AppError = AccessError::CorruptHash("bad phc".into()).into();
        let expected = serde_json::to_value(err.to_body(installed)).unwrap();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, expected);
    }

    #[test]
    fn test_production_body_hides_internal_details() {
        let err: AppError = AccessError::CorruptHash("bad phc".into()).into();
        let body = err.to_body(&ErrorConfig::production());
        assert_eq!(body.error, "internal_error");
        assert_eq!(body.message, "An internal error occurred");
        assert!(body.details.is_none());

        let body = err.to_body(&ErrorConfig::development());
        assert!(body.details.unwrap().contains("bad phc"));
    }

    #[test]
    fn test_unauthorized_body_is_generic() {
        let err = AppError::unauthorized("user jane@example.com does not exist");
        let body = err.to_body(&ErrorConfig::production());
        assert_eq!(body.message, "invalid credentials");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(AccessError::InvalidCredentials.is_recoverable());
        assert!(AccessError::DuplicateEmail { email: "a@b.co".into() }.is_recoverable());
        assert!(!AccessError::UnknownRole("staff".into()).is_recoverable());
        assert!(!AccessError::CorruptHash("x".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = AppError::not_found("User not found");
        assert_eq!(format!("{}", err), "not_found: User not found");
    }
}
