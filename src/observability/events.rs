//! Security event logging
//!
//! Authentication, authorization and account-management events are emitted
//! through [`security_event!`] so every record carries the same
//! `security_event`, `category` and `severity` fields.
//!
//! ```ignore
//! use tutorhub::observability::SecurityEvent;
//!
//! tutorhub::security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     identifier = %email,
//!     "Login failed"
//! );
//! ```

use std::fmt;

/// Security-relevant events of the access-control core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    /// Credentials verified
    AuthenticationSuccess,
    /// Credentials rejected
    AuthenticationFailure,
    /// Identity attached to a session
    SessionCreated,
    /// Identity removed from a session
    SessionDestroyed,
    /// Navigation to a section allowed
    AccessGranted,
    /// Navigation to a section denied and redirected
    AccessDenied,
    /// New account created
    UserRegistered,
    /// Profile fields changed
    UserModified,
    /// Account deleted by an administrator
    UserDeleted,
    /// Secret changed
    PasswordChanged,
    /// Identifier locked after repeated failures
    AccountLocked,
    /// Identifier unlocked by an administrator
    AccountUnlocked,
    /// Theme or language changed
    PreferencesChanged,
    /// Process started
    SystemStartup,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess
            | Self::AuthenticationFailure
            | Self::SessionCreated
            | Self::SessionDestroyed => "authentication",

            Self::AccessGranted | Self::AccessDenied => "authorization",

            Self::UserRegistered
            | Self::UserModified
            | Self::UserDeleted
            | Self::PasswordChanged
            | Self::PreferencesChanged => "user_management",

            Self::AccountLocked | Self::AccountUnlocked => "security",

            Self::SystemStartup => "system",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            Self::AuthenticationFailure | Self::AccountLocked => Severity::High,

            Self::AuthenticationSuccess
            | Self::AccessDenied
            | Self::UserRegistered
            | Self::UserModified
            | Self::UserDeleted
            | Self::PasswordChanged
            | Self::AccountUnlocked => Severity::Medium,

            Self::SessionCreated
            | Self::SessionDestroyed
            | Self::AccessGranted
            | Self::PreferencesChanged
            | Self::SystemStartup => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::SessionCreated => "session_created",
            Self::SessionDestroyed => "session_destroyed",
            Self::AccessGranted => "access_granted",
            Self::AccessDenied => "access_denied",
            Self::UserRegistered => "user_registered",
            Self::UserModified => "user_modified",
            Self::UserDeleted => "user_deleted",
            Self::PasswordChanged => "password_changed",
            Self::AccountLocked => "account_locked",
            Self::AccountUnlocked => "account_unlocked",
            Self::PreferencesChanged => "preferences_changed",
            Self::SystemStartup => "system_startup",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Log a security event with structured fields.
///
/// High severity logs at `warn`, medium at `info`, low at `debug`.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let category = event.category();
        let event_name = event.name();

        match event.severity() {
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use crate::security_event;
