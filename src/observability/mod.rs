//! Logging and audit events
//!
//! Application code uses plain `tracing` macros and [`security_event!`];
//! the subscriber is installed once at startup with [`init`].
//!
//! ```ignore
//! use tutorhub::observability::{init, ObservabilityConfig};
//!
//! init(ObservabilityConfig::from_env())?;
//! ```

mod config;
mod events;
mod providers;

pub use config::{LogFormat, ObservabilityConfig, ObservabilityConfigBuilder};
pub use events::{security_event, SecurityEvent, Severity};

use thiserror::Error;

/// Install the tracing subscriber and log an audit startup record.
///
/// Fails if the filter is invalid or a global subscriber is already set.
pub fn init(config: ObservabilityConfig) -> Result<(), ObservabilityError> {
    providers::init_tracing(&config)?;

    crate::security_event!(
        SecurityEvent::SystemStartup,
        log_format = ?config.log_format,
        log_filter = %config.log_filter,
        "Observability initialized"
    );

    Ok(())
}

/// Observability initialization errors
#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// Invalid configuration
    #[error("Observability config error: {0}")]
    Config(String),
    /// Subscriber installation failed
    #[error("Provider error: {0}")]
    Provider(String),
}
