//! Observability Configuration

use std::env;

/// Log output format
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    #[default]
    Pretty,
    /// JSON format for production/log aggregation
    Json,
    /// Compact single-line format
    Compact,
}

impl LogFormat {
    /// Parse a format name; unknown names yield `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log output format
    pub log_format: LogFormat,
    /// Log level filter (e.g., "info", "tutorhub=debug,tower_http=info")
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Create configuration from environment variables.
    ///
    /// - `LOG_FORMAT`: "pretty", "json", or "compact" (default: "pretty")
    /// - `RUST_LOG`: Log filter directive (default: "info")
    pub fn from_env() -> Self {
        let log_format = env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or_default();

        let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            log_format,
            log_filter,
        }
    }

    /// Create a new configuration builder
    pub fn builder() -> ObservabilityConfigBuilder {
        ObservabilityConfigBuilder::default()
    }
}

/// Builder for ObservabilityConfig
#[derive(Default)]
pub struct ObservabilityConfigBuilder {
    config: ObservabilityConfig,
}

impl ObservabilityConfigBuilder {
    /// Set the log format
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.log_format = format;
        self
    }

    /// Set the log filter
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> ObservabilityConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("compact"), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_builder() {
        let config = ObservabilityConfig::builder()
            .log_format(LogFormat::Json)
            .log_filter("tutorhub=debug")
            .build();

        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_filter, "tutorhub=debug");
    }
}
