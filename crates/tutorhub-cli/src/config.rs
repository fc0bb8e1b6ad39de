//! Configuration parsing for tutorhub.toml
//!
//! Every section and key is optional; anything left out keeps the library
//! default. Durations and sizes use the human-readable forms accepted by
//! [`tutorhub::parse_duration`] and [`tutorhub::parse_size`].
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8080"
//! request_timeout = "30s"
//! max_request_size = "64KB"
//! cors_origins = ["https://app.example.com"]
//!
//! [store]
//! path = "/var/lib/tutorhub/users.json"
//! password_policy = "strict"
//!
//! [lockout]
//! enabled = true
//! max_attempts = 5
//! window = "30m"
//! duration = "15m"
//!
//! [logging]
//! format = "json"
//! filter = "tutorhub=info,tower_http=info"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use tutorhub::observability::{LogFormat, ObservabilityConfig};
use tutorhub::password::PasswordPolicy;
use tutorhub::{parse_duration, parse_size, LockoutPolicy, TutorhubConfig};

use crate::error::{CliError, Result};

/// Root configuration structure for tutorhub.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub lockout: LockoutSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// HTTP server settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub request_timeout: Option<String>,
    pub max_request_size: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub security_headers: Option<bool>,
    pub tracing: Option<bool>,
}

/// Credential store settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    pub path: Option<PathBuf>,
    /// "standard", "strict" or "minimal"
    pub password_policy: Option<String>,
}

/// Failed-login lockout settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockoutSection {
    #[serde(default)]
    pub enabled: bool,
    pub max_attempts: Option<u32>,
    pub window: Option<String>,
    pub duration: Option<String>,
}

/// Log output settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// "pretty", "json" or "compact"
    pub format: Option<String>,
    pub filter: Option<String>,
}

impl CliConfig {
    /// Load configuration from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CliError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from a string
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| CliError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Overlay the file's settings on `base`
    pub fn apply(&self, base: TutorhubConfig) -> Result<TutorhubConfig> {
        let mut config = base;
        let server = &self.server;

        if let Some(bind) = &server.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(raw) = &server.request_timeout {
            config.request_timeout = duration("server.request_timeout", raw)?;
        }
        if let Some(raw) = &server.max_request_size {
            config.max_request_size = parse_size(raw)
                .ok_or_else(|| CliError::invalid("server.max_request_size", raw.as_str()))?;
        }
        if let Some(origins) = &server.cors_origins {
            config.cors_origins = origins.clone();
        }
        if let Some(enabled) = server.security_headers {
            config.security_headers_enabled = enabled;
        }
        if let Some(enabled) = server.tracing {
            config.tracing_enabled = enabled;
        }

        if let Some(path) = &self.store.path {
            config.store_path = Some(path.clone());
        }
        if let Some(name) = &self.store.password_policy {
            if PasswordPolicy::named(name).is_none() {
                return Err(CliError::invalid(
                    "store.password_policy",
                    format!("{:?} (expected standard, strict or minimal)", name),
                ));
            }
            config.password_policy = name.clone();
        }

        if self.lockout.enabled {
            let base = config.lockout.clone().unwrap_or_default();
            let mut policy = LockoutPolicy::builder()
                .max_attempts(self.lockout.max_attempts.unwrap_or(base.max_attempts))
                .attempt_window(base.attempt_window)
                .lockout_duration(base.lockout_duration);
            if let Some(raw) = &self.lockout.window {
                policy = policy.attempt_window(duration("lockout.window", raw)?);
            }
            if let Some(raw) = &self.lockout.duration {
                policy = policy.lockout_duration(duration("lockout.duration", raw)?);
            }
            config.lockout = Some(policy.build());
        }

        Ok(config)
    }

    /// Logging configuration, with `fallback_filter` when none is set
    pub fn observability(&self, fallback_filter: &str) -> Result<ObservabilityConfig> {
        let mut builder = ObservabilityConfig::builder()
            .log_filter(self.logging.filter.as_deref().unwrap_or(fallback_filter));
        if let Some(name) = &self.logging.format {
            let format = LogFormat::parse(name)
                .ok_or_else(|| CliError::invalid("logging.format", name.as_str()))?;
            builder = builder.log_format(format);
        }
        Ok(builder.build())
    }
}

fn duration(field: &str, raw: &str) -> Result<std::time::Duration> {
    parse_duration(raw).ok_or_else(|| CliError::invalid(field, format!("{:?} is not a duration", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(toml: &str) -> CliConfig {
        CliConfig::parse(toml, Path::new("tutorhub.toml")).unwrap()
    }

    #[test]
    fn test_empty_config_keeps_defaults() {
        let config = parse("").apply(TutorhubConfig::default()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert!(config.store_path.is_none());
        assert!(config.lockout.is_none());
    }

    #[test]
    fn test_full_config() {
        let file = parse(
            r#"
[server]
bind = "0.0.0.0:8080"
request_timeout = "10s"
max_request_size = "32KB"
cors_origins = ["https://app.example.com"]
security_headers = false

[store]
path = "users.json"
password_policy = "strict"

[lockout]
enabled = true
max_attempts = 3
duration = "5m"

[logging]
format = "json"
filter = "debug"
"#,
        );

        let config = file.apply(TutorhubConfig::default()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_request_size, 32 * 1024);
        assert_eq!(config.cors_origins, vec!["https://app.example.com"]);
        assert!(!config.security_headers_enabled);
        assert_eq!(config.store_path, Some(PathBuf::from("users.json")));
        assert_eq!(config.password_policy(), PasswordPolicy::strict());

        let lockout = config.lockout.unwrap();
        assert_eq!(lockout.max_attempts, 3);
        assert_eq!(lockout.lockout_duration, Duration::from_secs(300));

        let obs = file.observability("info").unwrap();
        assert_eq!(obs.log_format, LogFormat::Json);
        assert_eq!(obs.log_filter, "debug");
    }

    #[test]
    fn test_invalid_values() {
        let bad_duration = parse("[server]\nrequest_timeout = \"whenever\"\n");
        assert!(matches!(
            bad_duration.apply(TutorhubConfig::default()),
            Err(CliError::InvalidValue { .. })
        ));

        let bad_policy = parse("[store]\npassword_policy = \"paranoid\"\n");
        assert!(matches!(
            bad_policy.apply(TutorhubConfig::default()),
            Err(CliError::InvalidValue { .. })
        ));

        let bad_format = parse("[logging]\nformat = \"xml\"\n");
        assert!(bad_format.observability("info").is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = CliConfig::parse("[server]\nport = 80\n", Path::new("tutorhub.toml")).unwrap_err();
        assert!(matches!(err, CliError::ConfigParse { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorhub.toml");
        std::fs::write(&path, "[store]\npath = \"data/users.json\"\n").unwrap();

        let file = CliConfig::from_file(&path).unwrap();
        assert_eq!(file.store.path, Some(PathBuf::from("data/users.json")));

        assert!(matches!(
            CliConfig::from_file(dir.path().join("missing.toml")),
            Err(CliError::ConfigRead { .. })
        ));
    }
}
