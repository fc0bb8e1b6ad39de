//! Server and policy configuration
//!
//! One struct covers the HTTP surface, the credential store location and the
//! authentication policies. Values come from `TUTORHUB_*` environment
//! variables, from the builder, or from the CLI's `tutorhub.toml`.

use std::path::PathBuf;
use std::time::Duration;

use crate::login::LockoutPolicy;
use crate::parse::{parse_duration, parse_size};
use crate::password::PasswordPolicy;

/// Runtime configuration of a tutorhub server.
///
/// # Example
///
/// ```ignore
/// use tutorhub::TutorhubConfig;
///
/// // Load from environment variables
/// let config = TutorhubConfig::from_env();
///
/// // Or build programmatically
/// let config = TutorhubConfig::builder()
///     .store_path("/var/lib/tutorhub/users.json")
///     .lockout(LockoutPolicy::strict())
///     .request_timeout(Duration::from_secs(10))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TutorhubConfig {
    /// Socket address the HTTP server binds to
    pub bind_addr: String,

    /// JSON file backing the credential store; `None` keeps users in memory
    pub store_path: Option<PathBuf>,

    /// Password policy name: "standard", "strict" or "minimal"
    pub password_policy: String,

    /// Failed-login lockout; `None` disables it
    pub lockout: Option<LockoutPolicy>,

    /// Maximum request body size in bytes
    pub max_request_size: usize,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// CORS allowed origins
    /// Empty = same-origin only, ["*"] = any origin
    pub cors_origins: Vec<String>,

    /// Add security response headers
    pub security_headers_enabled: bool,

    /// Trace every request
    pub tracing_enabled: bool,
}

impl Default for TutorhubConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            store_path: None,
            password_policy: "standard".to_string(),
            lockout: None,
            max_request_size: 64 * 1024,
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
            security_headers_enabled: true,
            tracing_enabled: true,
        }
    }
}

impl TutorhubConfig {
    /// Relaxed settings for local frontend development.
    ///
    /// Allows any CORS origin. Never use in production.
    pub fn development() -> Self {
        Self {
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(60),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TUTORHUB_BIND`: e.g., "0.0.0.0:8080" (default: "127.0.0.1:3000")
    /// - `TUTORHUB_STORE`: path of the user file (default: in-memory)
    /// - `TUTORHUB_PASSWORD_POLICY`: "standard", "strict", "minimal"
    /// - `TUTORHUB_LOCKOUT_ENABLED`: "true"/"false" (default: "false")
    /// - `TUTORHUB_LOCKOUT_MAX_ATTEMPTS`: failures before lockout (default: 5)
    /// - `TUTORHUB_LOCKOUT_WINDOW`: e.g., "30m"
    /// - `TUTORHUB_LOCKOUT_DURATION`: e.g., "15m"
    /// - `TUTORHUB_MAX_REQUEST_SIZE`: e.g., "64KB"
    /// - `TUTORHUB_REQUEST_TIMEOUT`: e.g., "30s"
    /// - `TUTORHUB_CORS_ORIGINS`: comma-separated, or "*"
    /// - `TUTORHUB_SECURITY_HEADERS`: "true"/"false" (default: "true")
    /// - `TUTORHUB_TRACING`: "true"/"false" (default: "true")
    ///
    /// Unparseable values are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = get("TUTORHUB_BIND").unwrap_or(defaults.bind_addr);

        let store_path = get("TUTORHUB_STORE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let password_policy = match get("TUTORHUB_PASSWORD_POLICY") {
            Some(name) if PasswordPolicy::named(&name).is_some() => name,
            Some(name) => {
                tracing::warn!(policy = %name, "Unknown password policy, using standard");
                defaults.password_policy
            }
            None => defaults.password_policy,
        };

        let lockout_enabled = get("TUTORHUB_LOCKOUT_ENABLED")
            .map(|s| parse_flag(&s))
            .unwrap_or(false);

        let lockout = lockout_enabled.then(|| {
            let base = LockoutPolicy::default();
            LockoutPolicy::builder()
                .max_attempts(
                    get("TUTORHUB_LOCKOUT_MAX_ATTEMPTS")
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(base.max_attempts),
                )
                .attempt_window(duration_var(&get, "TUTORHUB_LOCKOUT_WINDOW", base.attempt_window))
                .lockout_duration(duration_var(
                    &get,
                    "TUTORHUB_LOCKOUT_DURATION",
                    base.lockout_duration,
                ))
                .build()
        });

        let max_request_size = match get("TUTORHUB_MAX_REQUEST_SIZE") {
            Some(raw) => parse_size(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Invalid TUTORHUB_MAX_REQUEST_SIZE, using default");
                defaults.max_request_size
            }),
            None => defaults.max_request_size,
        };

        let request_timeout =
            duration_var(&get, "TUTORHUB_REQUEST_TIMEOUT", defaults.request_timeout);

        let cors_origins: Vec<String> = get("TUTORHUB_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let security_headers_enabled = get("TUTORHUB_SECURITY_HEADERS")
            .map(|s| parse_flag(&s))
            .unwrap_or(true);

        let tracing_enabled = get("TUTORHUB_TRACING")
            .map(|s| parse_flag(&s))
            .unwrap_or(true);

        Self {
            bind_addr,
            store_path,
            password_policy,
            lockout,
            max_request_size,
            request_timeout,
            cors_origins,
            security_headers_enabled,
            tracing_enabled,
        }
    }

    /// Create a new builder for programmatic configuration.
    pub fn builder() -> TutorhubConfigBuilder {
        TutorhubConfigBuilder::default()
    }

    /// The password policy to enforce on new secrets
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy::named(&self.password_policy).unwrap_or_default()
    }

    /// Check if CORS is in permissive mode (allows any origin).
    pub fn cors_is_permissive(&self) -> bool {
        self.cors_origins.len() == 1 && self.cors_origins[0] == "*"
    }

    /// Check if CORS is in restrictive mode (same-origin only).
    pub fn cors_is_restrictive(&self) -> bool {
        self.cors_origins.is_empty()
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off")
}

fn duration_var(get: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    match get(key) {
        Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
            tracing::warn!(variable = key, value = %raw, "Invalid duration, using default");
            default
        }),
        None => default,
    }
}

/// Builder for TutorhubConfig
#[derive(Debug, Clone, Default)]
pub struct TutorhubConfigBuilder {
    config: TutorhubConfig,
}

impl TutorhubConfigBuilder {
    /// Set the bind address.
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Persist users to a JSON file.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = Some(path.into());
        self
    }

    /// Select a password policy by name.
    pub fn password_policy(mut self, name: impl Into<String>) -> Self {
        self.config.password_policy = name.into();
        self
    }

    /// Enable failed-login lockout.
    pub fn lockout(mut self, policy: LockoutPolicy) -> Self {
        self.config.lockout = Some(policy);
        self
    }

    /// Set maximum request body size in bytes.
    pub fn max_request_size(mut self, size: usize) -> Self {
        self.config.max_request_size = size;
        self
    }

    /// Set request timeout duration.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set CORS allowed origins.
    pub fn cors_origins(mut self, origins: Vec<&str>) -> Self {
        self.config.cors_origins = origins.into_iter().map(String::from).collect();
        self
    }

    /// Disable security headers.
    pub fn disable_security_headers(mut self) -> Self {
        self.config.security_headers_enabled = false;
        self
    }

    /// Disable request/response tracing.
    pub fn disable_tracing(mut self) -> Self {
        self.config.tracing_enabled = false;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TutorhubConfig {
        self.config
    }
}
