//! Shared configuration for the push registration bridge.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults, then an optional
//! TOML file (`--config-path` or `XAPS_CONFIG_PATH`), then `XAPS_*`
//! environment variables, then command-line flags.

mod capability;
mod defaults;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use capability::{PUSH_CAPABILITY, PushCapability};
pub use defaults::{
    DEFAULT_DAEMON_URL, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_LOG_FILTER, default_daemon_url,
    default_http_timeout_ms, default_log_filter, default_log_filter_string, default_log_format,
    default_push_capability,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Path, relative to the daemon URL, that accepts device registrations.
pub const REGISTRATION_PATH: &str = "register";

/// Resolved bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "XAPS")]
pub struct Config {
    /// Base URL of the registration daemon.
    #[serde(default = "default_daemon_url")]
    #[ortho_config(default = default_daemon_url())]
    pub daemon_url: String,
    /// Timeout applied by the HTTP transport to each registration.
    #[serde(default = "default_http_timeout_ms")]
    #[ortho_config(default = default_http_timeout_ms())]
    pub http_timeout_ms: u64,
    /// Whether `XAPPLEPUSHSERVICE` is advertised to connections.
    #[serde(default = "default_push_capability")]
    #[ortho_config(default = default_push_capability())]
    pub push_capability: PushCapability,
    /// Environment variable holding the real mailbox user, when the login
    /// name differs from the account the daemon knows about.
    #[serde(default)]
    pub user_lookup: Option<String>,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_url: default_daemon_url(),
            http_timeout_ms: default_http_timeout_ms(),
            push_capability: default_push_capability(),
            user_lookup: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Base URL of the registration daemon, as configured.
    #[must_use]
    pub const fn daemon_url(&self) -> &str {
        self.daemon_url.as_str()
    }

    /// Transport timeout for registration requests.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Capability gate for the registration command.
    #[must_use]
    pub const fn push_capability(&self) -> PushCapability {
        self.push_capability
    }

    /// Name of the environment variable carrying the real mailbox user.
    #[must_use]
    pub fn user_lookup(&self) -> Option<&str> {
        self.user_lookup
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// `tracing` filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Absolute URL registrations are posted to.
    ///
    /// The daemon URL is treated as a directory, so a base of
    /// `http://host:11619/xaps` yields `http://host:11619/xaps/register`.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] when the daemon URL does not parse or cannot
    /// act as a base.
    pub fn registration_endpoint(&self) -> Result<Url, EndpointError> {
        let mut base =
            Url::parse(self.daemon_url.trim()).map_err(|source| EndpointError::Invalid {
                url: self.daemon_url.clone(),
                source,
            })?;
        if base.cannot_be_a_base() {
            return Err(EndpointError::NotABase {
                url: base.to_string(),
            });
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(REGISTRATION_PATH)
            .map_err(|source| EndpointError::Join {
                url: self.daemon_url.clone(),
                source,
            })
    }

    /// Checks settings that parse but cannot be served with.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ZeroHttpTimeout`] when `http_timeout_ms` is
    /// zero, which would fail every registration and leave no shutdown grace.
    pub const fn validate(&self) -> Result<(), SettingsError> {
        if self.http_timeout_ms == 0 {
            return Err(SettingsError::ZeroHttpTimeout);
        }
        Ok(())
    }
}

/// Settings rejected by [`Config::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// `http_timeout_ms` was zero.
    #[error("http_timeout_ms must be greater than zero")]
    ZeroHttpTimeout,
}

/// Errors raised while deriving the registration endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The configured daemon URL does not parse.
    #[error("daemon URL '{url}' is not a valid URL: {source}")]
    Invalid {
        /// Configured value.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// The configured URL cannot carry a path (for example `mailto:`).
    #[error("daemon URL '{url}' cannot be used as a base URL")]
    NotABase {
        /// Configured value.
        url: String,
    },
    /// Appending the registration path failed.
    #[error("failed to derive registration endpoint from '{url}': {source}")]
    Join {
        /// Configured value.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}
