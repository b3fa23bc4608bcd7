use crate::capability::PushCapability;
use crate::logging::LogFormat;

/// Address the registration daemon listens on out of the box.
pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:11619/";

/// Transport timeout for registration requests, in milliseconds.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5_000;

/// Default log filter expression used by the bridge.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the bridge.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format. JSON keeps stderr machine-readable when the
/// bridge runs under an IMAP server's process supervisor.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Base URL of the registration daemon, validated when the endpoint is
/// derived at bootstrap.
#[must_use]
pub fn default_daemon_url() -> String {
    DEFAULT_DAEMON_URL.to_owned()
}

/// Transport timeout for registration requests, in milliseconds.
#[must_use]
pub const fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

/// Push registration is offered unless configured otherwise.
#[must_use]
pub const fn default_push_capability() -> PushCapability {
    PushCapability::Advertise
}
