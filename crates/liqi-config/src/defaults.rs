//! Built-in configuration values.

/// Origin presented during the websocket handshake when none is configured.
pub const DEFAULT_ORIGIN: &str = "https://game.maj-soul.com";

/// Seconds between keepalive calls.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 6;

/// Fully qualified keepalive method. The upstream service spells it this way.
pub const DEFAULT_HEARTBEAT_METHOD: &str = ".lq.Lobby.heatbeat";

/// Seconds a caller waits for a reply before the call is abandoned.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Seconds allowed for the TCP connect and websocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Consecutive transient read failures tolerated before a session closes.
pub const DEFAULT_MAX_CONSECUTIVE_READ_ERRORS: u32 = 8;

/// `tracing` directive applied when no filter is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Borrowed form of [`DEFAULT_LOG_FILTER`] for comparisons in callers and
/// tests.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned copy of [`DEFAULT_LOG_FILTER`] for `Config` field defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Log format used when none is configured.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default handshake origin as an owned string.
#[must_use]
pub fn default_origin() -> String {
    DEFAULT_ORIGIN.to_owned()
}

/// Default keepalive method as an owned string.
#[must_use]
pub fn default_heartbeat_method() -> String {
    DEFAULT_HEARTBEAT_METHOD.to_owned()
}
