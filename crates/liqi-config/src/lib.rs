//! Shared configuration for the liqi gateway client.
//!
//! Values are layered by `ortho_config` in a fixed order: built-in defaults,
//! then a TOML configuration file, then `LIQI_*` environment variables, then
//! command-line flags. The merged result is validated before it is handed to
//! the transport.

mod defaults;
mod endpoint;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_HEARTBEAT_INTERVAL_SECS,
    DEFAULT_HEARTBEAT_METHOD, DEFAULT_LOG_FILTER, DEFAULT_MAX_CONSECUTIVE_READ_ERRORS,
    DEFAULT_ORIGIN, default_heartbeat_method, default_log_filter, default_log_filter_string,
    default_log_format, default_origin,
};
pub use endpoint::{EndpointParseError, GatewayEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Environment variable naming the TOML configuration file.
pub const ENV_CONFIG_PATH: &str = "LIQI_CONFIG_PATH";
/// Environment variable overriding [`Config::endpoint`].
pub const ENV_ENDPOINT: &str = "LIQI_ENDPOINT";
/// Environment variable overriding [`Config::origin`].
pub const ENV_ORIGIN: &str = "LIQI_ORIGIN";
/// Environment variable overriding the heartbeat interval in seconds.
pub const ENV_HEARTBEAT_INTERVAL_SECS: &str = "LIQI_HEARTBEAT_INTERVAL_SECS";
/// Environment variable overriding the call timeout in seconds.
pub const ENV_CALL_TIMEOUT_SECS: &str = "LIQI_CALL_TIMEOUT_SECS";
/// Environment variable overriding the connect timeout in seconds.
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "LIQI_CONNECT_TIMEOUT_SECS";
/// Environment variable overriding the log filter.
pub const ENV_LOG_FILTER: &str = "LIQI_LOG_FILTER";
/// Environment variable overriding the log format.
pub const ENV_LOG_FORMAT: &str = "LIQI_LOG_FORMAT";

/// Client configuration shared by the transport and telemetry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "LIQI")]
pub struct Config {
    /// Gateway to dial. Required before a session can connect.
    #[serde(default)]
    pub endpoint: Option<GatewayEndpoint>,
    /// Value of the `Origin` header presented during the handshake.
    #[serde(default = "default_origin")]
    #[ortho_config(default = default_origin())]
    pub origin: String,
    /// Seconds between keepalive calls; `0` disables the heartbeat.
    #[serde(default = "default_heartbeat_interval_secs")]
    #[ortho_config(default = DEFAULT_HEARTBEAT_INTERVAL_SECS)]
    pub heartbeat_interval_secs: u64,
    /// Fully qualified method used for keepalive calls.
    #[serde(default = "default_heartbeat_method")]
    #[ortho_config(default = default_heartbeat_method())]
    pub heartbeat_method: String,
    /// Seconds to wait for a reply; `0` waits indefinitely.
    #[serde(default = "default_call_timeout_secs")]
    #[ortho_config(default = DEFAULT_CALL_TIMEOUT_SECS)]
    pub call_timeout_secs: u64,
    /// Seconds allowed for connecting and completing the handshake.
    #[serde(default = "default_connect_timeout_secs")]
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,
    /// Consecutive transient read failures tolerated before closing.
    #[serde(default = "default_max_consecutive_read_errors")]
    #[ortho_config(default = DEFAULT_MAX_CONSECUTIVE_READ_ERRORS)]
    pub max_consecutive_read_errors: u32,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log lines.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            origin: default_origin(),
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            heartbeat_method: default_heartbeat_method(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_consecutive_read_errors: DEFAULT_MAX_CONSECUTIVE_READ_ERRORS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

const fn default_heartbeat_interval_secs() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}

const fn default_call_timeout_secs() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_max_consecutive_read_errors() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_READ_ERRORS
}

impl Config {
    /// Loads the process configuration and validates it.
    ///
    /// Command-line flags are read from the process arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a layer cannot be read or merged and
    /// [`ConfigError::Invalid`] when the merged values fail validation.
    pub fn resolve() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the given argument list and validates it.
    ///
    /// The first item is the program name, as with `std::env::args_os`.
    ///
    /// # Errors
    ///
    /// See [`Config::resolve`].
    pub fn resolve_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::load_from_iter(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.origin.trim().is_empty() {
            return Err(ConfigError::invalid("origin", "must not be empty"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "connect_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.heartbeat_interval_secs > 0 && self.heartbeat_method.trim().is_empty() {
            return Err(ConfigError::invalid(
                "heartbeat_method",
                "must be set while the heartbeat is enabled",
            ));
        }
        if self.max_consecutive_read_errors == 0 {
            return Err(ConfigError::invalid(
                "max_consecutive_read_errors",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Gateway to dial, when configured.
    #[must_use]
    pub const fn endpoint(&self) -> Option<&GatewayEndpoint> {
        self.endpoint.as_ref()
    }

    /// Handshake origin.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Keepalive period, or `None` when disabled.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Option<Duration> {
        non_zero_secs(self.heartbeat_interval_secs)
    }

    /// Reply deadline, or `None` when calls wait indefinitely.
    #[must_use]
    pub const fn call_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.call_timeout_secs)
    }

    /// Connect and handshake deadline.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

const fn non_zero_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}


/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration layer could not be read, parsed, or merged.
    #[error("failed to load configuration: {source}")]
    Load {
        /// Aggregated loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// A field failed validation.
    #[error("invalid configuration field '{field}': {message}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why the value was rejected.
        message: &'static str,
    },
}

impl ConfigError {
    const fn invalid(field: &'static str, message: &'static str) -> Self {
        Self::Invalid { field, message }
    }
}

impl From<Arc<OrthoError>> for ConfigError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Load { source }
    }
}
