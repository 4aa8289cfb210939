//! Runtime settings for a single session.

use std::time::Duration;

use liqi_config::{
    Config, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_MAX_CONSECUTIVE_READ_ERRORS, GatewayEndpoint,
    default_heartbeat_method, default_origin,
};

use crate::error::ConnectError;

/// Settings applied to one connection.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Gateway to dial. Ignored when attaching to an existing stream.
    pub endpoint: Option<GatewayEndpoint>,
    /// `Origin` header presented during the handshake.
    pub origin: String,
    /// Keepalive period; `None` disables the heartbeat.
    pub heartbeat_interval: Option<Duration>,
    /// Method invoked by each keepalive.
    pub heartbeat_method: String,
    /// Reply deadline; `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
    /// Dial and handshake deadline.
    pub connect_timeout: Duration,
    /// Consecutive transient read failures tolerated before closing.
    pub max_consecutive_read_errors: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            origin: default_origin(),
            heartbeat_interval: Some(Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS)),
            heartbeat_method: default_heartbeat_method(),
            call_timeout: Some(Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS)),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_consecutive_read_errors: DEFAULT_MAX_CONSECUTIVE_READ_ERRORS,
        }
    }
}

impl SessionConfig {
    /// Settings for dialling `endpoint` with the given origin.
    #[must_use]
    pub fn new(endpoint: GatewayEndpoint, origin: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint),
            origin: origin.into(),
            ..Self::default()
        }
    }

    /// Derives session settings from the loaded client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::MissingEndpoint`] when no endpoint is set.
    pub fn from_config(config: &Config) -> Result<Self, ConnectError> {
        let endpoint = config
            .endpoint()
            .cloned()
            .ok_or(ConnectError::MissingEndpoint)?;
        Ok(Self {
            endpoint: Some(endpoint),
            origin: config.origin().to_owned(),
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_method: config.heartbeat_method.clone(),
            call_timeout: config.call_timeout(),
            connect_timeout: config.connect_timeout(),
            max_consecutive_read_errors: config.max_consecutive_read_errors.max(1),
        })
    }

    /// Sets the keepalive period. A zero period disables the heartbeat.
    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = non_zero(interval);
        self
    }

    /// Disables the heartbeat loop.
    #[must_use]
    pub const fn without_heartbeat(mut self) -> Self {
        self.heartbeat_interval = None;
        self
    }

    /// Sets the keepalive method.
    #[must_use]
    pub fn with_heartbeat_method(mut self, method: impl Into<String>) -> Self {
        self.heartbeat_method = method.into();
        self
    }

    /// Sets or clears the reply deadline. A zero deadline waits
    /// indefinitely, as `call_timeout_secs = 0` does in the client config.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = match timeout {
            Some(limit) => non_zero(limit),
            None => None,
        };
        self
    }

    /// Sets the dial and handshake deadline.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the consecutive read error budget. Values below one are raised to
    /// one.
    #[must_use]
    pub fn with_max_consecutive_read_errors(mut self, budget: u32) -> Self {
        self.max_consecutive_read_errors = budget.max(1);
        self
    }
}

const fn non_zero(period: Duration) -> Option<Duration> {
    if period.is_zero() { None } else { Some(period) }
}
