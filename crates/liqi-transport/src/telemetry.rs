//! Process-wide `tracing` setup for gateway clients.
//!
//! Sessions log through `tracing` whether or not anything is installed here.
//! Binaries that want the configured filter and format call [`initialise`]
//! once at start-up; libraries embedding the transport should leave the
//! choice of subscriber to their host.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use liqi_config::{Config, LogFormat};

static INSTALLED: OnceCell<LogSettings> = OnceCell::new();

/// Filter and output format for the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive string, e.g. `info,liqi_transport=debug`.
    pub filter: String,
    /// Line format written to stderr.
    pub format: LogFormat,
}

impl LogSettings {
    /// Reads the logging section of the client configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            filter: config.log_filter().to_owned(),
            format: config.log_format(),
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directive did not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Directive as configured.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Some other subscriber already owns the global slot.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] SetGlobalDefaultError),
}

/// Installs the global subscriber described by `config`.
///
/// Only the first successful call installs anything. Later calls return the
/// settings that won, so callers can tell whether theirs took effect.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a foreign
/// subscriber is already installed.
pub fn initialise(config: &Config) -> Result<&'static LogSettings, TelemetryError> {
    INSTALLED.get_or_try_init(|| {
        let settings = LogSettings::from_config(config);
        let subscriber = build_subscriber(&settings)?;
        tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
        Ok(settings)
    })
}

/// Builds, without installing, the subscriber for `settings`.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the directive does not parse.
pub fn build_subscriber(
    settings: &LogSettings,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let env_filter =
        EnvFilter::try_new(&settings.filter).map_err(|error| TelemetryError::Filter {
            filter: settings.filter.clone(),
            message: error.to_string(),
        })?;

    let stderr = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match settings.format {
        LogFormat::Json => Box::new(stderr.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(stderr.compact().finish()),
    })
}
