//! Gateway websocket address parsing and validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Websocket address of the game gateway.
///
/// Only `ws://` and `wss://` URLs with a host are accepted.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct GatewayEndpoint {
    url: Url,
}

impl GatewayEndpoint {
    /// Returns the endpoint as a string slice suitable for dialling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the parsed URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns `true` when the endpoint requires TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }

    /// Host name of the gateway.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }
}

impl fmt::Display for GatewayEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.url.as_str())
    }
}

impl FromStr for GatewayEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(EndpointParseError::UnsupportedScheme(other.to_owned())),
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(EndpointParseError::MissingHost(input.to_owned()));
        }
        Ok(Self { url })
    }
}

impl TryFrom<String> for GatewayEndpoint {
    type Error = EndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GatewayEndpoint> for String {
    fn from(endpoint: GatewayEndpoint) -> Self {
        endpoint.url.into()
    }
}

/// Errors encountered while parsing a [`GatewayEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was neither `ws` nor `wss`.
    #[error("unsupported gateway scheme '{0}' (expected ws or wss)")]
    UnsupportedScheme(String),
    /// The URL carried no host.
    #[error("missing gateway host in '{0}'")]
    MissingHost(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
