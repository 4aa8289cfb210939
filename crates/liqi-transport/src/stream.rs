//! Dialling the gateway websocket.

use once_cell::sync::OnceCell;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use crate::error::ConnectError;
use crate::session::SessionConfig;

const STREAM_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::stream");

static TLS_PROVIDER: OnceCell<()> = OnceCell::new();

/// Websocket produced by [`dial`].
pub type GatewayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens a websocket to the configured endpoint.
///
/// The handshake carries the configured `Origin` header and must finish
/// within the connect timeout.
///
/// # Errors
///
/// Returns [`ConnectError`] when no endpoint is configured, the origin is not
/// a valid header value, the handshake fails, or the deadline passes.
pub async fn dial(config: &SessionConfig) -> Result<GatewayStream, ConnectError> {
    let endpoint = config
        .endpoint
        .as_ref()
        .ok_or(ConnectError::MissingEndpoint)?;
    let origin = HeaderValue::from_str(&config.origin).map_err(|_| ConnectError::InvalidOrigin {
        origin: config.origin.clone(),
    })?;
    let mut request = endpoint
        .as_str()
        .into_client_request()
        .map_err(|source| ConnectError::Handshake {
            endpoint: endpoint.to_string(),
            source: Box::new(source),
        })?;
    request.headers_mut().insert(ORIGIN, origin);

    if endpoint.is_secure() {
        install_tls_provider();
    }

    debug!(
        target: STREAM_TARGET,
        endpoint = %endpoint,
        origin = %config.origin,
        "dialling gateway"
    );
    let handshake = tokio::time::timeout(config.connect_timeout, connect_async(request)).await;
    let (stream, response) = match handshake {
        Ok(Ok(connected)) => connected,
        Ok(Err(source)) => {
            return Err(ConnectError::Handshake {
                endpoint: endpoint.to_string(),
                source: Box::new(source),
            });
        }
        Err(_elapsed) => {
            return Err(ConnectError::Timeout {
                endpoint: endpoint.to_string(),
                timeout: config.connect_timeout,
            });
        }
    };
    info!(
        target: STREAM_TARGET,
        endpoint = %endpoint,
        status = response.status().as_u16(),
        "connected to gateway"
    );
    Ok(stream)
}

fn install_tls_provider() {
    TLS_PROVIDER.get_or_init(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!(
                target: STREAM_TARGET,
                "process already has a TLS crypto provider"
            );
        }
    });
}
