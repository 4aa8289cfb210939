//! Client transport for the liqi gateway protocol.
//!
//! Calls and notifications share one websocket. Every binary message is an
//! [`envelope`] frame whose body wraps a method name and an opaque payload.
//! Requests carry a sequence number that the gateway echoes back on the
//! response, so any number of calls may be in flight at once and replies may
//! arrive in any order.
//!
//! ```no_run
//! use liqi_transport::{Raw, Service, Session, SessionConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = "wss://gateway.example.com/gateway".parse()?;
//! let session = Session::connect(SessionConfig::new(endpoint, "https://game.maj-soul.com")).await?;
//! let reply: Raw = session
//!     .call(&Service::Lobby.method("fetchServerTime"), &())
//!     .await?;
//! session.close().await;
//! # drop(reply);
//! # Ok(())
//! # }
//! ```

mod dispatch;
pub mod envelope;
mod error;
mod method;
mod notification;
mod payload;
pub mod registry;
mod session;
mod stream;
pub mod telemetry;
pub mod wrapper;

#[cfg(test)]
mod tests;

pub use dispatch::{Dispatch, dispatch};
pub use envelope::{Envelope, MessageKind};
pub use error::{CallError, CodecError, ConnectError, FrameError};
pub use method::Service;
pub use notification::{Notification, NotificationHandler};
pub use payload::{Json, Payload, Raw};
pub use registry::{CallToken, PendingCalls, ReplySink, SEQUENCE_MODULUS, SequenceCounter};
pub use session::{PendingReply, Session, SessionBuilder, SessionConfig, SessionState};
pub use stream::{GatewayStream, dial};
pub use wrapper::{NamedPayload, unwrap_named, wrap_named};
