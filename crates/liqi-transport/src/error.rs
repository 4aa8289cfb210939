//! Error types for the gateway transport.
//!
//! Websocket errors are boxed so the `Result`s returned on hot paths stay
//! small.

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::envelope::MessageKind;

/// Errors raised while establishing a session.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No endpoint was configured.
    #[error("no gateway endpoint configured")]
    MissingEndpoint,

    /// The configured origin is not a valid header value.
    #[error("origin '{origin}' is not a valid header value")]
    InvalidOrigin {
        /// Rejected origin.
        origin: String,
    },

    /// Dialling or the websocket handshake failed.
    #[error("failed to connect to {endpoint}: {source}")]
    Handshake {
        /// Endpoint being dialled.
        endpoint: String,
        /// Underlying websocket error.
        #[source]
        source: Box<tungstenite::Error>,
    },

    /// The handshake did not finish in time.
    #[error("connecting to {endpoint} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// Endpoint being dialled.
        endpoint: String,
        /// Configured connect timeout.
        timeout: Duration,
    },
}

/// Errors surfaced to the caller of a single call.
///
/// None of these close the session; they only concern the call that observed
/// them.
#[derive(Debug, Error)]
pub enum CallError {
    /// The session was already closed when the call was issued.
    #[error("session is closed")]
    Closed,

    /// The request payload could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[source] CodecError),

    /// Writing the request frame failed.
    #[error("failed to send request {sequence}: {source}")]
    Send {
        /// Sequence assigned to the request.
        sequence: u16,
        /// Underlying websocket error.
        #[source]
        source: Box<tungstenite::Error>,
    },

    /// A live call already holds this sequence number.
    #[error("sequence {sequence} is already awaiting a reply")]
    DuplicateSequence {
        /// Colliding sequence.
        sequence: u16,
    },

    /// The reply did not decode into the expected type.
    #[error("failed to decode reply {sequence}: {source}")]
    Decode {
        /// Sequence of the reply.
        sequence: u16,
        /// Decode failure.
        #[source]
        source: CodecError,
    },

    /// No reply arrived before the call timeout.
    #[error("no reply to {sequence} after {}ms", .timeout.as_millis())]
    Timeout {
        /// Sequence of the request.
        sequence: u16,
        /// Configured call timeout.
        timeout: Duration,
    },

    /// The session closed while the call was pending.
    #[error("session closed before reply {sequence} arrived")]
    Abandoned {
        /// Sequence of the request.
        sequence: u16,
    },
}

/// Structural problems with an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The frame carried no bytes.
    #[error("empty frame")]
    Empty,

    /// The kind tag is not one of the known values.
    #[error("unknown frame kind {0}")]
    UnknownKind(u8),

    /// The frame is shorter than the header for its kind.
    #[error("{kind:?} frame of {len} bytes is shorter than the {minimum}-byte header")]
    TooShort {
        /// Kind read from the first byte.
        kind: MessageKind,
        /// Actual frame length.
        len: usize,
        /// Required header length.
        minimum: usize,
    },

    /// A sequence was supplied for a notification or omitted for a call.
    #[error("sequence presence does not match {kind:?} frame kind")]
    SequenceMismatch {
        /// Kind being encoded.
        kind: MessageKind,
    },
}

/// Failures encoding or decoding the named payload or a typed message.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input ended in the middle of a field.
    #[error("truncated {context}")]
    Truncated {
        /// What was being read.
        context: &'static str,
    },

    /// A varint ran past ten bytes.
    #[error("varint overflow")]
    VarintOverflow,

    /// The field uses a wire type this codec cannot skip.
    #[error("unsupported wire type {wire_type} for field {field}")]
    UnsupportedWireType {
        /// Field number.
        field: u64,
        /// Wire type bits.
        wire_type: u8,
    },

    /// The name field is not valid UTF-8.
    #[error("name is not valid UTF-8")]
    InvalidName(#[source] std::str::Utf8Error),

    /// JSON payload codec failure.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// A collaborator-provided codec rejected the bytes.
    #[error("payload codec error: {message}")]
    Payload {
        /// Description supplied by the codec.
        message: String,
    },
}

impl CodecError {
    /// Wraps a failure reported by a collaborator-provided payload codec.
    #[must_use]
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }
}
