//! Classification and routing of inbound frames.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::envelope::{Envelope, MessageKind};
use crate::error::{CodecError, FrameError};
use crate::notification::{Notification, NotificationHandler};
use crate::registry::PendingCalls;
use crate::wrapper::unwrap_named;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// What became of one inbound frame.
#[derive(Debug)]
pub enum Dispatch {
    /// A response reached the caller waiting on `sequence`.
    Delivered {
        /// Sequence of the response.
        sequence: u16,
        /// `false` when the caller had already stopped waiting.
        received: bool,
    },
    /// A response arrived for a sequence nobody is waiting on.
    Unmatched {
        /// Sequence of the orphaned response.
        sequence: u16,
    },
    /// A notification was passed to the handler.
    Notified {
        /// Notification name.
        name: String,
    },
    /// A notification arrived while no handler was installed.
    Unhandled {
        /// Notification name.
        name: String,
    },
    /// The peer sent a request; the client does not serve calls.
    IgnoredRequest {
        /// Sequence chosen by the peer.
        sequence: u16,
    },
    /// The frame header could not be parsed.
    Malformed(FrameError),
    /// A notification's wrapper could not be decoded.
    BadNotification(CodecError),
}

impl Dispatch {
    /// Logs the outcome at a level matching its severity.
    pub fn log(&self, len: usize) {
        match self {
            Self::Delivered { sequence, received } => {
                if *received {
                    trace!(target: DISPATCH_TARGET, sequence, len, "response delivered");
                } else {
                    debug!(
                        target: DISPATCH_TARGET,
                        sequence, len, "response arrived after caller stopped waiting"
                    );
                }
            }
            Self::Unmatched { sequence } => {
                warn!(target: DISPATCH_TARGET, sequence, len, "response matched no pending call");
            }
            Self::Notified { name } => {
                trace!(target: DISPATCH_TARGET, name = %name, len, "notification delivered");
            }
            Self::Unhandled { name } => {
                debug!(target: DISPATCH_TARGET, name = %name, len, "no notification handler installed");
            }
            Self::IgnoredRequest { sequence } => {
                debug!(target: DISPATCH_TARGET, sequence, len, "ignoring request from peer");
            }
            Self::Malformed(error) => {
                warn!(target: DISPATCH_TARGET, %error, len, "dropping malformed frame");
            }
            Self::BadNotification(error) => {
                warn!(target: DISPATCH_TARGET, %error, len, "dropping undecodable notification");
            }
        }
    }
}

/// Routes one binary frame.
///
/// Responses go to the registry, notifications to `handler`. Requests from
/// the peer are ignored. Nothing here can fail the session.
pub fn dispatch(
    frame: Bytes,
    registry: &PendingCalls,
    handler: Option<&dyn NotificationHandler>,
) -> Dispatch {
    let envelope = match Envelope::decode(frame) {
        Ok(envelope) => envelope,
        Err(error) => return Dispatch::Malformed(error),
    };

    match (envelope.kind, envelope.sequence) {
        (MessageKind::Response, Some(sequence)) => match registry.take(sequence) {
            Some(sink) => Dispatch::Delivered {
                sequence,
                received: sink.deliver(envelope.body),
            },
            None => Dispatch::Unmatched { sequence },
        },
        (MessageKind::Request, Some(sequence)) => Dispatch::IgnoredRequest { sequence },
        (MessageKind::Notify, _) => notify(envelope.body, handler),
        (kind, None) => Dispatch::Malformed(FrameError::SequenceMismatch { kind }),
    }
}

fn notify(body: Bytes, handler: Option<&dyn NotificationHandler>) -> Dispatch {
    let named = match unwrap_named(body) {
        Ok(named) => named,
        Err(error) => return Dispatch::BadNotification(error),
    };
    let Some(target) = handler else {
        return Dispatch::Unhandled { name: named.name };
    };
    let name = named.name.clone();
    target.handle(Notification {
        name: named.name,
        payload: named.payload,
    });
    Dispatch::Notified { name }
}
