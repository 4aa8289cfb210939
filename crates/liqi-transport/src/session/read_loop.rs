//! Inbound half of a session.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, warn};

use super::state::wait_closed;
use super::{FrameStream, SESSION_TARGET, Shared};
use crate::dispatch::dispatch;

/// Reads frames until the session closes or the connection ends.
pub(super) async fn run(shared: Arc<Shared>, mut frames: FrameStream) {
    let mut state = shared.state.subscribe();
    let budget = shared.config.max_consecutive_read_errors.max(1);
    let mut consecutive_errors = 0_u32;

    let reason = loop {
        let next = tokio::select! {
            biased;
            () = wait_closed(&mut state) => break None,
            next = frames.next() => next,
        };

        match next {
            None => break Some("connection ended"),
            Some(Ok(message)) => {
                consecutive_errors = 0;
                if let Some(reason) = handle_message(&shared, message) {
                    break Some(reason);
                }
            }
            Some(Err(_)) if shared.is_closed() => break None,
            Some(Err(error)) if is_terminal(&error) => {
                warn!(target: SESSION_TARGET, %error, "connection lost");
                break Some("connection lost");
            }
            Some(Err(error)) => {
                consecutive_errors = consecutive_errors.saturating_add(1);
                warn!(
                    target: SESSION_TARGET,
                    %error,
                    consecutive_errors,
                    budget,
                    "read failed"
                );
                if consecutive_errors >= budget {
                    break Some("too many consecutive read errors");
                }
            }
        }
    };

    if let Some(cause) = reason {
        shared.mark_closed(cause);
    }
    debug!(target: SESSION_TARGET, "read loop stopped");
}

/// Routes one message. Returns a close reason when the peer ended the
/// connection.
fn handle_message(shared: &Shared, message: Message) -> Option<&'static str> {
    match message {
        Message::Binary(data) => {
            let frame = Bytes::from(data);
            let len = frame.len();
            let handler = shared.notification_handler();
            dispatch(frame, &shared.registry, handler.as_deref()).log(len);
            None
        }
        Message::Close(frame) => {
            debug!(target: SESSION_TARGET, ?frame, "peer sent close frame");
            Some("closed by peer")
        }
        Message::Text(text) => {
            warn!(target: SESSION_TARGET, len = text.len(), "ignoring text frame");
            None
        }
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

const fn is_terminal(error: &tungstenite::Error) -> bool {
    matches!(
        error,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
    )
}
