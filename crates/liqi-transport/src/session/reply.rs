//! Caller-side handle for one in-flight call.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use super::SESSION_TARGET;
use crate::error::CallError;
use crate::payload::Payload;
use crate::registry::{CallToken, PendingCalls};

/// Awaitable reply to an issued call.
///
/// Dropping the handle, or letting it time out, purges the call's registry
/// entry. A response arriving afterwards is logged as unmatched.
#[must_use = "the reply is lost unless the handle is awaited"]
pub struct PendingReply<R> {
    sequence: u16,
    token: CallToken,
    receiver: Option<oneshot::Receiver<Result<R, CallError>>>,
    registry: Arc<PendingCalls>,
    timeout: Option<Duration>,
}

impl<R: Payload> PendingReply<R> {
    pub(super) const fn new(
        sequence: u16,
        token: CallToken,
        receiver: oneshot::Receiver<Result<R, CallError>>,
        registry: Arc<PendingCalls>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            sequence,
            token,
            receiver: Some(receiver),
            registry,
            timeout,
        }
    }

    /// Sequence number assigned to the request.
    #[must_use]
    pub const fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Waits for the reply.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Timeout`] when the call deadline passes,
    /// [`CallError::Abandoned`] when the session closes first, or
    /// [`CallError::Decode`] when the reply does not decode as `R`.
    pub async fn wait(mut self) -> Result<R, CallError> {
        let sequence = self.sequence;
        let Some(receiver) = self.receiver.take() else {
            return Err(CallError::Abandoned { sequence });
        };
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(received) => received,
                Err(_elapsed) => {
                    debug!(
                        target: SESSION_TARGET,
                        sequence,
                        timeout_ms = limit.as_millis(),
                        "call timed out"
                    );
                    return Err(CallError::Timeout {
                        sequence,
                        timeout: limit,
                    });
                }
            },
            None => receiver.await,
        };
        outcome.unwrap_or(Err(CallError::Abandoned { sequence }))
    }
}

impl<R> Drop for PendingReply<R> {
    fn drop(&mut self) {
        // No-op when the read loop or a close already took the entry.
        self.registry.remove(self.sequence, self.token);
    }
}

impl<R: Payload> IntoFuture for PendingReply<R> {
    type Output = Result<R, CallError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

impl<R> std::fmt::Debug for PendingReply<R> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PendingReply")
            .field("sequence", &self.sequence)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
