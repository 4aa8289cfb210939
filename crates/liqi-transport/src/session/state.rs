//! Session lifecycle.

use tokio::sync::watch;

/// Lifecycle of a session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Frames may be written and replies are being read.
    Open,
    /// The connection has ended. New calls are rejected.
    Closed,
}

impl SessionState {
    /// Returns `true` once the session has closed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Resolves once `state` reports `Closed`.
pub(super) async fn wait_closed(state: &mut watch::Receiver<SessionState>) {
    // Errors only once the sender is gone, which happens after close.
    drop(state.wait_for(|current| current.is_closed()).await);
}
