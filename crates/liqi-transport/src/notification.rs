//! Out-of-band messages pushed by the gateway.

use bytes::Bytes;
use tokio::sync::mpsc;

/// A notify frame, with its payload left undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Fully qualified message name, for example `.lq.NotifyRoomPlayerReady`.
    pub name: String,
    /// Message bytes from the wrapper's data field.
    pub payload: Bytes,
}

/// Receives notifications from the read loop.
///
/// Handlers run on the read task and should hand work off rather than block.
pub trait NotificationHandler: Send + Sync {
    /// Called once per notify frame, in arrival order.
    fn handle(&self, notification: Notification);
}

impl<F> NotificationHandler for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn handle(&self, notification: Notification) {
        self(notification);
    }
}

/// Forwards notifications into a channel. Sends to a closed channel are
/// dropped.
impl NotificationHandler for mpsc::UnboundedSender<Notification> {
    fn handle(&self, notification: Notification) {
        if let Err(error) = self.send(notification) {
            tracing::debug!(
                target: crate::dispatch::DISPATCH_TARGET,
                name = %error.0.name,
                "notification receiver dropped"
            );
        }
    }
}
