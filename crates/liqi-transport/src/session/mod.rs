//! A live gateway connection.
//!
//! A [`Session`] owns one websocket. A read task routes inbound frames and
//! an optional heartbeat task keeps the connection warm. Any number of
//! callers may issue calls concurrently; writes are serialised by one async
//! mutex that also guards the sequence counter and registration.

mod config;
mod heartbeat;
mod read_loop;
mod reply;
mod state;

use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex as AsyncMutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, trace, warn};

pub use self::config::SessionConfig;
pub use self::reply::PendingReply;
pub use self::state::SessionState;
use crate::envelope::request_frame;
use crate::error::{CallError, ConnectError};
use crate::notification::NotificationHandler;
use crate::payload::Payload;
use crate::registry::{PendingCalls, ReplySink, SequenceCounter};
use crate::stream::dial;
use crate::wrapper::wrap_named;

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Upper bound on each shutdown step: flushing the close frame and joining
/// each background task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub(crate) type FrameSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;
pub(crate) type FrameStream = BoxStream<'static, Result<Message, tungstenite::Error>>;
type SharedHandler = Arc<dyn NotificationHandler>;

struct Writer {
    sink: FrameSink,
    sequence: SequenceCounter,
    sink_closed: bool,
}

struct Shared {
    writer: AsyncMutex<Writer>,
    registry: Arc<PendingCalls>,
    state: watch::Sender<SessionState>,
    notifications: RwLock<Option<SharedHandler>>,
    config: SessionConfig,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.state.borrow().is_closed()
    }

    fn notification_handler(&self) -> Option<SharedHandler> {
        self.notifications
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    fn set_notification_handler(&self, handler: Option<SharedHandler>) {
        *self
            .notifications
            .write()
            .unwrap_or_else(|poison| poison.into_inner()) = handler;
    }

    /// Moves the session to `Closed` and fails every pending call. Returns
    /// `false` when the session was already closed.
    fn mark_closed(&self, reason: &'static str) -> bool {
        let transitioned = self.state.send_if_modified(|state| {
            if state.is_closed() {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        });
        if transitioned {
            let abandoned = self
                .registry
                .fail_all(|sequence| CallError::Abandoned { sequence });
            info!(target: SESSION_TARGET, reason, abandoned, "session closed");
        }
        transitioned
    }

    async fn issue<Q, R>(&self, method: &str, request: &Q) -> Result<PendingReply<R>, CallError>
    where
        Q: Payload,
        R: Payload,
    {
        let payload = request.encode().map_err(CallError::Encode)?;
        let wrapped = wrap_named(method, &payload);
        let (sender, receiver) = oneshot::channel();

        let mut writer = self.writer.lock().await;
        if writer.sink_closed || self.is_closed() {
            return Err(CallError::Closed);
        }
        let sequence = writer.sequence.advance();
        let token = self
            .registry
            .register(sequence, ReplySink::typed::<R>(sequence, sender))
            .map_err(|(error, _sink)| error)?;
        // A close that raced the check above has already drained the registry.
        if self.is_closed() {
            self.registry.remove(sequence, token);
            return Err(CallError::Closed);
        }
        let frame = request_frame(sequence, &wrapped);
        let len = frame.len();
        if let Err(source) = writer.sink.send(Message::binary(frame)).await {
            self.registry.remove(sequence, token);
            warn!(target: SESSION_TARGET, sequence, method, error = %source, "failed to send request");
            return Err(CallError::Send {
                sequence,
                source: Box::new(source),
            });
        }
        drop(writer);

        trace!(target: SESSION_TARGET, sequence, method, len, "request sent");
        Ok(PendingReply::new(
            sequence,
            token,
            receiver,
            Arc::clone(&self.registry),
            self.config.call_timeout,
        ))
    }

    async fn close_sink(&self) {
        let Ok(mut writer) = tokio::time::timeout(SHUTDOWN_GRACE, self.writer.lock()).await else {
            warn!(target: SESSION_TARGET, "writer stayed busy; skipping close frame");
            return;
        };
        if writer.sink_closed {
            return;
        }
        writer.sink_closed = true;
        match tokio::time::timeout(SHUTDOWN_GRACE, writer.sink.close()).await {
            Ok(Ok(())) => debug!(target: SESSION_TARGET, "close frame sent"),
            Ok(Err(error)) => debug!(target: SESSION_TARGET, %error, "closing the sink failed"),
            Err(_elapsed) => warn!(target: SESSION_TARGET, "timed out flushing close frame"),
        }
    }
}

/// Configures and starts a [`Session`].
#[must_use]
pub struct SessionBuilder {
    config: SessionConfig,
    handler: Option<SharedHandler>,
}

impl SessionBuilder {
    /// Installs the handler that receives notify frames.
    pub fn notification_handler<H>(mut self, handler: H) -> Self
    where
        H: NotificationHandler + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Dials the configured endpoint and starts the session.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when dialling or the handshake fails.
    pub async fn connect(self) -> Result<Session, ConnectError> {
        let stream = dial(&self.config).await?;
        Ok(self.attach(stream))
    }

    /// Starts a session over an already established websocket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach<S>(self, stream: WebSocketStream<S>) -> Session
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, frames) = stream.split();
        self.start(Box::pin(sink), frames.boxed())
    }

    /// Starts the session over separate frame halves.
    pub(crate) fn start(self, sink: FrameSink, frames: FrameStream) -> Session {
        let (state, _initial) = watch::channel(SessionState::Open);
        let shared = Arc::new(Shared {
            writer: AsyncMutex::new(Writer {
                sink,
                sequence: SequenceCounter::default(),
                sink_closed: false,
            }),
            registry: Arc::new(PendingCalls::new()),
            state,
            notifications: RwLock::new(self.handler),
            config: self.config,
        });

        let mut tasks = vec![tokio::spawn(read_loop::run(Arc::clone(&shared), frames))];
        let keepalive = shared
            .config
            .heartbeat_interval
            .filter(|period| !period.is_zero());
        if let Some(interval) = keepalive {
            tasks.push(tokio::spawn(heartbeat::run(Arc::clone(&shared), interval)));
        }
        debug!(
            target: SESSION_TARGET,
            heartbeat = ?shared.config.heartbeat_interval,
            call_timeout = ?shared.config.call_timeout,
            "session started"
        );

        Session {
            shared,
            tasks: Mutex::new(tasks),
        }
    }
}

/// A multiplexed call session over one gateway websocket.
///
/// Share it between tasks behind an [`Arc`]. Dropping the session closes it
/// without waiting for the background tasks.
pub struct Session {
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Starts building a session with the given settings.
    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            handler: None,
        }
    }

    /// Dials the gateway described by `config` and starts a session.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when dialling or the handshake fails.
    pub async fn connect(config: SessionConfig) -> Result<Self, ConnectError> {
        Self::builder(config).connect().await
    }

    /// Sends a request and returns a handle for its reply.
    ///
    /// The future resolves once the frame has been written. Await the
    /// returned [`PendingReply`] for the response.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Closed`] on a closed session,
    /// [`CallError::Encode`] when the request cannot be encoded,
    /// [`CallError::DuplicateSequence`] when the sequence is still in use, or
    /// [`CallError::Send`] when the write fails.
    pub async fn issue<Q, R>(&self, method: &str, request: &Q) -> Result<PendingReply<R>, CallError>
    where
        Q: Payload,
        R: Payload,
    {
        self.shared.issue(method, request).await
    }

    /// Sends a request and waits for its reply.
    ///
    /// # Errors
    ///
    /// Any error from [`Session::issue`] or [`PendingReply::wait`].
    pub async fn call<Q, R>(&self, method: &str, request: &Q) -> Result<R, CallError>
    where
        Q: Payload,
        R: Payload,
    {
        self.issue(method, request).await?.wait().await
    }

    /// Closes the session.
    ///
    /// Pending calls fail with [`CallError::Abandoned`], a close frame is
    /// sent, and the background tasks are joined. Each step is bounded, so
    /// this returns even when the peer has stopped responding. Calling it
    /// again has no further effect.
    pub async fn close(&self) {
        self.shared.mark_closed("closed by caller");
        self.shared.close_sink().await;

        let tasks = std::mem::take(
            &mut *self
                .tasks
                .lock()
                .unwrap_or_else(|poison| poison.into_inner()),
        );
        for mut task in tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    warn!(target: SESSION_TARGET, %error, "session task failed");
                }
                Err(_elapsed) => {
                    warn!(target: SESSION_TARGET, "session task did not stop; aborting");
                    task.abort();
                }
            }
        }
    }

    /// Resolves once the session has closed, whoever closed it.
    pub async fn closed(&self) {
        state::wait_closed(&mut self.shared.state.subscribe()).await;
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// Returns `true` once the session has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Replaces the notification handler.
    pub fn set_notification_handler<H>(&self, handler: H)
    where
        H: NotificationHandler + 'static,
    {
        self.shared.set_notification_handler(Some(Arc::new(handler)));
    }

    /// Removes the notification handler. Later notifications are logged and
    /// dropped.
    pub fn clear_notification_handler(&self) {
        self.shared.set_notification_handler(None);
    }

    /// Number of calls awaiting a reply.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.shared.registry.len()
    }

    /// Returns `true` while the call with `sequence` awaits a reply.
    #[must_use]
    pub fn is_pending(&self, sequence: u16) -> bool {
        self.shared.registry.contains(sequence)
    }

    /// Settings the session was started with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.mark_closed("session dropped");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Session")
            .field("state", &self.state())
            .field("pending_calls", &self.pending_calls())
            .finish_non_exhaustive()
    }
}
