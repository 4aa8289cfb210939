//! Sessions over hand-driven frame halves, for failures a real socket cannot
//! produce on demand.

use std::convert::Infallible;

use futures_util::{SinkExt, StreamExt, sink, stream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::error::CapacityError;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::envelope::{MessageKind, encode};
use crate::session::{FrameSink, FrameStream, Session, SessionBuilder};

/// Feeds inbound frames and read errors to a session's read loop.
pub struct Inbound {
    sender: mpsc::UnboundedSender<Result<Message, tungstenite::Error>>,
}

impl Inbound {
    /// Queues a read error that the session should treat as transient.
    pub fn transient_error(&self) {
        self.push(Err(tungstenite::Error::Capacity(
            CapacityError::MessageTooLong {
                size: 2,
                max_size: 1,
            },
        )));
    }

    /// Queues a response frame for `sequence`.
    pub fn reply(&self, sequence: u16, payload: &[u8]) {
        let frame = encode(MessageKind::Response, "", Some(sequence), payload)
            .expect("response should encode");
        self.push(Ok(Message::binary(frame.to_vec())));
    }

    fn push(&self, item: Result<Message, tungstenite::Error>) {
        self.sender
            .send(item)
            .expect("read loop should still be listening");
    }
}

fn inbound() -> (Inbound, FrameStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let frames = stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|item| (item, receiver))
    })
    .boxed();
    (Inbound { sender }, frames)
}

/// Starts `builder` with a sink that accepts and discards every frame.
pub fn with_discarding_sink(builder: SessionBuilder) -> (Session, Inbound) {
    let (feed, frames) = inbound();
    let discard: FrameSink = Box::pin(
        sink::drain::<Message>()
            .sink_map_err(|never: Infallible| -> tungstenite::Error { match never {} }),
    );
    (builder.start(discard, frames), feed)
}

/// Starts `builder` with a sink whose every write fails.
pub fn with_failing_sink(builder: SessionBuilder) -> (Session, Inbound) {
    let (feed, frames) = inbound();
    let failing: FrameSink = Box::pin(sink::unfold((), |(), _message: Message| async {
        Err::<(), _>(tungstenite::Error::AlreadyClosed)
    }));
    (builder.start(failing, frames), feed)
}
