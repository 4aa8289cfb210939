//! Scripted gateway peer speaking over an in-memory websocket.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::DuplexStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async, client_async};

use crate::envelope::{Envelope, MessageKind, encode};
use crate::session::{Session, SessionBuilder};
use crate::wrapper::unwrap_named;

/// How long the peer waits for the client before failing a test.
pub const PEER_PATIENCE: Duration = Duration::from_secs(5);

/// A request as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedRequest {
    /// Sequence chosen by the client.
    pub sequence: u16,
    /// Method name from the wrapper.
    pub name: String,
    /// Request payload from the wrapper.
    pub payload: Bytes,
    /// The frame exactly as written by the client.
    pub raw: Bytes,
}

/// The gateway end of a session under test.
pub struct FakePeer {
    stream: WebSocketStream<DuplexStream>,
}

/// Starts `builder` against a fresh in-memory peer.
pub async fn connected(builder: SessionBuilder) -> (Session, FakePeer) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (client, server) = tokio::join!(
        client_async("ws://localhost/gateway", client_io),
        accept_async(server_io),
    );
    let (client_ws, _response) = client.expect("client handshake failed");
    let server_ws = server.expect("server handshake failed");
    (builder.attach(client_ws), FakePeer { stream: server_ws })
}

impl FakePeer {
    /// Next data or close message from the client; `None` when the stream
    /// ended.
    pub async fn next_message(&mut self) -> Option<Message> {
        loop {
            let next = tokio::time::timeout(PEER_PATIENCE, self.stream.next())
                .await
                .expect("client went quiet");
            match next {
                None | Some(Err(_)) => return None,
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(message)) => return Some(message),
            }
        }
    }

    /// Reads the next request frame.
    pub async fn next_request(&mut self) -> ReceivedRequest {
        let message = self.next_message().await.expect("stream ended");
        let Message::Binary(data) = message else {
            panic!("expected a binary frame, got {message:?}");
        };
        let raw = Bytes::from(data);
        let envelope = Envelope::decode(raw.clone()).expect("client frame should decode");
        assert_eq!(envelope.kind, MessageKind::Request);
        let named = unwrap_named(envelope.body).expect("client wrapper should decode");
        ReceivedRequest {
            sequence: envelope.sequence.expect("requests carry a sequence"),
            name: named.name,
            payload: named.payload,
            raw,
        }
    }

    /// Answers `sequence` with `payload`.
    pub async fn reply(&mut self, sequence: u16, payload: &[u8]) {
        let frame = encode(MessageKind::Response, "", Some(sequence), payload)
            .expect("response should encode");
        self.send_raw(frame.to_vec()).await;
    }

    /// Pushes a notification.
    pub async fn notify(&mut self, name: &str, payload: &[u8]) {
        let frame = encode(MessageKind::Notify, name, None, payload).expect("notify should encode");
        self.send_raw(frame.to_vec()).await;
    }

    /// Sends a request of the peer's own.
    pub async fn request(&mut self, sequence: u16, name: &str) {
        let frame = encode(MessageKind::Request, name, Some(sequence), &[])
            .expect("request should encode");
        self.send_raw(frame.to_vec()).await;
    }

    /// Writes arbitrary bytes as one binary message.
    pub async fn send_raw(&mut self, bytes: Vec<u8>) {
        self.stream
            .send(Message::binary(bytes))
            .await
            .expect("peer write failed");
    }

    /// Closes the connection from the gateway side.
    pub async fn close(&mut self) {
        self.stream.close(None).await.expect("peer close failed");
    }

    /// Waits for the client's close frame, then asserts nothing follows it.
    ///
    /// Frames written before the close are skipped.
    pub async fn expect_closed(&mut self) {
        loop {
            match self.next_message().await {
                None | Some(Message::Close(_)) => break,
                Some(_) => {}
            }
        }
        while let Some(message) = self.next_message().await {
            assert!(
                matches!(message, Message::Close(_)),
                "frame written after close: {message:?}"
            );
        }
    }

    /// Asserts the connection ends without another data frame.
    pub async fn expect_disconnect(&mut self) {
        while let Some(message) = self.next_message().await {
            assert!(
                matches!(message, Message::Close(_)),
                "unexpected frame: {message:?}"
            );
        }
    }

}
