//! Outer binary frame carried in each websocket message.
//!
//! ```text
//! byte 0      kind (1 = notify, 2 = request, 3 = response)
//! bytes 1..3  sequence, little-endian u16 (request and response only)
//! remainder   named payload wrapper
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::wrapper::{encoded_len, wrap_named_into};

/// Frame kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Unsolicited message from the peer. Carries no sequence.
    Notify,
    /// A call expecting a response with the same sequence.
    Request,
    /// Reply to an earlier request.
    Response,
}

impl MessageKind {
    /// Wire tag for this kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Notify => 1,
            Self::Request => 2,
            Self::Response => 3,
        }
    }

    /// Parses a wire tag.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownKind`] for any other value.
    pub const fn from_tag(tag: u8) -> Result<Self, FrameError> {
        match tag {
            1 => Ok(Self::Notify),
            2 => Ok(Self::Request),
            3 => Ok(Self::Response),
            other => Err(FrameError::UnknownKind(other)),
        }
    }

    /// Whether frames of this kind carry a sequence number.
    #[must_use]
    pub const fn carries_sequence(self) -> bool {
        !matches!(self, Self::Notify)
    }

    /// Length of the fixed header preceding the wrapper.
    #[must_use]
    pub const fn header_len(self) -> usize {
        if self.carries_sequence() { 3 } else { 1 }
    }
}

/// A decoded frame whose body has not yet been unwrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Frame kind.
    pub kind: MessageKind,
    /// Sequence number, present for requests and responses.
    pub sequence: Option<u16>,
    /// Encoded named payload wrapper.
    pub body: Bytes,
}

impl Envelope {
    /// Splits a raw frame into its header fields and body.
    ///
    /// A frame consisting only of its header is valid and yields an empty
    /// body.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the frame is empty, the kind is unknown, or
    /// the frame is shorter than the header for its kind.
    pub fn decode(frame: Bytes) -> Result<Self, FrameError> {
        let (&tag, rest) = frame.split_first().ok_or(FrameError::Empty)?;
        let kind = MessageKind::from_tag(tag)?;
        let header_len = kind.header_len();
        if frame.len() < header_len {
            return Err(FrameError::TooShort {
                kind,
                len: frame.len(),
                minimum: header_len,
            });
        }

        let sequence = if kind.carries_sequence() {
            match rest {
                [low, high, ..] => Some(sequence_from_le([*low, *high])),
                _ => None,
            }
        } else {
            None
        };
        Ok(Self {
            kind,
            sequence,
            body: frame.slice(header_len..),
        })
    }
}

/// Encodes a complete frame for `name` and an already encoded `payload`.
///
/// # Errors
///
/// Returns [`FrameError::SequenceMismatch`] when `sequence` is supplied for a
/// notification or omitted for a request or response.
pub fn encode(
    kind: MessageKind,
    name: &str,
    sequence: Option<u16>,
    payload: &[u8],
) -> Result<Bytes, FrameError> {
    if kind.carries_sequence() != sequence.is_some() {
        return Err(FrameError::SequenceMismatch { kind });
    }
    let mut frame = BytesMut::with_capacity(kind.header_len() + encoded_len(name, payload));
    frame.put_u8(kind.tag());
    if let Some(value) = sequence {
        frame.put_slice(&sequence_to_le(value));
    }
    wrap_named_into(&mut frame, name, payload);
    Ok(frame.freeze())
}

/// Builds a request frame around an already wrapped named payload.
///
/// The session wraps payloads before taking the write lock, so only the
/// header is produced while the lock is held.
#[must_use]
pub fn request_frame(sequence: u16, wrapped: &[u8]) -> Vec<u8> {
    let header_len = MessageKind::Request.header_len();
    let mut frame = Vec::with_capacity(header_len + wrapped.len());
    frame.push(MessageKind::Request.tag());
    frame.extend_from_slice(&sequence_to_le(sequence));
    frame.extend_from_slice(wrapped);
    frame
}

#[expect(
    clippy::little_endian_bytes,
    reason = "the gateway fixes sequence numbers as little-endian"
)]
const fn sequence_to_le(sequence: u16) -> [u8; 2] {
    sequence.to_le_bytes()
}

#[expect(
    clippy::little_endian_bytes,
    reason = "the gateway fixes sequence numbers as little-endian"
)]
const fn sequence_from_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}
