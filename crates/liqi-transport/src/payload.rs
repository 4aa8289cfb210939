//! Typed request and reply messages.
//!
//! The transport never interprets payloads. Collaborators implement
//! [`Payload`] for their message types (typically generated protobuf
//! structs); [`Raw`] and [`Json`] cover untyped and serde-based traffic.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

/// A message that can be carried inside a named payload wrapper.
pub trait Payload: Sized + Send + Sync + 'static {
    /// Serialises the message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the message cannot be encoded.
    fn encode(&self) -> Result<Vec<u8>, CodecError>;

    /// Parses the message from the wrapper's data field.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the bytes do not form a valid message.
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

/// The empty message. Decoding ignores any content.
impl Payload for () {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }

    fn decode(_bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(())
    }
}

/// Bytes passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raw(pub Bytes);

impl Raw {
    /// Borrows the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Raw {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Raw {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

impl Payload for Raw {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(self.0.to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(Self(Bytes::copy_from_slice(bytes)))
    }
}

/// A serde type carried as JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Payload for Json<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(Self(serde_json::from_slice(bytes)?))
    }
}
