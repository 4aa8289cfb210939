//! Named payload codec.
//!
//! Every frame body is a protobuf `Wrapper { string name = 1; bytes data = 2; }`.
//! Only those two fields are interpreted; unknown fields are skipped so newer
//! peers can extend the message. Empty fields are omitted on encode, matching
//! proto3 defaults.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CodecError;

const FIELD_NAME: u64 = 1;
const FIELD_DATA: u64 = 2;

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

const MAX_VARINT_LEN: usize = 10;

/// A decoded `(name, payload)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedPayload {
    /// Fully qualified method or notification name.
    pub name: String,
    /// Undecoded message bytes.
    pub payload: Bytes,
}

/// Encodes `name` and `payload` as a wrapper message.
#[must_use]
pub fn wrap_named(name: &str, payload: &[u8]) -> Bytes {
    let mut buffer = BytesMut::with_capacity(encoded_len(name, payload));
    wrap_named_into(&mut buffer, name, payload);
    buffer.freeze()
}

/// Appends the wrapper encoding of `name` and `payload` to `buffer`.
pub fn wrap_named_into(buffer: &mut BytesMut, name: &str, payload: &[u8]) {
    put_len_delimited(buffer, FIELD_NAME, name.as_bytes());
    put_len_delimited(buffer, FIELD_DATA, payload);
}

/// Number of bytes [`wrap_named`] produces for the given inputs.
#[must_use]
pub fn encoded_len(name: &str, payload: &[u8]) -> usize {
    field_len(name.len()) + field_len(payload.len())
}

/// Decodes a wrapper message.
///
/// # Errors
///
/// Returns [`CodecError`] when a field is truncated, a varint overflows, the
/// name is not UTF-8, or a field uses a group wire type.
pub fn unwrap_named(mut body: Bytes) -> Result<NamedPayload, CodecError> {
    let mut raw_name = Bytes::new();
    let mut payload = Bytes::new();

    while body.has_remaining() {
        let key = get_varint(&mut body)?;
        let field = key >> 3;
        let wire_type = u8::try_from(key & 0x07).unwrap_or(u8::MAX);
        match (field, wire_type) {
            (FIELD_NAME, WIRE_LEN) => raw_name = get_len_delimited(&mut body, "name")?,
            (FIELD_DATA, WIRE_LEN) => payload = get_len_delimited(&mut body, "data")?,
            _ => skip_field(&mut body, field, wire_type)?,
        }
    }

    let name = std::str::from_utf8(&raw_name)
        .map_err(CodecError::InvalidName)?
        .to_owned();
    Ok(NamedPayload { name, payload })
}

fn field_len(value_len: usize) -> usize {
    if value_len == 0 {
        0
    } else {
        1 + varint_len(value_len as u64) + value_len
    }
}

const fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

fn put_len_delimited(buffer: &mut BytesMut, field: u64, value: &[u8]) {
    if value.is_empty() {
        return;
    }
    put_varint(buffer, (field << 3) | u64::from(WIRE_LEN));
    put_varint(buffer, value.len() as u64);
    buffer.put_slice(value);
}

fn put_varint(buffer: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buffer.put_u8(u8::try_from(value & 0x7F).unwrap_or(0) | 0x80);
        value >>= 7;
    }
    buffer.put_u8(u8::try_from(value).unwrap_or(0));
}

fn get_varint(buffer: &mut Bytes) -> Result<u64, CodecError> {
    let mut value = 0_u64;
    for index in 0..MAX_VARINT_LEN {
        if !buffer.has_remaining() {
            return Err(CodecError::Truncated { context: "varint" });
        }
        let byte = buffer.get_u8();
        value |= u64::from(byte & 0x7F) << (index * 7);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::VarintOverflow)
}

fn get_len_delimited(buffer: &mut Bytes, context: &'static str) -> Result<Bytes, CodecError> {
    let len = usize::try_from(get_varint(buffer)?).map_err(|_| CodecError::Truncated { context })?;
    if buffer.remaining() < len {
        return Err(CodecError::Truncated { context });
    }
    Ok(buffer.copy_to_bytes(len))
}

fn skip_field(buffer: &mut Bytes, field: u64, wire_type: u8) -> Result<(), CodecError> {
    let skip = match wire_type {
        WIRE_VARINT => return get_varint(buffer).map(drop),
        WIRE_FIXED64 => 8,
        WIRE_FIXED32 => 4,
        WIRE_LEN => {
            get_len_delimited(buffer, "unknown field")?;
            return Ok(());
        }
        _ => return Err(CodecError::UnsupportedWireType { field, wire_type }),
    };
    if buffer.remaining() < skip {
        return Err(CodecError::Truncated {
            context: "unknown field",
        });
    }
    buffer.advance(skip);
    Ok(())
}
