//! Per-opcode payload encoding and decoding.
//!
//! Encoding enforces the field bounds from the wire format up front and
//! fails before anything reaches the transport. Decoding follows the
//! decode-warning policy: a malformed sub-structure never fails the overall
//! decode, it just leaves the affected fields unset. See
//! [`crate::message::DecodedMessage`] for the aggregate result type.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, Result};

/// Maximum length of a device identifier, in bytes.
pub const MAX_DEVICE_ID: usize = 255;
/// Maximum length of a token, in bytes.
pub const MAX_TOKEN: usize = 1024;
/// Maximum length of a session identifier, in bytes.
pub const MAX_SESSION_ID: usize = 128;
/// Maximum length of a filename, in bytes.
pub const MAX_FILENAME: usize = 512;
/// Maximum length of a status message, in bytes.
pub const MAX_STATUS_MESSAGE: usize = 1024;

fn check_bound(field: &'static str, len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(ProtocolError::FieldTooLarge { field, max, actual: len });
    }
    Ok(())
}

fn check_non_empty(field: &'static str, len: usize) -> Result<()> {
    if len == 0 {
        return Err(ProtocolError::FieldEmpty { field });
    }
    Ok(())
}

/// Encodes a LOGIN payload: `u8 dev_len, u16 tok_len (BE), device_id, token`.
///
/// # Errors
///
/// Fails if `device_id` or `token` is empty or exceeds its bound.
pub fn encode_login(device_id: &[u8], token: &[u8]) -> Result<Bytes> {
    check_non_empty("device_id", device_id.len())?;
    check_bound("device_id", device_id.len(), MAX_DEVICE_ID)?;
    check_non_empty("token", token.len())?;
    check_bound("token", token.len(), MAX_TOKEN)?;

    let mut buf = BytesMut::with_capacity(3 + device_id.len() + token.len());
    buf.put_u8(device_id.len() as u8);
    buf.put_u16(token.len() as u16);
    buf.put_slice(device_id);
    buf.put_slice(token);
    Ok(buf.freeze())
}

/// Decoded LOGIN fields. `None` on any field means the sub-structure was
/// malformed and decoding stopped without populating it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoginFields {
    /// Device identifier bytes.
    pub device_id: Option<Bytes>,
    /// Token bytes.
    pub token: Option<Bytes>,
}

/// Decodes a LOGIN payload per the decode-warning policy: returns
/// `LoginFields::default()` (all fields `None`) rather than an error when the
/// structure is truncated or out of bounds.
#[must_use]
pub fn decode_login(payload: &Bytes) -> LoginFields {
    if payload.len() < 3 {
        return LoginFields::default();
    }
    let dev_len = payload[0] as usize;
    let tok_len = u16::from_be_bytes([payload[1], payload[2]]) as usize;

    if dev_len > MAX_DEVICE_ID || tok_len > MAX_TOKEN || payload.len() < 3 + dev_len + tok_len {
        return LoginFields::default();
    }

    let device_id = payload.slice(3..3 + dev_len);
    let token = payload.slice(3 + dev_len..3 + dev_len + tok_len);
    LoginFields { device_id: Some(device_id), token: Some(token) }
}

/// Validates a COMMAND payload: raw opaque bytes, no sub-structure to encode.
///
/// # Errors
///
/// Fails if `payload` is empty or exceeds 1 MiB.
pub fn encode_command(payload: impl Into<Bytes>) -> Result<Bytes> {
    let payload = payload.into();
    check_non_empty("command", payload.len())?;
    check_bound("command", payload.len(), crate::header::FrameHeader::MAX_PAYLOAD_SIZE as usize)?;
    Ok(payload)
}

/// Encodes a FILE_META payload: `u16 name_len (BE), u64 file_size (BE), filename`.
///
/// # Errors
///
/// Fails if `filename` is empty or exceeds its bound.
pub fn encode_file_meta(filename: &[u8], file_size: u64) -> Result<Bytes> {
    check_non_empty("filename", filename.len())?;
    check_bound("filename", filename.len(), MAX_FILENAME)?;

    let mut buf = BytesMut::with_capacity(10 + filename.len());
    buf.put_u16(filename.len() as u16);
    buf.put_u64(file_size);
    buf.put_slice(filename);
    Ok(buf.freeze())
}

/// Decoded FILE_META fields.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileMetaFields {
    /// Filename bytes.
    pub filename: Option<Bytes>,
    /// Total file size in bytes.
    pub file_size: Option<u64>,
}

/// Decodes a FILE_META payload per the decode-warning policy.
#[must_use]
pub fn decode_file_meta(payload: &Bytes) -> FileMetaFields {
    if payload.len() < 10 {
        return FileMetaFields::default();
    }
    let name_len = u16::from_be_bytes([payload[0], payload[1]]) as usize;
    if name_len > MAX_FILENAME || payload.len() < 10 + name_len {
        return FileMetaFields::default();
    }
    let file_size = u64::from_be_bytes(payload[2..10].try_into().expect("8-byte slice"));
    let filename = payload.slice(10..10 + name_len);
    FileMetaFields { filename: Some(filename), file_size: Some(file_size) }
}

/// Encodes a FILE_CHUNK payload:
/// `u8 sid_len, u8 tok_len, session, token, u32 offset (BE), u32 chunk_len (BE), chunk`.
///
/// # Errors
///
/// Fails if `chunk` is empty or exceeds 1 MiB, or if `session_id`/`token`
/// exceed their bounds. `session_id` and `token` may be empty.
pub fn encode_file_chunk(
    session_id: &[u8],
    token: &[u8],
    offset: u32,
    chunk: &[u8],
) -> Result<Bytes> {
    check_bound("session_id", session_id.len(), MAX_SESSION_ID)?;
    check_bound("token", token.len(), MAX_TOKEN)?;
    check_non_empty("chunk", chunk.len())?;
    check_bound("chunk", chunk.len(), crate::header::FrameHeader::MAX_PAYLOAD_SIZE as usize)?;

    let mut buf = BytesMut::with_capacity(2 + session_id.len() + token.len() + 8 + chunk.len());
    buf.put_u8(session_id.len() as u8);
    buf.put_u8(token.len() as u8);
    buf.put_slice(session_id);
    buf.put_slice(token);
    buf.put_u32(offset);
    buf.put_u32(chunk.len() as u32);
    buf.put_slice(chunk);
    Ok(buf.freeze())
}

/// Decoded FILE_CHUNK fields.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileChunkFields {
    /// Session identifier bytes.
    pub session_id: Option<Bytes>,
    /// Token bytes.
    pub token: Option<Bytes>,
    /// Byte offset of this chunk within the file.
    pub chunk_offset: Option<u32>,
    /// Declared length of the chunk data.
    pub chunk_len: Option<u32>,
    /// The chunk data itself.
    pub chunk_data: Option<Bytes>,
}

/// Decodes a FILE_CHUNK payload per the decode-warning policy.
#[must_use]
pub fn decode_file_chunk(payload: &Bytes) -> FileChunkFields {
    if payload.len() < 2 {
        return FileChunkFields::default();
    }
    let sid_len = payload[0] as usize;
    let tok_len = payload[1] as usize;
    let fixed_len = 2 + sid_len + tok_len + 8;

    if sid_len > MAX_SESSION_ID || tok_len > MAX_TOKEN || payload.len() < fixed_len {
        return FileChunkFields::default();
    }

    let mut pos = 2;
    let session_id = payload.slice(pos..pos + sid_len);
    pos += sid_len;
    let token = payload.slice(pos..pos + tok_len);
    pos += tok_len;
    let offset = u32::from_be_bytes(payload[pos..pos + 4].try_into().expect("4-byte slice"));
    pos += 4;
    let chunk_len = u32::from_be_bytes(payload[pos..pos + 4].try_into().expect("4-byte slice"));
    pos += 4;

    if payload.len() < pos + chunk_len as usize {
        return FileChunkFields::default();
    }
    let chunk_data = payload.slice(pos..pos + chunk_len as usize);

    FileChunkFields {
        session_id: Some(session_id),
        token: Some(token),
        chunk_offset: Some(offset),
        chunk_len: Some(chunk_len),
        chunk_data: Some(chunk_data),
    }
}

/// Encodes a FILE_DONE payload: `u8 sid_len, u8 tok_len, session, token`.
///
/// # Errors
///
/// Fails if `session_id`/`token` exceed their bounds. Both may be empty.
pub fn encode_file_done(session_id: &[u8], token: &[u8]) -> Result<Bytes> {
    check_bound("session_id", session_id.len(), MAX_SESSION_ID)?;
    check_bound("token", token.len(), MAX_TOKEN)?;

    let mut buf = BytesMut::with_capacity(2 + session_id.len() + token.len());
    buf.put_u8(session_id.len() as u8);
    buf.put_u8(token.len() as u8);
    buf.put_slice(session_id);
    buf.put_slice(token);
    Ok(buf.freeze())
}

/// Decoded FILE_DONE fields.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileDoneFields {
    /// Session identifier bytes.
    pub session_id: Option<Bytes>,
    /// Token bytes.
    pub token: Option<Bytes>,
}

/// Decodes a FILE_DONE payload per the decode-warning policy.
#[must_use]
pub fn decode_file_done(payload: &Bytes) -> FileDoneFields {
    if payload.len() < 2 {
        return FileDoneFields::default();
    }
    let sid_len = payload[0] as usize;
    let tok_len = payload[1] as usize;

    if sid_len > MAX_SESSION_ID || tok_len > MAX_TOKEN || payload.len() < 2 + sid_len + tok_len {
        return FileDoneFields::default();
    }

    let session_id = payload.slice(2..2 + sid_len);
    let token = payload.slice(2 + sid_len..2 + sid_len + tok_len);
    FileDoneFields { session_id: Some(session_id), token: Some(token) }
}

/// Encodes an ACK or ERROR payload: `u16 status_code (BE), u16 msg_len (BE), message`.
/// Opcode selection (0x06 vs 0x7F) happens one layer up.
///
/// # Errors
///
/// Fails if `message` exceeds its bound. `message` may be empty.
pub fn encode_status(status_code: u16, message: &[u8]) -> Result<Bytes> {
    check_bound("status_message", message.len(), MAX_STATUS_MESSAGE)?;

    let mut buf = BytesMut::with_capacity(4 + message.len());
    buf.put_u16(status_code);
    buf.put_u16(message.len() as u16);
    buf.put_slice(message);
    Ok(buf.freeze())
}

/// Decoded ACK/ERROR fields.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusFields {
    /// Numeric status code.
    pub status_code: Option<u16>,
    /// Status message bytes.
    pub status_message: Option<Bytes>,
}

/// Decodes an ACK or ERROR payload per the decode-warning policy.
#[must_use]
pub fn decode_status(payload: &Bytes) -> StatusFields {
    if payload.len() < 4 {
        return StatusFields::default();
    }
    let status_code = u16::from_be_bytes([payload[0], payload[1]]);
    let msg_len = u16::from_be_bytes([payload[2], payload[3]]) as usize;

    if msg_len > MAX_STATUS_MESSAGE || payload.len() < 4 + msg_len {
        return StatusFields::default();
    }

    let status_message = payload.slice(4..4 + msg_len);
    StatusFields { status_code: Some(status_code), status_message: Some(status_message) }
}
