//! Aggregate decoded message type.

use bytes::Bytes;

use crate::{opcode::Opcode, payloads};

/// A frame's payload, decoded as far as the decode-warning policy allows.
///
/// Only the fields relevant to `opcode` are ever populated; fields that do
/// not apply to this opcode are always `None`. Fields that do apply but
/// whose sub-structure was malformed are also `None` - this layer never
/// fails, it just tells the caller what it could not make sense of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Raw wire opcode byte.
    pub opcode_raw: u8,
    /// Recognized opcode, if any.
    pub opcode: Option<Opcode>,
    /// Raw payload bytes, always present regardless of sub-decode success.
    pub raw: Bytes,

    /// Device identifier (LOGIN).
    pub device_id: Option<Bytes>,
    /// Token (LOGIN, FILE_CHUNK, FILE_DONE).
    pub token: Option<Bytes>,
    /// Session identifier (FILE_CHUNK, FILE_DONE).
    pub session_id: Option<Bytes>,
    /// Filename (FILE_META).
    pub filename: Option<Bytes>,
    /// Total file size (FILE_META).
    pub file_size: Option<u64>,
    /// Chunk offset (FILE_CHUNK).
    pub chunk_offset: Option<u32>,
    /// Chunk length (FILE_CHUNK).
    pub chunk_len: Option<u32>,
    /// Chunk data (FILE_CHUNK).
    pub chunk_data: Option<Bytes>,
    /// Status code (ACK, ERROR).
    pub status_code: Option<u16>,
    /// Status message (ACK, ERROR).
    pub status_message: Option<Bytes>,
}

impl DecodedMessage {
    /// Decodes `payload` according to `opcode_raw`'s sub-structure.
    ///
    /// Never fails: an unrecognized opcode or a malformed sub-structure just
    /// leaves the relevant fields `None`.
    #[must_use]
    pub fn decode(opcode_raw: u8, payload: Bytes) -> Self {
        let opcode = Opcode::from_u8(opcode_raw);
        let mut msg = Self {
            opcode_raw,
            opcode,
            raw: payload.clone(),
            device_id: None,
            token: None,
            session_id: None,
            filename: None,
            file_size: None,
            chunk_offset: None,
            chunk_len: None,
            chunk_data: None,
            status_code: None,
            status_message: None,
        };

        match opcode {
            Some(Opcode::Login) => {
                let fields = payloads::decode_login(&payload);
                msg.device_id = fields.device_id;
                msg.token = fields.token;
            },
            Some(Opcode::Command) => {},
            Some(Opcode::FileMeta) => {
                let fields = payloads::decode_file_meta(&payload);
                msg.filename = fields.filename;
                msg.file_size = fields.file_size;
            },
            Some(Opcode::FileChunk) => {
                let fields = payloads::decode_file_chunk(&payload);
                msg.session_id = fields.session_id;
                msg.token = fields.token;
                msg.chunk_offset = fields.chunk_offset;
                msg.chunk_len = fields.chunk_len;
                msg.chunk_data = fields.chunk_data;
            },
            Some(Opcode::FileDone) => {
                let fields = payloads::decode_file_done(&payload);
                msg.session_id = fields.session_id;
                msg.token = fields.token;
            },
            Some(Opcode::Ack | Opcode::Error) => {
                let fields = payloads::decode_status(&payload);
                msg.status_code = fields.status_code;
                msg.status_message = fields.status_message;
            },
            None => {},
        }

        msg
    }
}
