//! Frame type codes.

/// A recognized frame type.
///
/// Values are the wire opcode bytes from the frame header. An opcode byte
/// that does not match any variant is not an error at this layer - it is
/// simply left unrecognized and carried as raw payload (see
/// [`crate::DecodedMessage`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Device authentication: device id + token.
    Login = 0x01,
    /// Opaque command payload, interpreted by the caller.
    Command = 0x02,
    /// File transfer metadata: name + total size.
    FileMeta = 0x03,
    /// One chunk of file data at a given offset.
    FileChunk = 0x04,
    /// Marks a file transfer complete.
    FileDone = 0x05,
    /// Status acknowledgement.
    Ack = 0x06,
    /// Status failure; same layout as [`Opcode::Ack`].
    Error = 0x7F,
}

impl Opcode {
    /// Maps a wire byte to a recognized opcode, if any.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Login),
            0x02 => Some(Self::Command),
            0x03 => Some(Self::FileMeta),
            0x04 => Some(Self::FileChunk),
            0x05 => Some(Self::FileDone),
            0x06 => Some(Self::Ack),
            0x7F => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns the wire byte for this opcode.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}
