//! Frame type: a header paired with its payload bytes.

use bytes::{BufMut, Bytes};

use crate::{
    error::{ProtocolError, Result},
    header::FrameHeader,
};

/// A complete frame: the 5-byte envelope plus its payload.
///
/// This is a pure data holder. Sub-structure parsing (LOGIN fields, FILE_META
/// fields, and so on) happens one layer up, in [`crate::message::DecodedMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame envelope.
    pub header: FrameHeader,
    /// Raw payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Builds a frame, computing the header from `opcode` and the payload length.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if `payload` exceeds
    /// [`FrameHeader::MAX_PAYLOAD_SIZE`].
    pub fn new(opcode: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let payload_len = u32::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
        })?;
        let header = FrameHeader::new(opcode, payload_len)?;
        Ok(Self { header, payload })
    }

    /// Encodes the frame (header then payload) into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);
    }

    /// Decodes a complete frame from an in-memory buffer.
    ///
    /// Used by tests and by callers that already have the whole frame
    /// buffered; the server and client read the header and payload as two
    /// separate `recv_exact` calls instead (see `fleetwire-core`).
    ///
    /// # Errors
    ///
    /// Returns an error if the header is malformed or fewer payload bytes are
    /// present than the header declares.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let payload_len = header.payload_len() as usize;
        let total = FrameHeader::SIZE + payload_len;

        if bytes.len() < total {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_len,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        }

        let payload = Bytes::copy_from_slice(&bytes[FrameHeader::SIZE..total]);
        Ok(Self { header, payload })
    }
}
