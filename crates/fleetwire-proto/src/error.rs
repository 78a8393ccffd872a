//! Error type for the frame codec.

use thiserror::Error;

/// Errors produced while encoding or decoding frames.
///
/// These correspond to the "argument error" and "protocol error" taxonomy
/// entries: failures that are detected before any I/O (bounds violations on
/// the sender side) or that make a connection unusable (oversize or
/// truncated frames on the receiver side). Malformed *sub-structures* within
/// an otherwise well-formed frame are not represented here - per the
/// decode-warning policy, those leave fields unset on [`crate::DecodedMessage`]
/// rather than producing an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The declared payload length exceeds [`crate::header::MAX_PAYLOAD_SIZE`].
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Declared or actual size in bytes.
        size: usize,
        /// Maximum permitted size in bytes.
        max: usize,
    },

    /// Fewer bytes were available than the frame declared.
    #[error("frame truncated: expected {expected} bytes, got {actual}")]
    FrameTruncated {
        /// Bytes the header promised.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// A caller-supplied field exceeds its protocol bound.
    #[error("field '{field}' is {actual} bytes, exceeds maximum {max}")]
    FieldTooLarge {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted size in bytes.
        max: usize,
        /// Actual size supplied.
        actual: usize,
    },

    /// A caller-supplied field that must be non-empty was empty.
    #[error("field '{field}' must not be empty")]
    FieldEmpty {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Convenience alias for results from this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;
