//! Client-level error types.

use thiserror::Error;

/// Errors from connecting or sending/receiving on a [`crate::Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The TCP connection could not be established, or the peer address of
    /// an already-connected stream could not be read.
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// A frame could not be encoded, decoded, or transported. Wraps
    /// `fleetwire-core`'s connection error, which itself wraps both
    /// transport and protocol failures.
    #[error(transparent)]
    Connection(#[from] fleetwire_core::ConnectionError),

    /// A payload failed validation before any bytes were sent - a field
    /// exceeded its bound, or a required field was empty.
    #[error(transparent)]
    Protocol(#[from] fleetwire_proto::ProtocolError),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, ClientError>;
