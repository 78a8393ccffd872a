//! Error types for the transport and connection layers.
//!
//! Mirrors the taxonomy in the design's error-handling section: I/O-primitive
//! failures are [`TransportError`] (taxonomy item 2), and [`ConnectionError`]
//! is the `?`-friendly union of transport and protocol-codec failures at the
//! frame-loop boundary (taxonomy item 5, connection-scoped).

use fleetwire_proto::ProtocolError;
use thiserror::Error;

/// Failures from the interrupt-safe send/receive primitives in [`crate::io`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed its write half (a zero-length read) before the
    /// requested number of bytes arrived.
    #[error("connection closed by peer after {received} of {expected} bytes")]
    ClosedByPeer {
        /// Bytes received before the peer closed.
        received: usize,
        /// Bytes the caller asked for.
        expected: usize,
    },

    /// `write` reported zero bytes written, which on a stream socket means
    /// the peer has gone away.
    #[error("write returned zero bytes; peer is gone")]
    ZeroWrite,

    /// Any other I/O failure (reset, timeout, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by a [`crate::Connection`]'s frame-level operations.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The underlying socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The frame envelope itself was malformed: oversize or truncated.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, ConnectionError>;
