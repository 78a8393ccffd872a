//! Server-level error types.

use thiserror::Error;

/// Errors from creating, running, or stopping a TCP or protocol server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// An argument failed validation before any I/O was attempted (e.g. an
    /// invalid port or an unresolvable host).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Binding or listening on the resolved address failed. Fatal for that
    /// `create` call; there is no retry.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A per-connection transport or protocol failure, surfaced from
    /// `fleetwire-core`.
    #[error(transparent)]
    Connection(#[from] fleetwire_core::ConnectionError),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, ServerError>;
