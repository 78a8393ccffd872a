//! Transport primitives shared by the fleetwire server and client.
//!
//! This crate owns everything between a raw [`tokio::net::TcpStream`] and the
//! frame codec in `fleetwire-proto`: the interrupt-safe send/receive loops
//!, the [`Connection`] handle that pairs a socket with
//! its sticky device id, and the one-shot process init that disables
//! `SIGPIPE` so a broken pipe surfaces as an `Err` instead of killing the
//! process.
//!
//! It does not know about device registries, accept loops, or callback
//! dispatch - those live in `fleetwire-server` and `fleetwire-client`, which
//! both build on top of [`Connection`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod error;
pub mod io;
pub mod platform;

pub use connection::{Connection, FrameReader, FrameWriter};
pub use error::{ConnectionError, Result, TransportError};
pub use platform::network_init;
