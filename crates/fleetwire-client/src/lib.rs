//! Client send API for the fleetwire device protocol.
//!
//! [`Client`] wraps one TCP connection and exposes a method per message type
//! (`send_login`, `send_command`, `send_file_meta`, `send_file_chunk`,
//! `send_file_done`, `send_ack`, `send_error`) plus `recv_message` for
//! reading frames sent the other way - a COMMAND pushed by a backend, or an
//! ACK/ERROR replying to something this client sent.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;

pub use client::Client;
pub use error::{ClientError, Result};
