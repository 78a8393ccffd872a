//! Wire frame codec for the fleetwire device protocol.
//!
//! A frame is a 5-byte envelope (opcode + big-endian length) followed by a
//! payload whose internal structure depends on the opcode. This crate owns
//! the envelope (`header`, `frame`) and the per-opcode sub-structures
//! (`payloads`, `message`). It does no I/O - see `fleetwire-core` for the
//! socket-facing read/write primitives that sit on top of it.

pub mod error;
pub mod frame;
pub mod header;
pub mod message;
pub mod opcode;
pub mod payloads;

pub use error::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use message::DecodedMessage;
pub use opcode::Opcode;
