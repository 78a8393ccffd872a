//! Fleetwire device protocol server.
//!
//! A plain-TCP server for the length-prefixed frame protocol in
//! `fleetwire-proto`: [`tcp_server::TcpServer`] accepts connections,
//! [`protocol_server::ProtocolServer`] drives each connection's frame loop
//! and sticky device id, and [`registry::DeviceRegistry`] tracks which
//! device id is reachable on which connection so a backend can push a
//! COMMAND frame to it.
//!
//! # Components
//!
//! - [`TcpServer`]: accept loop with graceful shutdown
//! - [`ProtocolServer`]: per-connection frame loop, LOGIN registration,
//!   handler dispatch
//! - [`DeviceRegistry`]: concurrent `device_id → connection` map
//! - [`ServerConfig`]: bind address, backlog, and replacement policy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod protocol_server;
pub mod registry;
pub mod tcp_server;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use protocol_server::{BoxFuture, ConnectionContext, ProtocolHandler, ProtocolServer};
pub use registry::{DeviceConnection, DeviceRegistry, SendToDeviceError};
pub use tcp_server::{TcpServer, TcpServerConfig, DEFAULT_BACKLOG};
