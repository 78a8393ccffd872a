//! Server configuration.

use std::net::SocketAddr;

use crate::tcp_server::DEFAULT_BACKLOG;

/// Runtime configuration for a [`crate::TcpServer`] plus
/// [`crate::ProtocolServer`] pair.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind and listen on.
    pub bind_addr: SocketAddr,
    /// Listen backlog passed to `listen(2)`. Defaults to 16.
    pub backlog: i32,
    /// Whether a LOGIN that displaces another connection's registration
    /// also force-closes that prior connection. Defaults to `false`: the
    /// displaced connection is simply no longer reachable via
    /// `send_to_device` until it reconnects or its socket errors out on its
    /// own.
    pub force_close_on_login_replacement: bool,
}

impl ServerConfig {
    /// Builds a config for `bind_addr` with the documented defaults.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            backlog: DEFAULT_BACKLOG,
            force_close_on_login_replacement: false,
        }
    }
}
