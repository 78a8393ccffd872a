//! Accept loop over a bound TCP listener, with graceful shutdown.
//!
//! Mirrors the C original's `tcp_server_t`: a listening socket, a background
//! accept task, and an atomic `running` flag that `stop()` flips with a
//! compare-and-swap before unblocking the accept task by dropping the
//! listener. Each accepted connection is handed to a caller-supplied handler
//! on its own spawned task; the accept loop itself never blocks on a
//! connection's lifetime.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::{
    net::{TcpListener, TcpSocket, TcpStream},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::error::{Result, ServerError};

/// Default listen backlog when a [`TcpServerConfig`] does not override it.
pub const DEFAULT_BACKLOG: i32 = 16;

/// Bind parameters for a [`TcpServer`].
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// Address to bind and listen on.
    pub bind_addr: SocketAddr,
    /// Listen backlog passed to `listen(2)`.
    pub backlog: i32,
}

impl TcpServerConfig {
    /// Builds a config for `bind_addr` with the default backlog.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self { bind_addr, backlog: DEFAULT_BACKLOG }
    }
}

/// A bound listener plus its accept task, stoppable from any thread.
pub struct TcpServer {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    accept_task: Option<JoinHandle<()>>,
}

impl TcpServer {
    /// Binds `config.bind_addr` with `SO_REUSEADDR` set and the configured
    /// backlog, and spawns the accept loop, handing each accepted stream to
    /// `on_accept`.
    ///
    /// `on_accept` is spawned as its own task per connection; a panic or
    /// long-running handler in one connection never blocks accepting others.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the socket cannot be created, have
    /// `SO_REUSEADDR` set, bound, or put into listening mode.
    pub fn bind<F>(config: TcpServerConfig, on_accept: F) -> Result<Self>
    where
        F: Fn(TcpStream) + Send + Sync + 'static,
    {
        let socket = if config.bind_addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|source| ServerError::Bind { addr: config.bind_addr.to_string(), source })?;

        socket
            .set_reuseaddr(true)
            .map_err(|source| ServerError::Bind { addr: config.bind_addr.to_string(), source })?;
        socket
            .bind(config.bind_addr)
            .map_err(|source| ServerError::Bind { addr: config.bind_addr.to_string(), source })?;

        let listener = socket
            .listen(u32::try_from(config.backlog.max(1)).unwrap_or(DEFAULT_BACKLOG as u32))
            .map_err(|source| ServerError::Bind { addr: config.bind_addr.to_string(), source })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr: config.bind_addr.to_string(), source })?;

        let running = Arc::new(AtomicBool::new(true));
        let accept_task = tokio::spawn(accept_loop(listener, Arc::clone(&running), on_accept));

        info!(%local_addr, backlog = config.backlog, "tcp server listening");

        Ok(Self { local_addr, running, accept_task: Some(accept_task) })
    }

    /// The address actually bound, useful when `bind_addr`'s port was 0.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signals the accept loop to stop and waits for it to exit.
    ///
    /// Idempotent: a second call observes `running` already `false` and
    /// returns immediately. Connections already accepted are not affected -
    /// this only stops accepting new ones.
    pub async fn stop(&mut self) {
        if self.running.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire).is_err()
        {
            return;
        }

        if let Some(task) = self.accept_task.take() {
            task.abort();
            let _ = task.await;
        }

        info!(local_addr = %self.local_addr, "tcp server stopped");
    }
}

async fn accept_loop<F>(listener: TcpListener, running: Arc<AtomicBool>, on_accept: F)
where
    F: Fn(TcpStream) + Send + Sync + 'static,
{
    while running.load(Ordering::Acquire) {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                info!(%peer_addr, "accepted connection");
                on_accept(stream);
            },
            Err(err) => {
                warn!(%err, "transient accept error; continuing");
            },
        }
    }
}
