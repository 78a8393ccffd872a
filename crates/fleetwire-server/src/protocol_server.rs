//! Per-connection frame loop: sticky device id, LOGIN registration, and
//! handler dispatch.
//!
//! This is a direct translation of the C original's
//! `protocol_connection_handler`: read one message, backfill or update the
//! sticky device id, register on LOGIN, hand the message to the caller's
//! handler, and repeat until the read fails or a shutdown is requested. On
//! exit, the registry entry is removed *before* `on_disconnect` fires, so a
//! handler that calls `is_online` from inside its own disconnect callback
//! observes the device as already offline. `on_disconnect` only fires when a
//! sticky device id was established, matching the original's
//! `last_device[0] != '\0'` guard.

use std::{future::Future, net::SocketAddr, pin::Pin, sync::Arc};

use bytes::Bytes;
use fleetwire_core::Connection;
use fleetwire_proto::{DecodedMessage, Opcode};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::registry::{DeviceRegistry, RegisteredConnection};

/// A boxed, owned future - the shape a [`ProtocolHandler`] callback returns.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Snapshot of a connection's identity at the moment a callback fires.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// The connection's remote address, if known.
    pub peer_addr: Option<SocketAddr>,
    /// The sticky device id seen so far on this connection, if any.
    pub device_id: Option<Bytes>,
}

/// Caller-supplied message and disconnect callbacks for a [`ProtocolServer`].
///
/// Dispatch is synchronous with respect to the connection's own frame loop:
/// the next frame is not read until the current callback's future resolves,
/// matching the one-message-at-a-time processing of the C original.
pub trait ProtocolHandler: Send + Sync + 'static {
    /// Called once per successfully decoded frame.
    fn on_message(&self, ctx: ConnectionContext, message: DecodedMessage) -> BoxFuture<()>;

    /// Called once when the connection's read loop ends, after its registry
    /// entry (if any) has already been removed.
    fn on_disconnect(&self, ctx: ConnectionContext) -> BoxFuture<()>;
}

/// Drives accepted connections through the frame loop described above.
pub struct ProtocolServer<H> {
    registry: Arc<DeviceRegistry>,
    handler: Arc<H>,
    force_close_on_login_replacement: bool,
}

impl<H: ProtocolHandler> ProtocolServer<H> {
    /// Builds a protocol server over `registry`, dispatching to `handler`.
    ///
    /// `force_close_on_login_replacement` controls whether a LOGIN that
    /// displaces another connection's registration also tears down that
    /// prior connection: its read loop is notified and exits on its next
    /// poll, running the same disconnect path a socket error would. The
    /// default elsewhere in this crate is `false`, so a replaced device
    /// simply stops receiving further sends until it reconnects or its own
    /// socket errors out.
    #[must_use]
    pub fn new(
        registry: Arc<DeviceRegistry>,
        handler: Arc<H>,
        force_close_on_login_replacement: bool,
    ) -> Self {
        Self { registry, handler, force_close_on_login_replacement }
    }

    /// A closure suitable for [`crate::tcp_server::TcpServer::bind`]'s
    /// `on_accept`: spawns [`Self::run_connection`] on its own task per
    /// accepted stream.
    #[must_use]
    pub fn accept_callback(self: &Arc<Self>) -> impl Fn(TcpStream) + Send + Sync + 'static {
        let this = Arc::clone(self);
        move |stream: TcpStream| {
            let this = Arc::clone(&this);
            tokio::spawn(async move { this.run_connection(stream).await });
        }
    }

    /// Runs the frame loop for one accepted connection to completion.
    pub async fn run_connection(&self, stream: TcpStream) {
        let peer_addr = stream.peer_addr().ok();

        let conn = match Connection::from_tcp_stream(stream) {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "failed to read peer address for accepted stream");
                return;
            },
        };

        let (mut reader, writer) = conn.into_split();
        let writer = Arc::new(RegisteredConnection::new(writer));

        let mut sticky_device_id: Option<Bytes> = None;

        loop {
            let mut message = tokio::select! {
                biased;

                () = writer.shutdown_requested() => {
                    debug!(?peer_addr, "connection force-closed by a login replacement");
                    break;
                },

                result = reader.read_message() => match result {
                    Ok(message) => message,
                    Err(err) => {
                        debug!(?peer_addr, %err, "connection read loop ended");
                        break;
                    },
                },
            };

            match message.device_id.clone() {
                Some(device_id) => {
                    sticky_device_id = Some(device_id.clone());
                    if message.opcode == Some(Opcode::Login) {
                        self.register(device_id, &writer);
                    }
                },
                None => {
                    message.device_id = sticky_device_id.clone();
                },
            }

            let ctx = ConnectionContext { peer_addr, device_id: sticky_device_id.clone() };
            self.handler.on_message(ctx, message).await;
        }

        if let Some(device_id) = &sticky_device_id {
            self.registry.remove_if_current(device_id, &writer);
        }

        if sticky_device_id.is_some() {
            let ctx = ConnectionContext { peer_addr, device_id: sticky_device_id };
            self.handler.on_disconnect(ctx).await;
        }
    }

    fn register(&self, device_id: Bytes, writer: &crate::registry::DeviceConnection) {
        if self.force_close_on_login_replacement {
            // The displaced connection's own read loop observes this on its
            // next select iteration and tears itself down, going through the
            // same disconnect path a real socket error would.
            if let Some(previous) = self.registry.get(&device_id) {
                if !Arc::ptr_eq(&previous, writer) {
                    previous.request_shutdown();
                }
            }
        }
        self.registry.set(device_id, Arc::clone(writer));
    }
}
