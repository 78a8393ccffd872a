//! Device registry: concurrent `device_id → connection` mapping.
//!
//! The mapping is `device_id → latest connection`: at most one entry per
//! device, a later LOGIN from a different connection replaces the prior
//! entry without forcibly closing it, and a connection's entry is only
//! removed on disconnect if it is still the current entry for that device -
//! otherwise a race would clobber a newer registration.
//!
//! All state lives under one `std::sync::Mutex`, held only for the duration
//! of a map operation and never across the `.await` of an outbound write -
//! `send_to_device` resolves the entry under the lock, drops the guard, and
//! only then writes to the socket, so registry latency never compounds with
//! network latency under contention.

use std::{collections::HashMap, sync::Mutex};

use bytes::Bytes;
use fleetwire_core::{ConnectionError, FrameWriter};
use fleetwire_proto::Opcode;
use thiserror::Error;
use tokio::{
    io::WriteHalf,
    net::TcpStream,
    sync::{Mutex as AsyncMutex, Notify},
};

/// A registered connection's write half, plus a cooperative shutdown signal.
///
/// Writers are serialized by the inner async mutex; the `Arc` is what lets
/// [`DeviceRegistry::remove_if_current`] tell "this is the same connection"
/// apart from "this is a different connection that happens to be registered
/// under the same device id" via pointer identity.
///
/// `tokio::io::split` keeps the underlying stream alive as long as either its
/// read or write half still exists, so dropping just this struct's `Arc`
/// clone never closes the socket or unblocks a pending read on the other
/// half. A real force-close instead goes through `shutdown`: the connection's
/// own read loop races `read_message` against `shutdown_requested` in a
/// `tokio::select!` and tears itself down when notified.
pub struct RegisteredConnection {
    writer: AsyncMutex<FrameWriter<WriteHalf<TcpStream>>>,
    shutdown: Notify,
}

impl RegisteredConnection {
    /// Wraps a split writer half with no shutdown request pending.
    #[must_use]
    pub fn new(writer: FrameWriter<WriteHalf<TcpStream>>) -> Self {
        Self { writer: AsyncMutex::new(writer), shutdown: Notify::new() }
    }

    /// Signals this connection's read loop to tear down at its next poll.
    ///
    /// A single notification is enough: `Notify` latches one permit even if
    /// `shutdown_requested` is not yet being awaited, so the request is never
    /// lost to a race with the read loop's own select.
    pub fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Resolves once [`Self::request_shutdown`] has been called.
    pub async fn shutdown_requested(&self) {
        self.shutdown.notified().await;
    }
}

/// Shared handle to a registered connection, as stored in the registry.
pub type DeviceConnection = std::sync::Arc<RegisteredConnection>;

/// Errors from [`DeviceRegistry::send_to_device`].
#[derive(Debug, Error)]
pub enum SendToDeviceError {
    /// No connection is currently registered for this device id.
    #[error("device is not registered")]
    NotFound,

    /// The registered connection's write failed. The registry evicts the
    /// entry eagerly on this path.
    #[error("send to device failed: {0}")]
    Send(#[source] ConnectionError),
}

/// Concurrent mapping from device id to the connection that most recently
/// logged in with that id.
#[derive(Default)]
pub struct DeviceRegistry {
    entries: Mutex<HashMap<Bytes, DeviceConnection>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the entry for `device_id`.
    ///
    /// A later call with the same `device_id` and a different connection
    /// displaces the prior entry; the prior connection is not closed by this
    /// call, only removed from dispatch.
    pub fn set(&self, device_id: Bytes, conn: DeviceConnection) {
        self.entries.lock().expect("registry mutex poisoned").insert(device_id, conn);
    }

    /// Looks up the current connection for `device_id`, if any.
    #[must_use]
    pub fn get(&self, device_id: &[u8]) -> Option<DeviceConnection> {
        self.entries.lock().expect("registry mutex poisoned").get(device_id).cloned()
    }

    /// Removes the entry for `device_id` only if `conn` is still its current
    /// connection.
    ///
    /// This is the guard against the disconnect race:
    /// connection that has already been displaced by a newer LOGIN for the
    /// same device id must not erase that newer registration when it
    /// eventually tears down.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove_if_current(&self, device_id: &[u8], conn: &DeviceConnection) -> bool {
        let mut entries = self.entries.lock().expect("registry mutex poisoned");
        match entries.get(device_id) {
            Some(current) if std::sync::Arc::ptr_eq(current, conn) => {
                entries.remove(device_id);
                true
            },
            _ => false,
        }
    }

    /// Whether any connection is currently registered for `device_id`.
    #[must_use]
    pub fn is_online(&self, device_id: &[u8]) -> bool {
        self.entries.lock().expect("registry mutex poisoned").contains_key(device_id)
    }

    /// Resolves `device_id` and writes a COMMAND frame carrying
    /// `command_bytes` to its connection, outside the registry lock.
    ///
    /// # Errors
    ///
    /// Returns [`SendToDeviceError::NotFound`] if the device is not
    /// registered. Returns [`SendToDeviceError::Send`] if the write fails; in
    /// that case the registry entry is evicted eagerly, since the connection
    /// is now known-bad (eager eviction is preferred
    /// over waiting for the connection's own disconnect path).
    pub async fn send_to_device(
        &self,
        device_id: &[u8],
        command_bytes: impl Into<Bytes>,
    ) -> Result<(), SendToDeviceError> {
        let conn = self.get(device_id).ok_or(SendToDeviceError::NotFound)?;

        let result = {
            let mut writer = conn.writer.lock().await;
            writer.write_frame(Opcode::Command.to_u8(), command_bytes.into()).await
        };

        result.map_err(|err| {
            self.remove_if_current(device_id, &conn);
            SendToDeviceError::Send(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn dummy_connection() -> DeviceConnection {
        let (_client, server) = tokio::io::duplex(4096);
        let (_reader, writer) = fleetwire_core::Connection::new(server).into_split();
        Arc::new(RegisteredConnection::new(writer))
    }

    #[test]
    fn get_on_unregistered_device_is_none() {
        let registry = DeviceRegistry::new();
        assert!(registry.get(b"dev-01").is_none());
        assert!(!registry.is_online(b"dev-01"));
    }

    #[test]
    fn set_then_get_round_trips() {
        let registry = DeviceRegistry::new();
        let conn = dummy_connection();
        registry.set(Bytes::from_static(b"dev-01"), conn.clone());

        let looked_up = registry.get(b"dev-01").unwrap();
        assert!(Arc::ptr_eq(&looked_up, &conn));
        assert!(registry.is_online(b"dev-01"));
    }

    #[test]
    fn replacement_uniqueness() {
        let registry = DeviceRegistry::new();
        let conn_a = dummy_connection();
        let conn_b = dummy_connection();

        registry.set(Bytes::from_static(b"dup"), conn_a.clone());
        registry.set(Bytes::from_static(b"dup"), conn_b.clone());

        let current = registry.get(b"dup").unwrap();
        assert!(Arc::ptr_eq(&current, &conn_b));
    }

    #[test]
    fn remove_if_current_ignores_stale_connection() {
        let registry = DeviceRegistry::new();
        let conn_a = dummy_connection();
        let conn_b = dummy_connection();

        registry.set(Bytes::from_static(b"dup"), conn_a.clone());
        registry.set(Bytes::from_static(b"dup"), conn_b.clone());

        // conn_a disconnects after being displaced by conn_b: must not
        // remove conn_b's registration.
        assert!(!registry.remove_if_current(b"dup", &conn_a));
        let current = registry.get(b"dup").unwrap();
        assert!(Arc::ptr_eq(&current, &conn_b));
    }

    #[test]
    fn remove_if_current_removes_matching_connection() {
        let registry = DeviceRegistry::new();
        let conn = dummy_connection();
        registry.set(Bytes::from_static(b"dev-01"), conn.clone());

        assert!(registry.remove_if_current(b"dev-01", &conn));
        assert!(registry.get(b"dev-01").is_none());
    }

    #[tokio::test]
    async fn send_to_device_on_unregistered_device_fails() {
        let registry = DeviceRegistry::new();
        let err = registry.send_to_device(b"ghost", &b"hi"[..]).await.unwrap_err();
        assert!(matches!(err, SendToDeviceError::NotFound));
    }

    #[tokio::test]
    async fn send_to_device_delivers_a_command_frame() {
        let (client, server) = tokio::io::duplex(4096);
        let (mut client_reader, _client_writer) = fleetwire_core::Connection::new(client).into_split();
        let (_server_reader, server_writer) = fleetwire_core::Connection::new(server).into_split();

        let registry = DeviceRegistry::new();
        registry.set(Bytes::from_static(b"dev-01"), Arc::new(RegisteredConnection::new(server_writer)));

        registry.send_to_device(b"dev-01", &b"{\"op\":\"ping\"}"[..]).await.unwrap();

        let msg = client_reader.read_message().await.unwrap();
        assert_eq!(msg.opcode, Some(fleetwire_proto::Opcode::Command));
        assert_eq!(msg.raw.as_ref(), b"{\"op\":\"ping\"}");
    }

    #[tokio::test]
    async fn send_to_device_evicts_entry_on_write_failure() {
        let (client, server) = tokio::io::duplex(4096);
        let (_server_reader, server_writer) = fleetwire_core::Connection::new(server).into_split();
        drop(client); // close the peer so the next write fails

        let registry = DeviceRegistry::new();
        let conn = Arc::new(RegisteredConnection::new(server_writer));
        registry.set(Bytes::from_static(b"dev-01"), conn);

        let err = registry.send_to_device(b"dev-01", &b"x"[..]).await.unwrap_err();
        assert!(matches!(err, SendToDeviceError::Send(_)));
        assert!(!registry.is_online(b"dev-01"));
    }

    #[tokio::test]
    async fn shutdown_requested_resolves_after_request_shutdown() {
        let conn = dummy_connection();

        // Before a request, shutdown_requested must not resolve spuriously.
        assert!(tokio::time::timeout(std::time::Duration::from_millis(20), conn.shutdown_requested())
            .await
            .is_err());

        conn.request_shutdown();
        tokio::time::timeout(std::time::Duration::from_millis(20), conn.shutdown_requested())
            .await
            .expect("shutdown_requested to resolve once notified");
    }
}
