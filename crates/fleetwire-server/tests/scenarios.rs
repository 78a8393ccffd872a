//! End-to-end scenario tests: a real client against a real server over
//! loopback TCP, covering the six scenarios callers depend on - login then
//! command dispatch, a full file transfer, sticky device id backfill,
//! oversize-frame rejection, login replacement, and disconnect-callback
//! ordering relative to registry removal.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use fleetwire_client::Client;
use fleetwire_proto::{DecodedMessage, Opcode};
use fleetwire_server::{
    BoxFuture, ConnectionContext, DeviceRegistry, ProtocolHandler, ProtocolServer, TcpServer,
    TcpServerConfig,
};
use tokio::{io::AsyncWriteExt, net::TcpStream, sync::mpsc, time::timeout};

/// One callback invocation recorded by [`RecordingHandler`], in arrival order.
#[derive(Debug)]
enum Event {
    Message { device_id: Option<Bytes>, message: DecodedMessage },
    Disconnect { device_id: Option<Bytes>, online_during_callback: bool },
}

/// Forwards every `on_message`/`on_disconnect` invocation onto a channel so a
/// test body can assert on them after driving a client against a live server.
///
/// `on_disconnect` checks `registry.is_online` itself, from inside the
/// callback, to exercise the ordering guarantee in §4.4: registry removal
/// happens before the callback fires.
struct RecordingHandler {
    registry: Arc<DeviceRegistry>,
    tx: mpsc::UnboundedSender<Event>,
}

impl ProtocolHandler for RecordingHandler {
    fn on_message(&self, ctx: ConnectionContext, message: DecodedMessage) -> BoxFuture<()> {
        let tx = self.tx.clone();
        Box::pin(async move {
            let _ = tx.send(Event::Message { device_id: ctx.device_id, message });
        })
    }

    fn on_disconnect(&self, ctx: ConnectionContext) -> BoxFuture<()> {
        let tx = self.tx.clone();
        let registry = Arc::clone(&self.registry);
        Box::pin(async move {
            let online_during_callback = match &ctx.device_id {
                Some(device_id) => registry.is_online(device_id),
                None => false,
            };
            let _ = tx.send(Event::Disconnect { device_id: ctx.device_id, online_during_callback });
        })
    }
}

async fn spawn_server() -> (TcpServer, Arc<DeviceRegistry>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let registry = Arc::new(DeviceRegistry::new());
    let handler = Arc::new(RecordingHandler { registry: Arc::clone(&registry), tx });
    let protocol_server = Arc::new(ProtocolServer::new(Arc::clone(&registry), handler, false));

    let config = TcpServerConfig::new("127.0.0.1:0".parse().unwrap());
    let tcp_server = TcpServer::bind(config, protocol_server.accept_callback()).unwrap();
    (tcp_server, registry, rx)
}

async fn recv_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(Duration::from_secs(2), rx.recv()).await.expect("event within timeout").expect("channel open")
}

async fn wait_until_online(registry: &DeviceRegistry, device_id: &[u8]) {
    for _ in 0..200 {
        if registry.is_online(device_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("device {device_id:?} never became registered");
}

#[tokio::test]
async fn scenario_login_then_command_dispatch() {
    let (mut server, registry, mut events) = spawn_server().await;
    let addr = server.local_addr();

    let mut client = Client::connect(addr).await.unwrap();
    client.send_login(b"dev-01", b"t").await.unwrap();

    match recv_event(&mut events).await {
        Event::Message { device_id, message } => {
            assert_eq!(device_id.as_deref(), Some(&b"dev-01"[..]));
            assert_eq!(message.opcode, Some(Opcode::Login));
            assert_eq!(message.device_id.as_deref(), Some(&b"dev-01"[..]));
            assert_eq!(message.token.as_deref(), Some(&b"t"[..]));
        },
        other => panic!("expected LOGIN message, got {other:?}"),
    }

    wait_until_online(&registry, b"dev-01").await;
    registry.send_to_device(b"dev-01", &b"{\"op\":\"ping\"}"[..]).await.unwrap();

    let command = client.recv_message().await.unwrap();
    assert_eq!(command.opcode, Some(Opcode::Command));
    assert_eq!(command.raw.as_ref(), b"{\"op\":\"ping\"}");

    server.stop().await;
}

#[tokio::test]
async fn scenario_file_transfer_sequence() {
    let (mut server, _registry, mut events) = spawn_server().await;
    let addr = server.local_addr();

    let mut client = Client::connect(addr).await.unwrap();
    client.send_file_meta(b"a.bin", 5).await.unwrap();
    client.send_file_chunk(b"s1", b"t", 0, b"hello").await.unwrap();
    client.send_file_done(b"s1", b"t").await.unwrap();

    match recv_event(&mut events).await {
        Event::Message { message, .. } => {
            assert_eq!(message.opcode, Some(Opcode::FileMeta));
            assert_eq!(message.filename.as_deref(), Some(&b"a.bin"[..]));
            assert_eq!(message.file_size, Some(5));
        },
        other => panic!("expected FILE_META message, got {other:?}"),
    }

    match recv_event(&mut events).await {
        Event::Message { message, .. } => {
            assert_eq!(message.opcode, Some(Opcode::FileChunk));
            assert_eq!(message.session_id.as_deref(), Some(&b"s1"[..]));
            assert_eq!(message.token.as_deref(), Some(&b"t"[..]));
            assert_eq!(message.chunk_offset, Some(0));
            assert_eq!(message.chunk_data.as_deref(), Some(&b"hello"[..]));
        },
        other => panic!("expected FILE_CHUNK message, got {other:?}"),
    }

    match recv_event(&mut events).await {
        Event::Message { message, .. } => {
            assert_eq!(message.opcode, Some(Opcode::FileDone));
            assert_eq!(message.session_id.as_deref(), Some(&b"s1"[..]));
        },
        other => panic!("expected FILE_DONE message, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn scenario_sticky_device_id_backfills_file_meta() {
    let (mut server, _registry, mut events) = spawn_server().await;
    let addr = server.local_addr();

    let mut client = Client::connect(addr).await.unwrap();
    client.send_login(b"dev-02", b"t").await.unwrap();
    client.send_file_meta(b"a.bin", 1).await.unwrap();

    let _login = recv_event(&mut events).await;

    match recv_event(&mut events).await {
        Event::Message { device_id, message } => {
            assert_eq!(device_id.as_deref(), Some(&b"dev-02"[..]));
            assert_eq!(message.device_id.as_deref(), Some(&b"dev-02"[..]));
            assert_eq!(message.opcode, Some(Opcode::FileMeta));
        },
        other => panic!("expected FILE_META message with backfilled device id, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn scenario_oversize_frame_is_rejected_without_dispatch() {
    let (mut server, _registry, mut events) = spawn_server().await;
    let addr = server.local_addr();

    let mut raw = TcpStream::connect(addr).await.unwrap();
    // type=COMMAND, length=0x00200000 (2 MiB); no payload bytes follow, and
    // none should ever be read.
    let header = [Opcode::Command.to_u8(), 0x00, 0x20, 0x00, 0x00];
    raw.write_all(&header).await.unwrap();

    match recv_event(&mut events).await {
        Event::Disconnect { device_id, .. } => assert_eq!(device_id, None),
        other => panic!("expected a disconnect with no prior message, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn scenario_login_replacement_routes_to_newest_connection() {
    let (mut server, registry, mut events) = spawn_server().await;
    let addr = server.local_addr();

    let mut client_a = Client::connect(addr).await.unwrap();
    client_a.send_login(b"dup", b"t").await.unwrap();
    let _ = recv_event(&mut events).await;

    let mut client_b = Client::connect(addr).await.unwrap();
    client_b.send_login(b"dup", b"t").await.unwrap();
    let _ = recv_event(&mut events).await;

    wait_until_online(&registry, b"dup").await;
    registry.send_to_device(b"dup", &b"x"[..]).await.unwrap();

    let routed = client_b.recv_message().await.unwrap();
    assert_eq!(routed.raw.as_ref(), b"x");

    // The displaced connection (A) is not force-closed by the server; it
    // keeps dispatching normally until its own socket closes.
    client_a.send_command(&b"still-alive"[..]).await.unwrap();
    match recv_event(&mut events).await {
        Event::Message { message, .. } => assert_eq!(message.raw.as_ref(), b"still-alive"),
        other => panic!("expected connection A to still be dispatched, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn scenario_disconnect_callback_sees_device_already_offline() {
    let (mut server, registry, mut events) = spawn_server().await;
    let addr = server.local_addr();

    let mut client = Client::connect(addr).await.unwrap();
    client.send_login(b"dev-03", b"t").await.unwrap();
    let _ = recv_event(&mut events).await;

    wait_until_online(&registry, b"dev-03").await;
    drop(client);

    match recv_event(&mut events).await {
        Event::Disconnect { device_id, online_during_callback } => {
            assert_eq!(device_id.as_deref(), Some(&b"dev-03"[..]));
            assert!(!online_during_callback);
        },
        other => panic!("expected a disconnect event, got {other:?}"),
    }

    server.stop().await;
}
