//! A socket paired with the frame codec.
//!
//! [`Connection`] is transport-only: it knows how to read one
//! [`DecodedMessage`] and how to write one [`Frame`], using the interrupt-safe
//! primitives in [`crate::io`]. It does not know about sticky device ids or
//! registries - per the design notes, the sticky device id is a per-worker
//! value owned by the protocol server's frame loop, not shared state baked
//! into the transport.
//!
//! Splitting a connection into independent read and write halves
//! ([`Connection::into_split`]) is what lets the server's per-connection
//! worker own the read loop while the device registry (or any other task)
//! writes outbound frames concurrently, each serialized through its own half.

use bytes::{Bytes, BytesMut};
use fleetwire_proto::{DecodedMessage, Frame, FrameHeader};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf},
    net::TcpStream,
};

use crate::{
    error::{ConnectionError, Result},
    io::{recv_exact, send_all},
};

/// A socket plus the frame read/write operations layered on top of it.
///
/// Generic over the stream type so tests can exercise the frame loop against
/// an in-memory duplex pipe instead of a real TCP socket.
pub struct Connection<S> {
    stream: S,
    peer_addr: Option<std::net::SocketAddr>,
}

impl Connection<TcpStream> {
    /// Wraps an accepted or connected TCP stream, capturing its peer address
    /// for logging.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the peer address cannot be read
    /// from the socket.
    pub fn from_tcp_stream(stream: TcpStream) -> std::io::Result<Self> {
        let peer_addr = stream.peer_addr()?;
        Ok(Self { stream, peer_addr: Some(peer_addr) })
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an arbitrary duplex stream with no known peer address.
    pub fn new(stream: S) -> Self {
        Self { stream, peer_addr: None }
    }

    /// The peer's socket address, if this connection was built from a real
    /// TCP stream.
    #[must_use]
    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.peer_addr
    }

    /// Reads and decodes one frame.
    ///
    /// Fails only on transport errors, a 1 MiB length overflow, or a
    /// truncated header/payload - never on a malformed sub-structure, which
    /// is the decode-warning policy implemented one layer down in
    /// `fleetwire-proto`.
    pub async fn read_message(&mut self) -> Result<DecodedMessage> {
        let mut header_buf = [0u8; FrameHeader::SIZE];
        recv_exact(&mut self.stream, &mut header_buf).await.map_err(ConnectionError::Transport)?;

        let header = FrameHeader::from_bytes(&header_buf)?;
        let payload_len = header.payload_len() as usize;

        let payload = if payload_len == 0 {
            Bytes::new()
        } else {
            let mut buf = vec![0u8; payload_len];
            recv_exact(&mut self.stream, &mut buf).await.map_err(ConnectionError::Transport)?;
            Bytes::from(buf)
        };

        Ok(DecodedMessage::decode(header.opcode(), payload))
    }

    /// Encodes and writes one frame, as a single
    /// `send_all` so the header and payload are never interleaved with
    /// another frame on this connection.
    ///
    /// # Errors
    ///
    /// Returns [`fleetwire_proto::ProtocolError::PayloadTooLarge`] if
    /// `payload` exceeds 1 MiB, or a transport error if the write fails.
    pub async fn write_frame(&mut self, opcode: u8, payload: impl Into<Bytes>) -> Result<()> {
        let frame = Frame::new(opcode, payload)?;
        let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + frame.payload.len());
        frame.encode(&mut buf);
        send_all(&mut self.stream, &buf).await.map_err(ConnectionError::Transport)?;
        Ok(())
    }

    /// Splits this connection into an independent reader and writer so each
    /// half can be driven from a different task.
    pub fn into_split(self) -> (FrameReader<ReadHalf<S>>, FrameWriter<WriteHalf<S>>) {
        let (read_half, write_half) = tokio::io::split(self.stream);
        (
            FrameReader { stream: read_half, peer_addr: self.peer_addr },
            FrameWriter { stream: write_half, peer_addr: self.peer_addr },
        )
    }
}

/// The read half of a split [`Connection`].
pub struct FrameReader<R> {
    stream: R,
    peer_addr: Option<std::net::SocketAddr>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// See [`Connection::read_message`].
    pub async fn read_message(&mut self) -> Result<DecodedMessage> {
        let mut header_buf = [0u8; FrameHeader::SIZE];
        recv_exact(&mut self.stream, &mut header_buf).await.map_err(ConnectionError::Transport)?;

        let header = FrameHeader::from_bytes(&header_buf)?;
        let payload_len = header.payload_len() as usize;

        let payload = if payload_len == 0 {
            Bytes::new()
        } else {
            let mut buf = vec![0u8; payload_len];
            recv_exact(&mut self.stream, &mut buf).await.map_err(ConnectionError::Transport)?;
            Bytes::from(buf)
        };

        Ok(DecodedMessage::decode(header.opcode(), payload))
    }

    /// The peer's socket address, if known.
    #[must_use]
    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.peer_addr
    }
}

/// The write half of a split [`Connection`].
///
/// Cheap to wrap in a `Mutex` and share: writers serialize themselves with
/// `send_all`, but concurrent writers from different tasks must still take
/// turns (the library does not provide a per-connection send lock -
/// callers sharing a `FrameWriter` across tasks wrap it in their own mutex,
/// as the device registry does).
pub struct FrameWriter<W> {
    stream: W,
    peer_addr: Option<std::net::SocketAddr>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// See [`Connection::write_frame`].
    pub async fn write_frame(&mut self, opcode: u8, payload: impl Into<Bytes>) -> Result<()> {
        let frame = Frame::new(opcode, payload)?;
        let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + frame.payload.len());
        frame.encode(&mut buf);
        send_all(&mut self.stream, &buf).await.map_err(ConnectionError::Transport)?;
        Ok(())
    }

    /// The peer's socket address, if known.
    #[must_use]
    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.peer_addr
    }
}

#[cfg(test)]
mod tests {
    use fleetwire_proto::Opcode;
    use tokio::io::{AsyncWriteExt, duplex};

    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips_a_command_frame() {
        let (client, server) = duplex(4096);
        let mut client_conn = Connection::new(client);
        let mut server_conn = Connection::new(server);

        client_conn.write_frame(Opcode::Command.to_u8(), &b"{\"op\":\"ping\"}"[..]).await.unwrap();

        let msg = server_conn.read_message().await.unwrap();
        assert_eq!(msg.opcode, Some(Opcode::Command));
        assert_eq!(msg.raw.as_ref(), b"{\"op\":\"ping\"}");
    }

    #[tokio::test]
    async fn oversize_length_fails_decode_without_reading_payload() {
        let (mut client, server) = duplex(16);
        let mut server_conn = Connection::new(server);

        // type=0x02, length=0x00200000 (2 MiB), no payload bytes sent.
        let header = [0x02, 0x00, 0x20, 0x00, 0x00];
        client.write_all(&header).await.unwrap();

        let err = server_conn.read_message().await.unwrap_err();
        assert!(matches!(err, ConnectionError::Protocol(_)));
    }

    #[tokio::test]
    async fn split_halves_can_be_driven_independently() {
        let (client, server) = duplex(4096);
        let client_conn = Connection::new(client);
        let server_conn = Connection::new(server);

        let (_client_reader, mut client_writer) = client_conn.into_split();
        let (mut server_reader, _server_writer) = server_conn.into_split();

        client_writer.write_frame(Opcode::Ack.to_u8(), &b"ok"[..]).await.unwrap();
        let msg = server_reader.read_message().await.unwrap();
        assert_eq!(msg.opcode, Some(Opcode::Ack));
    }
}
