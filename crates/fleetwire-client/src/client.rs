//! Blocking-style send API over a fleetwire connection.
//!
//! `Client` wraps a single TCP connection and exposes one method per message
//! type, each encoding its payload with `fleetwire-proto` and writing a
//! complete frame before returning - there is no background send queue, so a
//! caller's `await` only resolves once its bytes are on the wire.

use std::net::SocketAddr;

use bytes::Bytes;
use fleetwire_core::Connection;
use fleetwire_proto::{DecodedMessage, Opcode, payloads};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{ClientError, Result};

/// A connected client speaking the fleetwire frame protocol.
pub struct Client {
    conn: Connection<TcpStream>,
}

impl Client {
    /// Connects to `addr` and wraps the resulting stream.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the TCP connection cannot be
    /// established, or if the peer address cannot be read back from the
    /// freshly connected socket.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        let conn = Connection::from_tcp_stream(stream).map_err(ClientError::Connect)?;
        Ok(Self { conn })
    }

    /// Wraps an already-connected stream, e.g. one obtained from a test
    /// harness instead of a live DNS lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer address cannot be read from `stream`.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        Ok(Self { conn: Connection::from_tcp_stream(stream).map_err(ClientError::Connect)? })
    }

    /// The peer's socket address.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.conn.peer_addr()
    }

    /// Sends a LOGIN frame identifying this connection as `device_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `device_id` or `token` exceed their bounds, or if
    /// the write fails.
    pub async fn send_login(&mut self, device_id: &[u8], token: &[u8]) -> Result<()> {
        let payload = payloads::encode_login(device_id, token)?;
        self.conn.write_frame(Opcode::Login.to_u8(), payload).await?;
        Ok(())
    }

    /// Sends a COMMAND frame carrying `payload` verbatim - the command
    /// encoding itself is opaque to the protocol layer.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` is empty or exceeds 1 MiB, or if the
    /// write fails.
    pub async fn send_command(&mut self, payload: impl Into<Bytes>) -> Result<()> {
        let payload = payloads::encode_command(payload)?;
        self.conn.write_frame(Opcode::Command.to_u8(), payload).await?;
        Ok(())
    }

    /// Sends a FILE_META frame announcing an upcoming file transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if `filename` exceeds its bound, or if the write
    /// fails.
    pub async fn send_file_meta(&mut self, filename: &[u8], file_size: u64) -> Result<()> {
        let payload = payloads::encode_file_meta(filename, file_size)?;
        self.conn.write_frame(Opcode::FileMeta.to_u8(), payload).await?;
        Ok(())
    }

    /// Sends one FILE_CHUNK frame of a file transfer identified by
    /// `session_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `chunk` is empty or exceeds 1 MiB, if
    /// `session_id`/`token` exceed their bounds, or if the write fails.
    pub async fn send_file_chunk(
        &mut self,
        session_id: &[u8],
        token: &[u8],
        offset: u32,
        chunk: &[u8],
    ) -> Result<()> {
        let payload = payloads::encode_file_chunk(session_id, token, offset, chunk)?;
        self.conn.write_frame(Opcode::FileChunk.to_u8(), payload).await?;
        Ok(())
    }

    /// Sends a FILE_DONE frame closing out a file transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if `session_id`/`token` exceed their bounds, or if
    /// the write fails.
    pub async fn send_file_done(&mut self, session_id: &[u8], token: &[u8]) -> Result<()> {
        let payload = payloads::encode_file_done(session_id, token)?;
        self.conn.write_frame(Opcode::FileDone.to_u8(), payload).await?;
        Ok(())
    }

    /// Sends an ACK frame with `status_code` and an optional human-readable
    /// `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if `message` exceeds its bound, or if the write
    /// fails.
    pub async fn send_ack(&mut self, status_code: u16, message: &[u8]) -> Result<()> {
        let payload = payloads::encode_status(status_code, message)?;
        self.conn.write_frame(Opcode::Ack.to_u8(), payload).await?;
        Ok(())
    }

    /// Sends an ERROR frame; same wire layout as ACK, distinguished only by
    /// opcode.
    ///
    /// # Errors
    ///
    /// Returns an error if `message` exceeds its bound, or if the write
    /// fails.
    pub async fn send_error(&mut self, status_code: u16, message: &[u8]) -> Result<()> {
        let payload = payloads::encode_status(status_code, message)?;
        self.conn.write_frame(Opcode::Error.to_u8(), payload).await?;
        Ok(())
    }

    /// Reads and decodes the next frame from the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails or the frame's header
    /// is malformed; a malformed sub-structure within an otherwise valid
    /// frame is not an error here - see [`DecodedMessage`]'s decode-warning
    /// policy.
    pub async fn recv_message(&mut self) -> Result<DecodedMessage> {
        Ok(self.conn.read_message().await?)
    }

    /// Consumes the client, dropping the underlying socket and sending a TCP
    /// FIN to the peer.
    pub fn close(self) {
        drop(self);
    }
}
