//! Interrupt-safe send/receive loops over an async stream.
//!
//! `tokio`'s `AsyncReadExt`/`AsyncWriteExt` already retry `ErrorKind::Interrupted`
//! internally, so these helpers are thin typed wrappers: they translate the
//! remaining failure modes - clean EOF mid-read, a zero-length write, and
//! genuine I/O errors - into [`TransportError`] instead of leaking raw
//! `std::io::Error` variants whose meaning depends on the runtime.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransportError;

/// Writes every byte of `bytes` to `stream`, looping until the whole buffer
/// is queued to the transport.
///
/// A zero-length write is treated as the peer having gone away rather than
/// silently retried forever. Either every byte was written, or this returns
/// an error - partial success is never reported as success.
pub async fn send_all<W: AsyncWrite + Unpin>(
    stream: &mut W,
    bytes: &[u8],
) -> Result<(), TransportError> {
    let mut written = 0;
    while written < bytes.len() {
        let n = stream.write(&bytes[written..]).await?;
        if n == 0 {
            return Err(TransportError::ZeroWrite);
        }
        written += n;
    }
    Ok(())
}

/// Fills `buf` with exactly `buf.len()` bytes, treating end-of-stream as
/// failure.
///
/// Used for the fixed-size frame header and for reading a declared payload
/// length in full.
pub async fn recv_exact<R: AsyncRead + Unpin>(
    stream: &mut R,
    buf: &mut [u8],
) -> Result<(), TransportError> {
    let expected = buf.len();
    let mut received = 0;
    while received < expected {
        let n = stream.read(&mut buf[received..]).await?;
        if n == 0 {
            return Err(TransportError::ClosedByPeer { received, expected });
        }
        received += n;
    }
    Ok(())
}

/// Fills `buf` opportunistically until the remote closes the connection or
/// `buf` is one byte short of full, reserving terminator space for callers
/// that treat the result as text.
///
/// Not used by the framed protocol in this crate; kept for parity with the
/// design's stream-I/O primitive set (HTTP-style helpers that read until
/// close are orthogonal utilities, but share this
/// primitive's contract).
pub async fn recv_into<R: AsyncRead + Unpin>(
    stream: &mut R,
    buf: &mut [u8],
) -> Result<usize, TransportError> {
    if buf.is_empty() {
        return Ok(0);
    }
    let limit = buf.len() - 1;
    let mut received = 0;
    while received < limit {
        let n = stream.read(&mut buf[received..limit]).await?;
        if n == 0 {
            break;
        }
        received += n;
    }
    Ok(received)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[tokio::test]
    async fn send_all_writes_every_byte() {
        let mut out = Vec::new();
        send_all(&mut out, b"hello world").await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn recv_exact_fills_buffer() {
        let mut cursor = Cursor::new(b"0123456789".to_vec());
        let mut buf = [0u8; 5];
        recv_exact(&mut cursor, &mut buf).await.unwrap();
        assert_eq!(&buf, b"01234");
    }

    #[tokio::test]
    async fn recv_exact_fails_on_short_stream() {
        let mut cursor = Cursor::new(b"ab".to_vec());
        let mut buf = [0u8; 5];
        let err = recv_exact(&mut cursor, &mut buf).await.unwrap_err();
        assert!(matches!(err, TransportError::ClosedByPeer { received: 2, expected: 5 }));
    }

    #[tokio::test]
    async fn recv_into_stops_one_byte_short_of_full() {
        let mut cursor = Cursor::new(vec![1u8; 100]);
        let mut buf = [0u8; 10];
        let n = recv_into(&mut cursor, &mut buf).await.unwrap();
        assert_eq!(n, 9);
    }

    #[tokio::test]
    async fn recv_into_stops_early_on_close() {
        let mut cursor = Cursor::new(vec![1u8; 3]);
        let mut buf = [0u8; 10];
        let n = recv_into(&mut cursor, &mut buf).await.unwrap();
        assert_eq!(n, 3);
    }
}
