//! Length-prefixed framing over any async byte stream.
//!
//! The transport is deliberately dumb: it turns bytes into
//! [`CommandFrame`]s and frames back into bytes. It knows nothing
//! about operations or outcomes; payload interpretation happens in
//! `tentacle-proto`. Partial reads never surface upward — a frame is
//! handed out whole or not at all.

use tentacle_proto::{CommandFrame, HEADER_LEN, PROTOCOL_VERSION};
use tentacle_types::{ErrorCode, StreamId};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Transport-level faults. All of them close the stream.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection in the middle of a frame.
    #[error("stream closed mid-frame")]
    Closed,

    /// The header announced a payload larger than the configured cap.
    #[error("frame payload of {len} bytes exceeds cap of {max}")]
    Oversized { len: usize, max: usize },

    #[error("transport i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Closed => "TRANSPORT_CLOSED",
            Self::Oversized { .. } => "TRANSPORT_OVERSIZED",
            Self::Io(_) => "TRANSPORT_IO",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Reads command frames from an async byte source.
pub struct FrameReader<R> {
    inner: R,
    stream: StreamId,
    max_payload: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, stream: StreamId, max_payload: usize) -> Self {
        Self {
            inner,
            stream,
            max_payload,
        }
    }

    /// Reads the next whole frame.
    ///
    /// Returns `Ok(None)` on a clean end of stream (EOF exactly at a
    /// frame boundary). EOF inside a header or payload is a fault.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on mid-frame EOF, an oversized
    /// payload announcement, or any other i/o failure.
    pub async fn next_frame(&mut self) -> Result<Option<CommandFrame>, TransportError> {
        let mut header = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = self.inner.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(TransportError::Closed);
            }
            filled += n;
        }

        let (version, seq, len) = CommandFrame::parse_header(&header);
        let len = len as usize;
        if len > self.max_payload {
            return Err(TransportError::Oversized {
                len,
                max: self.max_payload,
            });
        }

        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TransportError::Closed
            } else {
                TransportError::Io(e)
            }
        })?;

        Ok(Some(CommandFrame {
            version,
            seq,
            stream: self.stream,
            payload,
        }))
    }
}

/// Writes framed payloads to an async byte sink, stamping sequence
/// numbers. Sequence numbers start at 1 and increase by one per frame.
pub struct FrameWriter<W> {
    inner: W,
    seq: u64,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, seq: 0 }
    }

    /// Frames and sends one payload. Returns the sequence number used.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the sink rejects the write.
    pub async fn send(&mut self, payload: &[u8]) -> Result<u64, TransportError> {
        self.send_versioned(PROTOCOL_VERSION, payload).await
    }

    /// Like [`send`](Self::send) but with an explicit version byte.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the sink rejects the write.
    pub async fn send_versioned(
        &mut self,
        version: u8,
        payload: &[u8],
    ) -> Result<u64, TransportError> {
        self.seq += 1;
        let header = CommandFrame::header(version, self.seq, payload.len() as u32);
        self.inner.write_all(&header).await?;
        self.inner.write_all(payload).await?;
        self.inner.flush().await?;
        Ok(self.seq)
    }

    /// Flushes and shuts the sink down.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if shutdown fails.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: usize = 1024;

    #[tokio::test]
    async fn frames_roundtrip_in_order() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, _server_write) = tokio::io::split(server);
        let (_client_read, client_write) = tokio::io::split(client);

        let mut writer = FrameWriter::new(client_write);
        let mut reader = FrameReader::new(server_read, StreamId::new(), CAP);

        assert_eq!(writer.send(b"first").await.unwrap(), 1);
        assert_eq!(writer.send(b"second").await.unwrap(), 2);

        let a = reader.next_frame().await.unwrap().unwrap();
        let b = reader.next_frame().await.unwrap().unwrap();
        assert_eq!((a.seq, a.payload.as_slice()), (1, b"first".as_slice()));
        assert_eq!((b.seq, b.payload.as_slice()), (2, b"second".as_slice()));
    }

    #[tokio::test]
    async fn clean_eof_yields_none() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, _server_write) = tokio::io::split(server);
        let (_client_read, client_write) = tokio::io::split(client);

        let mut writer = FrameWriter::new(client_write);
        writer.send(b"only").await.unwrap();
        writer.close().await.unwrap();
        drop(writer);

        let mut reader = FrameReader::new(server_read, StreamId::new(), CAP);
        assert!(reader.next_frame().await.unwrap().is_some());
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_mid_frame_is_closed() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, _server_write) = tokio::io::split(server);
        let (_client_read, mut client_write) = tokio::io::split(client);

        // Header announces 100 bytes; only 3 arrive.
        let header = CommandFrame::header(PROTOCOL_VERSION, 1, 100);
        client_write.write_all(&header).await.unwrap();
        client_write.write_all(b"abc").await.unwrap();
        client_write.shutdown().await.unwrap();
        drop(client_write);

        let mut reader = FrameReader::new(server_read, StreamId::new(), CAP);
        match reader.next_frame().await {
            Err(TransportError::Closed) => {}
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn oversized_announcement_is_rejected_before_reading() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, _server_write) = tokio::io::split(server);
        let (_client_read, mut client_write) = tokio::io::split(client);

        let header = CommandFrame::header(PROTOCOL_VERSION, 1, (CAP + 1) as u32);
        client_write.write_all(&header).await.unwrap();

        let mut reader = FrameReader::new(server_read, StreamId::new(), CAP);
        match reader.next_frame().await {
            Err(TransportError::Oversized { len, max }) => {
                assert_eq!(len, CAP + 1);
                assert_eq!(max, CAP);
            }
            other => panic!("expected Oversized, got {:?}", other),
        }
    }
}
