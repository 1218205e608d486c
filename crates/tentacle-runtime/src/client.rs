//! Client side of a command stream.
//!
//! Wraps a byte pipe in framing and operation encoding so editor
//! frontends and tests speak the wire protocol without touching raw
//! headers.

use crate::transport::{FrameReader, FrameWriter, TransportError};
use tentacle_proto::{EditOperation, ResultEnvelope};
use tentacle_types::{ErrorCode, StreamId};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed result envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

impl ErrorCode for ClientError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transport(e) => e.code(),
            Self::Envelope(_) => "TRANSPORT_BAD_ENVELOPE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// One end of a command stream: operations out, result envelopes in.
pub struct StreamClient<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

impl<R, W> StreamClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    #[must_use]
    pub fn new(reader: R, writer: W, max_payload: usize) -> Self {
        // The stream id on received frames is client-local; results
        // are addressed by the connection itself.
        Self {
            reader: FrameReader::new(reader, StreamId::new(), max_payload),
            writer: FrameWriter::new(writer),
        }
    }

    /// Encodes and sends one operation. Returns the frame sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the pipe rejects the write.
    pub async fn send(&mut self, op: &EditOperation) -> Result<u64, ClientError> {
        Ok(self.writer.send(&op.encode()).await?)
    }

    /// Sends raw payload bytes, optionally with a non-current version
    /// byte. Intended for protocol tests.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the pipe rejects the write.
    pub async fn send_raw(&mut self, version: u8, payload: &[u8]) -> Result<u64, ClientError> {
        Ok(self.writer.send_versioned(version, payload).await?)
    }

    /// Receives the next result envelope, `None` on clean end of
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on a transport fault or an envelope
    /// that does not decode.
    pub async fn next_envelope(&mut self) -> Result<Option<ResultEnvelope>, ClientError> {
        match self.reader.next_frame().await? {
            Some(frame) => Ok(Some(ResultEnvelope::decode(&frame.payload)?)),
            None => Ok(None),
        }
    }

    /// Closes the sending half. The server observes a clean end of
    /// stream and cancels whatever was still pending.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if shutdown fails.
    pub async fn finish(&mut self) -> Result<(), ClientError> {
        Ok(self.writer.close().await?)
    }
}
