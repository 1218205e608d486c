//! Per-stream result delivery.
//!
//! The scheduler produces [`ResultEnvelope`]s addressed to a stream;
//! each stream's writer task owns the receiving half of a bounded
//! channel. The router holds the sending halves. Registration and
//! removal are rare; delivery is hot, so the sender is cloned out from
//! under the lock before the await.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tentacle_proto::ResultEnvelope;
use tentacle_types::StreamId;
use tokio::sync::mpsc;
use tracing::debug;

/// Routes result envelopes to the writer task of their stream.
#[derive(Debug, Clone, Default)]
pub struct ResultRouter {
    senders: Arc<RwLock<HashMap<StreamId, mpsc::Sender<ResultEnvelope>>>>,
}

impl ResultRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stream and returns the receiving half for its
    /// writer task. A second registration under the same id replaces
    /// the first.
    pub fn register(&self, stream: StreamId, buffer: usize) -> mpsc::Receiver<ResultEnvelope> {
        let (tx, rx) = mpsc::channel(buffer);
        if let Ok(mut senders) = self.senders.write() {
            senders.insert(stream, tx);
        }
        debug!(stream = %stream, "stream registered");
        rx
    }

    /// Drops the stream's sender. Envelopes already queued stay
    /// readable by the writer task; new deliveries are refused.
    pub fn unregister(&self, stream: &StreamId) {
        if let Ok(mut senders) = self.senders.write() {
            if senders.remove(stream).is_some() {
                debug!(stream = %stream, "stream unregistered");
            }
        }
    }

    /// Delivers one envelope to a stream. Returns `false` if the
    /// stream is unknown or its writer has gone away.
    pub async fn deliver(&self, stream: &StreamId, envelope: ResultEnvelope) -> bool {
        let sender = match self.senders.read() {
            Ok(senders) => senders.get(stream).cloned(),
            Err(_) => None,
        };
        let Some(sender) = sender else {
            debug!(stream = %stream, "dropping envelope for unknown stream");
            return false;
        };
        if sender.send(envelope).await.is_err() {
            debug!(stream = %stream, "writer gone, envelope dropped");
            return false;
        }
        true
    }

    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.senders.read().map(|s| s.len()).unwrap_or(0)
    }
}
