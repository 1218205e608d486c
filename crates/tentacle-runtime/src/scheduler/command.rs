//! Scheduler inbox commands and the cloneable handle.

use tentacle_graph::GraphSnapshot;
use tentacle_proto::{DecodeError, EditOperation};
use tentacle_types::{ErrorCode, GraphId, OperationId, StreamId};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// One message into the scheduler task.
///
/// Everything that can change graph state arrives here, already
/// decoded. Ordering inside the channel is the ordering the scheduler
/// observes; per-stream submission order is preserved because each
/// session reader is a single task.
#[derive(Debug)]
pub enum SchedulerCommand {
    /// A decoded operation from a stream.
    Submit {
        stream: StreamId,
        op: EditOperation,
    },
    /// A frame that failed to decode. The scheduler forwards the fault
    /// to the stream's result channel so it is ordered with outcomes.
    DecodeFailed {
        stream: StreamId,
        seq: u64,
        error: DecodeError,
    },
    /// The stream's reader saw EOF or a transport fault. Pending
    /// operations from this stream are cancelled.
    StreamClosed { stream: StreamId },
    /// Read-side query for a committed snapshot.
    Snapshot {
        graph: GraphId,
        reply: oneshot::Sender<Option<GraphSnapshot>>,
    },
    /// Stop the scheduler loop.
    Shutdown,
}

/// Notice that a graph reached a new committed state.
///
/// Emitted once per successfully applied mutation (or batch commit)
/// and consumed by the compile bridge. Carries the snapshot so the
/// consumer never reaches back into live graph state.
#[derive(Debug, Clone)]
pub struct CommitNotice {
    /// Stream that submitted the triggering operation. Compile
    /// outcomes for this commit go back to it.
    pub stream: StreamId,
    pub graph: GraphId,
    /// The operation id compile outcomes will be correlated to.
    pub trigger: OperationId,
    pub snapshot: GraphSnapshot,
}

/// The scheduler task has stopped; its inbox is closed.
#[derive(Debug, Error)]
#[error("scheduler is not running")]
pub struct SchedulerError;

impl ErrorCode for SchedulerError {
    fn code(&self) -> &'static str {
        "SCHED_STOPPED"
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Cloneable sending side of the scheduler inbox.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub(crate) fn new(tx: mpsc::Sender<SchedulerCommand>) -> Self {
        Self { tx }
    }

    /// Submits a decoded operation. Applies backpressure when the
    /// inbox is full.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError`] if the scheduler has stopped.
    pub async fn submit(&self, stream: StreamId, op: EditOperation) -> Result<(), SchedulerError> {
        self.tx
            .send(SchedulerCommand::Submit { stream, op })
            .await
            .map_err(|_| SchedulerError)
    }

    /// Reports a decode failure on a stream.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError`] if the scheduler has stopped.
    pub async fn decode_failed(
        &self,
        stream: StreamId,
        seq: u64,
        error: DecodeError,
    ) -> Result<(), SchedulerError> {
        self.tx
            .send(SchedulerCommand::DecodeFailed { stream, seq, error })
            .await
            .map_err(|_| SchedulerError)
    }

    /// Reports that a stream has gone away.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError`] if the scheduler has stopped.
    pub async fn stream_closed(&self, stream: StreamId) -> Result<(), SchedulerError> {
        self.tx
            .send(SchedulerCommand::StreamClosed { stream })
            .await
            .map_err(|_| SchedulerError)
    }

    /// Fetches a committed snapshot of one graph, `None` if the graph
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError`] if the scheduler has stopped.
    pub async fn snapshot(&self, graph: GraphId) -> Result<Option<GraphSnapshot>, SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SchedulerCommand::Snapshot { graph, reply })
            .await
            .map_err(|_| SchedulerError)?;
        rx.await.map_err(|_| SchedulerError)
    }

    /// Asks the scheduler loop to stop after draining in-flight work.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(SchedulerCommand::Shutdown).await;
    }
}
