//! The single-writer mutation loop.

use super::command::{CommitNotice, SchedulerCommand, SchedulerHandle};
use crate::results::ResultRouter;
use std::collections::{HashMap, HashSet, VecDeque};
use tentacle_graph::{ApplyError, GraphStore};
use tentacle_proto::{
    EditOperation, OperationKind, OperationOutcome, Outcome, ResultEnvelope,
};
use tentacle_types::{BatchId, ErrorCode, GraphId, OperationId, StreamId};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why the scheduler refused an operation.
///
/// Rejections are reported, never thrown: each one becomes an
/// [`Outcome::Rejected`] on the originating stream and the loop moves
/// on to the next operation.
#[derive(Debug, Error)]
pub enum RejectReason {
    #[error("operation id is not newer than last applied {last_applied}")]
    StaleOperation { last_applied: OperationId },

    #[error("graph does not exist")]
    UnknownGraph,

    #[error("graph already exists")]
    GraphExists,

    #[error("graph is poisoned; only destroy is accepted")]
    GraphPoisoned,

    #[error("no open batch with this id on this stream")]
    UnknownBatch,

    #[error("batch aborted by failing operation {failed}")]
    BatchAborted { failed: OperationId },

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

impl ErrorCode for RejectReason {
    fn code(&self) -> &'static str {
        match self {
            Self::StaleOperation { .. } => "SCHED_STALE_OPERATION",
            Self::UnknownGraph => "SCHED_UNKNOWN_GRAPH",
            Self::GraphExists => "SCHED_GRAPH_EXISTS",
            Self::GraphPoisoned => "SCHED_GRAPH_POISONED",
            Self::UnknownBatch => "SCHED_UNKNOWN_BATCH",
            Self::BatchAborted { .. } => "SCHED_BATCH_ABORTED",
            Self::Apply(e) => e.code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::StaleOperation { .. }
            | Self::UnknownGraph
            | Self::UnknownBatch
            | Self::BatchAborted { .. } => true,
            Self::GraphExists | Self::GraphPoisoned => false,
            Self::Apply(e) => e.is_recoverable(),
        }
    }
}

impl RejectReason {
    fn to_outcome(&self) -> Outcome {
        Outcome::Rejected {
            code: self.code().to_string(),
            reason: self.to_string(),
        }
    }
}

/// An operation waiting in a per-graph sub-queue.
#[derive(Debug)]
struct Pending {
    stream: StreamId,
    op: EditOperation,
}

type BatchKey = (StreamId, GraphId, BatchId);

/// Owns the [`GraphStore`] and applies every operation serially.
///
/// One instance runs as one task. Sub-queues keyed by graph id are
/// drained round-robin so a chatty graph cannot starve the others.
/// Operations carrying a batch id are buffered under
/// `(stream, graph, batch)` and applied atomically when the matching
/// `CommitBatch` arrives.
pub struct MutationScheduler {
    store: GraphStore,
    inbox: mpsc::Receiver<SchedulerCommand>,
    router: ResultRouter,
    commits: Option<mpsc::Sender<CommitNotice>>,
    queues: HashMap<GraphId, VecDeque<Pending>>,
    batches: HashMap<BatchKey, Vec<EditOperation>>,
    poisoned: HashSet<GraphId>,
}

impl MutationScheduler {
    /// Builds a scheduler and the handle feeding it. `inbox_depth`
    /// bounds the command channel; senders block when it fills, which
    /// is the backpressure path from sessions to the mutation loop.
    #[must_use]
    pub fn new(
        router: ResultRouter,
        commits: Option<mpsc::Sender<CommitNotice>>,
        inbox_depth: usize,
    ) -> (Self, SchedulerHandle) {
        let (tx, inbox) = mpsc::channel(inbox_depth);
        let scheduler = Self {
            store: GraphStore::new(),
            inbox,
            router,
            commits,
            queues: HashMap::new(),
            batches: HashMap::new(),
            poisoned: HashSet::new(),
        };
        (scheduler, SchedulerHandle::new(tx))
    }

    /// Runs the mutation loop until `Shutdown` or all handles drop.
    pub async fn run(mut self) {
        info!("mutation scheduler started");
        while let Some(cmd) = self.inbox.recv().await {
            match cmd {
                SchedulerCommand::Shutdown => break,
                SchedulerCommand::Submit { stream, op } => {
                    self.queues
                        .entry(op.graph)
                        .or_default()
                        .push_back(Pending { stream, op });
                    self.drain().await;
                }
                SchedulerCommand::DecodeFailed { stream, seq, error } => {
                    warn!(stream = %stream, seq, code = error.code(), "frame rejected: {error}");
                    self.router
                        .deliver(&stream, ResultEnvelope::decode_fault(seq, &error))
                        .await;
                }
                SchedulerCommand::StreamClosed { stream } => self.close_stream(stream).await,
                SchedulerCommand::Snapshot { graph, reply } => {
                    let _ = reply.send(self.store.snapshot(&graph));
                }
            }
        }
        info!("mutation scheduler stopped");
    }

    /// Pops one operation per graph per round until every queue is
    /// empty.
    async fn drain(&mut self) {
        loop {
            let round: Vec<GraphId> = self.queues.keys().copied().collect();
            let mut progressed = false;
            for graph in round {
                let next = self.queues.get_mut(&graph).and_then(VecDeque::pop_front);
                if let Some(pending) = next {
                    progressed = true;
                    self.apply_one(pending).await;
                }
            }
            self.queues.retain(|_, q| !q.is_empty());
            if !progressed {
                break;
            }
        }
    }

    async fn apply_one(&mut self, pending: Pending) {
        let Pending { stream, op } = pending;
        let graph = op.graph;
        match &op.kind {
            OperationKind::CreateGraph => {
                let outcome = if self.store.create(graph) {
                    Outcome::Applied
                } else {
                    RejectReason::GraphExists.to_outcome()
                };
                self.respond(&stream, op.id, graph, outcome).await;
            }
            OperationKind::DestroyGraph => {
                if self.store.destroy(&graph) {
                    self.poisoned.remove(&graph);
                    self.cancel_graph(&graph).await;
                    self.respond(&stream, op.id, graph, Outcome::Applied).await;
                } else {
                    self.respond(&stream, op.id, graph, RejectReason::UnknownGraph.to_outcome())
                        .await;
                }
            }
            OperationKind::CancelGraph => {
                if self.store.contains(&graph) {
                    self.cancel_graph(&graph).await;
                    self.respond(&stream, op.id, graph, Outcome::Applied).await;
                } else {
                    self.respond(&stream, op.id, graph, RejectReason::UnknownGraph.to_outcome())
                        .await;
                }
            }
            OperationKind::CommitBatch => self.commit_batch(stream, op).await,
            _ => self.apply_mutation(stream, op).await,
        }
    }

    async fn apply_mutation(&mut self, stream: StreamId, op: EditOperation) {
        let graph = op.graph;
        if self.poisoned.contains(&graph) {
            self.respond(&stream, op.id, graph, RejectReason::GraphPoisoned.to_outcome())
                .await;
            return;
        }
        let last_applied = match self.store.get(&graph) {
            Some(g) => g.last_applied(),
            None => {
                self.respond(&stream, op.id, graph, RejectReason::UnknownGraph.to_outcome())
                    .await;
                return;
            }
        };

        if let Some(batch) = op.batch {
            // Stale against both committed state and the batch tail.
            let key = (stream, graph, batch);
            let floor = self
                .batches
                .get(&key)
                .and_then(|buffer| buffer.last())
                .map_or(last_applied, |prev| prev.id);
            if !op.id.is_after(floor) {
                let reason = RejectReason::StaleOperation { last_applied: floor };
                self.respond(&stream, op.id, graph, reason.to_outcome()).await;
                return;
            }
            self.batches.entry(key).or_default().push(op);
            return;
        }

        if !op.id.is_after(last_applied) {
            let reason = RejectReason::StaleOperation { last_applied };
            self.respond(&stream, op.id, graph, reason.to_outcome()).await;
            return;
        }

        // Existence was checked above; the store is untouched since.
        let result = match self.store.get_mut(&graph) {
            Some(g) => g.apply(&op),
            None => return,
        };
        match result {
            Ok(delta) => {
                debug!(graph = %graph, op = %op.id, delta = delta.name(), "applied");
                self.respond(&stream, op.id, graph, Outcome::Applied).await;
                self.notify_commit(stream, graph, op.id);
            }
            Err(e) => {
                let reason = RejectReason::Apply(e);
                self.respond(&stream, op.id, graph, reason.to_outcome()).await;
            }
        }
    }

    async fn commit_batch(&mut self, stream: StreamId, op: EditOperation) {
        let graph = op.graph;
        let Some(batch) = op.batch else {
            self.respond(&stream, op.id, graph, RejectReason::UnknownBatch.to_outcome())
                .await;
            return;
        };
        let Some(members) = self.batches.remove(&(stream, graph, batch)) else {
            self.respond(&stream, op.id, graph, RejectReason::UnknownBatch.to_outcome())
                .await;
            return;
        };

        if self.poisoned.contains(&graph) {
            self.reject_batch(&stream, graph, &members, op.id, &RejectReason::GraphPoisoned)
                .await;
            return;
        }
        let Some(g) = self.store.get_mut(&graph) else {
            self.reject_batch(&stream, graph, &members, op.id, &RejectReason::UnknownGraph)
                .await;
            return;
        };

        let before = g.last_applied();
        if let Some(first) = members.first() {
            if !first.id.is_after(before) {
                let reason = RejectReason::StaleOperation { last_applied: before };
                self.reject_batch(&stream, graph, &members, op.id, &reason).await;
                return;
            }
        }

        match g.apply_batch(&members) {
            Ok(_) => {
                debug!(graph = %graph, batch = %batch, members = members.len(), "batch committed");
                let mut outcomes: Vec<OperationOutcome> = members
                    .iter()
                    .map(|m| OperationOutcome::new(m.id, graph, Outcome::Applied))
                    .collect();
                outcomes.push(OperationOutcome::new(op.id, graph, Outcome::Applied));
                self.router
                    .deliver(&stream, ResultEnvelope::Operations(outcomes))
                    .await;
                self.notify_commit(stream, graph, op.id);
            }
            Err(failure) => {
                // Rollback must leave the committed frontier untouched;
                // if it did not, the graph's state can no longer be
                // trusted and it fails closed.
                if self
                    .store
                    .get(&graph)
                    .is_some_and(|g| g.last_applied() != before)
                {
                    warn!(graph = %graph, "rollback verification failed, graph poisoned");
                    self.poisoned.insert(graph);
                }
                let mut outcomes = Vec::with_capacity(members.len() + 1);
                for m in &members {
                    let outcome = if m.id == failure.failed {
                        RejectReason::Apply(failure.error.clone()).to_outcome()
                    } else {
                        RejectReason::BatchAborted {
                            failed: failure.failed,
                        }
                        .to_outcome()
                    };
                    outcomes.push(OperationOutcome::new(m.id, graph, outcome));
                }
                outcomes.push(OperationOutcome::new(
                    op.id,
                    graph,
                    RejectReason::BatchAborted {
                        failed: failure.failed,
                    }
                    .to_outcome(),
                ));
                self.router
                    .deliver(&stream, ResultEnvelope::Operations(outcomes))
                    .await;
            }
        }
    }

    async fn reject_batch(
        &self,
        stream: &StreamId,
        graph: GraphId,
        members: &[EditOperation],
        commit_op: OperationId,
        reason: &RejectReason,
    ) {
        let mut outcomes: Vec<OperationOutcome> = members
            .iter()
            .map(|m| OperationOutcome::new(m.id, graph, reason.to_outcome()))
            .collect();
        outcomes.push(OperationOutcome::new(commit_op, graph, reason.to_outcome()));
        self.router
            .deliver(stream, ResultEnvelope::Operations(outcomes))
            .await;
    }

    /// Cancels everything still pending against one graph: queued
    /// operations from all streams and every open batch buffer.
    async fn cancel_graph(&mut self, graph: &GraphId) {
        let mut dropped: Vec<(StreamId, OperationId)> = Vec::new();
        if let Some(queue) = self.queues.remove(graph) {
            dropped.extend(queue.into_iter().map(|p| (p.stream, p.op.id)));
        }
        let keys: Vec<BatchKey> = self
            .batches
            .keys()
            .filter(|(_, g, _)| g == graph)
            .copied()
            .collect();
        for key in keys {
            if let Some(members) = self.batches.remove(&key) {
                dropped.extend(members.into_iter().map(|m| (key.0, m.id)));
            }
        }
        for (stream, op) in dropped {
            self.respond(&stream, op, *graph, Outcome::Cancelled).await;
        }
    }

    /// Cancels a departed stream's pending work, then unregisters it.
    /// Cancellation envelopes are queued before the sender drops so a
    /// still-draining writer can flush them.
    async fn close_stream(&mut self, stream: StreamId) {
        let mut dropped: Vec<(GraphId, OperationId)> = Vec::new();
        for (graph, queue) in &mut self.queues {
            let kept: VecDeque<Pending> = queue
                .drain(..)
                .filter_map(|p| {
                    if p.stream == stream {
                        dropped.push((*graph, p.op.id));
                        None
                    } else {
                        Some(p)
                    }
                })
                .collect();
            *queue = kept;
        }
        self.queues.retain(|_, q| !q.is_empty());

        let keys: Vec<BatchKey> = self
            .batches
            .keys()
            .filter(|(s, _, _)| *s == stream)
            .copied()
            .collect();
        for key in keys {
            if let Some(members) = self.batches.remove(&key) {
                dropped.extend(members.into_iter().map(|m| (key.1, m.id)));
            }
        }

        let count = dropped.len();
        for (graph, op) in dropped {
            self.respond(&stream, op, graph, Outcome::Cancelled).await;
        }
        if count > 0 {
            info!(stream = %stream, cancelled = count, "stream closed with pending work");
        }
        self.router.unregister(&stream);
    }

    async fn respond(&self, stream: &StreamId, op: OperationId, graph: GraphId, outcome: Outcome) {
        self.router
            .deliver(
                stream,
                ResultEnvelope::single(OperationOutcome::new(op, graph, outcome)),
            )
            .await;
    }

    /// Hands the new committed state to the compile side. `try_send`
    /// keeps the mutation loop from ever blocking on the compiler; a
    /// full channel drops the notice, and the next commit carries a
    /// fresher snapshot anyway.
    fn notify_commit(&mut self, stream: StreamId, graph: GraphId, trigger: OperationId) {
        let Some(commits) = &self.commits else {
            return;
        };
        let Some(snapshot) = self.store.snapshot(&graph) else {
            return;
        };
        let notice = CommitNotice {
            stream,
            graph,
            trigger,
            snapshot,
        };
        match commits.try_send(notice) {
            Ok(()) => {
                if let Some(g) = self.store.get_mut(&graph) {
                    g.mark_clean();
                }
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(graph = %graph, op = %trigger, "commit notice dropped, compile bridge lagging");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("compile bridge gone, commit notices disabled");
                self.commits = None;
            }
        }
    }
}
