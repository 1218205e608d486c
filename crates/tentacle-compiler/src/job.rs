//! Compile job identity and lifecycle.

use std::fmt;
use tentacle_graph::GraphSnapshot;
use tentacle_runtime::CommitNotice;
use tentacle_types::{GraphId, JobId, OperationId, StreamId};

/// One compile pass over one committed snapshot.
///
/// A job is created when a graph leaves its debounce window and is
/// handed to the worker. The snapshot is pinned at creation: commits
/// that land while the job runs supersede it instead of changing its
/// input.
#[derive(Debug, Clone)]
pub struct CompileJob {
    pub id: JobId,
    pub graph: GraphId,
    /// Stream that receives the compile outcome.
    pub stream: StreamId,
    /// Operation id the outcome is correlated to.
    pub trigger: OperationId,
    pub snapshot: GraphSnapshot,
}

impl CompileJob {
    /// Pins a commit notice into a job with a fresh id.
    #[must_use]
    pub fn from_notice(notice: CommitNotice) -> Self {
        Self {
            id: JobId::new(),
            graph: notice.graph,
            stream: notice.stream,
            trigger: notice.trigger,
            snapshot: notice.snapshot,
        }
    }
}

/// Lifecycle of a compile job. Terminal states are final: a job that
/// timed out does not later succeed, its late result is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Waiting for the serial worker.
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Preempted by a newer commit; diagnostics discarded.
    Superseded,
    TimedOut,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Superseded => "superseded",
            Self::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}
