//! The compile bridge: from commit notices to compile outcomes.
//!
//! Per graph, the bridge runs this state machine:
//!
//! ```text
//!               commit                debounce deadline
//!   (idle) ───────────▶ Debouncing ───────────────▶ Queued
//!              ▲            │ commit: replace         │ worker free
//!              │            ▼ notice, reset           ▼
//!              │        Debouncing                 Running ◀─┐
//!              │                                      │      │ commit:
//!   outcome delivered ◀───────────────────────────────┘      │ mark superseded,
//!   (pending commit re-enters Debouncing)                    │ stash pending
//!                                                            ┘
//! ```
//!
//! One job runs at a time across all graphs: compile output must not
//! interleave, and a slow host degrades to longer queues instead of
//! unbounded parallelism. A commit landing mid-job supersedes the job
//! immediately — the originator hears `Superseded` at once and the
//! job's late diagnostics are discarded on arrival.

use crate::host::{CompileError, HostCompiler};
use crate::job::{CompileJob, JobStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tentacle_proto::{OperationOutcome, Outcome, ResultEnvelope};
use tentacle_runtime::{CommitNotice, ResultRouter};
use tentacle_types::{Diagnostic, ErrorCode, GraphId, JobId};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Per-graph compile state. Absent from the map means idle.
enum GraphState {
    /// Waiting out the quiet window. New commits replace the notice
    /// and restart the window.
    Debouncing {
        deadline: Instant,
        notice: CommitNotice,
    },
    /// Quiet window elapsed; waiting for the serial worker.
    Queued { notice: CommitNotice },
    /// A job is compiling this graph's pinned snapshot.
    Running {
        job: CompileJob,
        superseded: bool,
        /// Commit that landed mid-job; re-enters debounce when the
        /// job finishes.
        pending: Option<CommitNotice>,
    },
}

/// Worker result, fed back into the bridge loop.
struct JobDone {
    graph: GraphId,
    job: JobId,
    /// `None` when the bounded wait elapsed first.
    result: Option<Result<Vec<Diagnostic>, CompileError>>,
}

/// Consumes commit notices and drives compile jobs.
pub struct CompileBridge {
    commits: mpsc::Receiver<CommitNotice>,
    router: ResultRouter,
    compiler: Arc<dyn HostCompiler>,
    debounce: Duration,
    timeout: Duration,
    states: HashMap<GraphId, GraphState>,
    ready: VecDeque<GraphId>,
    running: Option<GraphId>,
    done_tx: mpsc::Sender<JobDone>,
    done_rx: mpsc::Receiver<JobDone>,
}

impl CompileBridge {
    #[must_use]
    pub fn new(
        commits: mpsc::Receiver<CommitNotice>,
        router: ResultRouter,
        compiler: Arc<dyn HostCompiler>,
        debounce: Duration,
        timeout: Duration,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::channel(1);
        Self {
            commits,
            router,
            compiler,
            debounce,
            timeout,
            states: HashMap::new(),
            ready: VecDeque::new(),
            running: None,
            done_tx,
            done_rx,
        }
    }

    /// Runs until the commit channel closes and the last job settles.
    pub async fn run(mut self) {
        info!(
            debounce_ms = self.debounce.as_millis() as u64,
            timeout_ms = self.timeout.as_millis() as u64,
            "compile bridge started"
        );
        let mut commits_open = true;
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;
                Some(done) = self.done_rx.recv(), if self.running.is_some() => {
                    self.finish_job(done).await;
                }
                maybe = self.commits.recv(), if commits_open => {
                    match maybe {
                        Some(notice) => self.on_commit(notice).await,
                        None => commits_open = false,
                    }
                }
                () = sleep_until_or_park(deadline), if deadline.is_some() => {
                    self.expire_debounce();
                }
                else => break,
            }
            self.launch_next();
            if !commits_open && self.running.is_none() && self.states.is_empty() {
                break;
            }
        }
        info!("compile bridge stopped");
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.states
            .values()
            .filter_map(|s| match s {
                GraphState::Debouncing { deadline, .. } => Some(*deadline),
                _ => None,
            })
            .min()
    }

    async fn on_commit(&mut self, notice: CommitNotice) {
        let graph = notice.graph;
        match self.states.remove(&graph) {
            None => {
                self.states.insert(
                    graph,
                    GraphState::Debouncing {
                        deadline: Instant::now() + self.debounce,
                        notice,
                    },
                );
            }
            // Still quiet-windowed or queued: the newer commit wins,
            // the replaced trigger gets no compile outcome.
            Some(GraphState::Debouncing { .. }) => {
                debug!(graph = %graph, trigger = %notice.trigger, "debounce restarted");
                self.states.insert(
                    graph,
                    GraphState::Debouncing {
                        deadline: Instant::now() + self.debounce,
                        notice,
                    },
                );
            }
            Some(GraphState::Queued { .. }) => {
                self.states.insert(graph, GraphState::Queued { notice });
            }
            Some(GraphState::Running {
                job,
                superseded,
                pending: _,
            }) => {
                if !superseded {
                    debug!(graph = %graph, job = %job.id, "job superseded by newer commit");
                    self.deliver(&job, Outcome::Superseded { job: job.id }).await;
                }
                self.states.insert(
                    graph,
                    GraphState::Running {
                        job,
                        superseded: true,
                        pending: Some(notice),
                    },
                );
            }
        }
    }

    fn expire_debounce(&mut self) {
        let now = Instant::now();
        let expired: Vec<GraphId> = self
            .states
            .iter()
            .filter_map(|(graph, state)| match state {
                GraphState::Debouncing { deadline, .. } if *deadline <= now => Some(*graph),
                _ => None,
            })
            .collect();
        for graph in expired {
            if let Some(GraphState::Debouncing { notice, .. }) = self.states.remove(&graph) {
                self.states.insert(graph, GraphState::Queued { notice });
                self.ready.push_back(graph);
            }
        }
    }

    /// Starts the next queued job if the worker is free.
    fn launch_next(&mut self) {
        if self.running.is_some() {
            return;
        }
        let Some(graph) = self.ready.pop_front() else {
            return;
        };
        let Some(GraphState::Queued { notice }) = self.states.remove(&graph) else {
            return;
        };

        let job = CompileJob::from_notice(notice);
        debug!(graph = %graph, job = %job.id, trigger = %job.trigger, "compile job started");
        self.running = Some(graph);

        let compiler = Arc::clone(&self.compiler);
        let snapshot = job.snapshot.clone();
        let done = self.done_tx.clone();
        let timeout = self.timeout;
        let job_id = job.id;
        tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, compiler.compile(&snapshot))
                .await
                .ok();
            let _ = done
                .send(JobDone {
                    graph,
                    job: job_id,
                    result,
                })
                .await;
        });

        self.states.insert(
            graph,
            GraphState::Running {
                job,
                superseded: false,
                pending: None,
            },
        );
    }

    async fn finish_job(&mut self, done: JobDone) {
        self.running = None;
        let Some(GraphState::Running {
            job,
            superseded,
            pending,
        }) = self.states.remove(&done.graph)
        else {
            return;
        };
        debug_assert_eq!(job.id, done.job);

        let status = if superseded {
            // Outcome already delivered when the supersede happened;
            // whatever the worker produced is stale.
            JobStatus::Superseded
        } else {
            let (status, outcome) = settle(job.id, done.result);
            self.deliver(&job, outcome).await;
            status
        };
        info!(graph = %done.graph, job = %done.job, status = %status, "compile job finished");

        if let Some(notice) = pending {
            self.states.insert(
                done.graph,
                GraphState::Debouncing {
                    deadline: Instant::now() + self.debounce,
                    notice,
                },
            );
        }
    }

    async fn deliver(&self, job: &CompileJob, outcome: Outcome) {
        let delivered = self
            .router
            .deliver(
                &job.stream,
                ResultEnvelope::single(OperationOutcome::new(job.trigger, job.graph, outcome)),
            )
            .await;
        if !delivered {
            debug!(job = %job.id, "compile outcome dropped, stream gone");
        }
    }
}

/// Maps a worker result to terminal status and outcome.
fn settle(
    job: JobId,
    result: Option<Result<Vec<Diagnostic>, CompileError>>,
) -> (JobStatus, Outcome) {
    match result {
        None => (JobStatus::TimedOut, Outcome::CompileTimedOut { job }),
        Some(Ok(diagnostics)) => {
            if diagnostics.iter().any(|d| d.severity.is_error()) {
                (JobStatus::Failed, Outcome::CompileFailed { job, diagnostics })
            } else {
                (JobStatus::Succeeded, Outcome::Compiled { job, diagnostics })
            }
        }
        Some(Err(e)) => {
            warn!(job = %job, code = e.code(), "host compiler fault: {e}");
            (
                JobStatus::Failed,
                Outcome::CompileFailed {
                    job,
                    diagnostics: vec![Diagnostic::error(e.to_string())],
                },
            )
        }
    }
}

/// `select!`-friendly sleep: parks forever when there is no deadline.
/// The guard on the branch keeps the parked arm from ever completing.
async fn sleep_until_or_park(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
