//! Tentacle compiler bridge: incremental compilation of committed
//! graph state.
//!
//! Sits downstream of the runtime:
//!
//! ```text
//!   MutationScheduler ── CommitNotice ──▶ CompileBridge ──▶ HostCompiler
//!                                              │
//!                         ResultRouter ◀── compile outcome
//!                                           (Compiled / CompileFailed /
//!                                            CompileTimedOut / Superseded)
//! ```
//!
//! Three rules:
//!
//! - **Debounce.** A burst of commits coalesces into one compile of
//!   the latest snapshot; intermediate triggers get no outcome.
//! - **Serial worker.** One job at a time, across all graphs.
//! - **Supersede.** A commit landing mid-job preempts it: the
//!   originator hears `Superseded` immediately and the job's late
//!   diagnostics are discarded.
//!
//! A compile that runs and finds errors is a *failed pass*, reported
//! as diagnostics — it is never a fault of the pipeline.
//!
//! This crate depends on the runtime, never the other way around: a
//! headless runtime must not link compile machinery.

pub mod bridge;
pub mod host;
pub mod job;

pub use bridge::CompileBridge;
pub use host::{CompileError, GraphChecker, HostCompiler};
pub use job::{CompileJob, JobStatus};
