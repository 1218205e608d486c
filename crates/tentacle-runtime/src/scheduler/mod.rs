//! Single-writer operation scheduling.
//!
//! All graph mutation funnels through one task:
//!
//! ```text
//!   session reader ──┐
//!   session reader ──┼─ mpsc ──▶ MutationScheduler ──▶ GraphStore
//!   local client   ──┘              │          │
//!                                   │          └─ CommitNotice ─▶ compile bridge
//!                                   └─ ResultRouter ─▶ session writers
//! ```
//!
//! The scheduler owns the [`GraphStore`](tentacle_graph::GraphStore)
//! outright. Fairness across graphs comes from per-graph sub-queues
//! drained round-robin; atomicity of batches comes from buffering
//! members until their commit marker arrives.

mod command;
#[allow(clippy::module_inception)]
mod scheduler;

pub use command::{CommitNotice, SchedulerCommand, SchedulerError, SchedulerHandle};
pub use scheduler::{MutationScheduler, RejectReason};
