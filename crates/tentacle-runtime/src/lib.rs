//! Tentacle runtime: stream transport, sessions and the single-writer
//! mutation scheduler.
//!
//! # Architecture
//!
//! ```text
//!   bytes in ─▶ FrameReader ─▶ decode ─▶ SchedulerHandle ─┐
//!                (session reader task, one per stream)    │
//!                                                  mpsc inbox
//!                                                         │
//!                                                         ▼
//!                                              MutationScheduler
//!                                              (owns GraphStore)
//!                                                   │        │
//!                     ResultRouter ◀────────────────┘        └─▶ CommitNotice
//!                          │                                     (to compile
//!   bytes out ◀─ FrameWriter ◀─ (session writer task)            bridge)
//! ```
//!
//! Two rules hold everything together:
//!
//! - **Single writer.** Graph state is owned by the scheduler task;
//!   every mutation goes through its inbox and applies serially.
//!   Readers get detached snapshots, never references.
//! - **Faults are contained.** A frame that fails to decode costs that
//!   frame; an operation that fails validation costs that operation;
//!   a stream that dies costs its own pending work. Nothing else
//!   stops.
//!
//! The crate deliberately has no compile-side dependency: committed
//! state leaves through [`CommitNotice`] and whoever consumes it is
//! someone else's concern.

pub mod client;
pub mod config;
pub mod engine;
pub mod results;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use client::{ClientError, StreamClient};
pub use config::{ConfigError, TentacleConfig};
pub use engine::{LocalClient, TentacleEngine};
pub use results::ResultRouter;
pub use scheduler::{
    CommitNotice, MutationScheduler, RejectReason, SchedulerCommand, SchedulerError,
    SchedulerHandle,
};
pub use transport::{FrameReader, FrameWriter, TransportError};
