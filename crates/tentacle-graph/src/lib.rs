//! Graph model and mutation engine.
//!
//! A [`Graph`] is the mutable visual-scripting structure (nodes, pins,
//! links) targeted by edit operations. The [`GraphStore`] owns every
//! graph exclusively; nothing outside the scheduler's single execution
//! context ever holds a mutable reference. All other components see
//! graphs only through committed, immutable [`GraphSnapshot`]s.
//!
//! # Mutation Discipline
//!
//! ```text
//!               apply(&EditOperation)
//!                      │
//!              validate (referential
//!              integrity, pin types,
//!              cycles) — no mutation yet
//!                      │
//!          ┌───── Err(ApplyError) ── graph unchanged
//!          ▼
//!    mutate + record invertible AppliedDelta
//!          │
//!          ▼
//!    history (undo), dirty flag, last-applied id
//! ```
//!
//! Batches apply atomically: a pre-batch snapshot is restored if any
//! member fails validation, so no partial batch is ever observable.

mod delta;
mod error;
mod graph;
mod model;
mod snapshot;
mod store;

pub use delta::AppliedDelta;
pub use error::{ApplyError, BatchFailure};
pub use graph::Graph;
pub use model::{Link, Node};
pub use snapshot::GraphSnapshot;
pub use store::GraphStore;
