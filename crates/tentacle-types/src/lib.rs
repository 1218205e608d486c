//! Core types for the Tentacle graph-edit bridge.
//!
//! This crate provides the foundational vocabulary shared by every
//! layer of the system: identifier types, the pin model used by
//! visual-scripting graphs, and the [`Diagnostic`] type carried back
//! to edit originators.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Protocol Layer                         │
//! │  (stable wire vocabulary, safe to depend on)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tentacle-types : ids, pins, Diagnostic, ErrorCode ◄── HERE │
//! │  tentacle-proto : frames, operations, outcomes              │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Runtime Layer                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tentacle-graph   : graph model + mutation engine           │
//! │  tentacle-runtime : transport, sessions, scheduler          │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Editor Layer                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tentacle-compiler : compile bridge (never linked by the    │
//! │                      runtime layer)                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identifier Design
//!
//! Entity identifiers ([`StreamId`], [`GraphId`], [`NodeId`], [`JobId`])
//! are UUID-based so they are safe to transmit across processes without
//! coordination. Ordering identifiers ([`OperationId`], [`BatchId`]) are
//! plain sequence numbers: they are assigned by the originating stream
//! and must increase monotonically within it.
//!
//! # Example
//!
//! ```
//! use tentacle_types::{GraphId, NodeId, OperationId, Diagnostic, Severity};
//!
//! let graph = GraphId::new();
//! let node = NodeId::new();
//!
//! let op = OperationId::new(7);
//! assert!(OperationId::new(8).is_after(op));
//!
//! let diag = Diagnostic::warning("pin not connected").with_node(node);
//! assert_eq!(diag.severity, Severity::Warning);
//! ```

mod diagnostic;
mod error;
mod id;
mod pin;

pub use diagnostic::{Diagnostic, Severity};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{BatchId, GraphId, JobId, NodeId, OperationId, StreamId};
pub use pin::{PinDirection, PinRef, PinSpec, PinType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(GraphId::new(), GraphId::new());
        assert_ne!(NodeId::new(), NodeId::new());
        assert_ne!(StreamId::new(), StreamId::new());
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn operation_ids_are_ordered() {
        let a = OperationId::new(1);
        let b = OperationId::new(2);
        assert!(a < b);
        assert!(b.is_after(a));
        assert!(!a.is_after(b));
        assert!(!a.is_after(a));
    }

    #[test]
    fn pin_ref_display() {
        let node = NodeId::new();
        let pin = PinRef::new(node, "out");
        assert!(format!("{}", pin).contains("out"));
    }
}
