//! Identifier types for Tentacle.
//!
//! Entity ids are UUID v4 (random, no coordination needed across
//! processes). Ordering ids are sequence numbers owned by the
//! originating stream.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Short form: prefix plus the first uuid group is enough
                // to tell ids apart in logs.
                let s = self.0.to_string();
                write!(f, "{}:{}", $prefix, &s[..8])
            }
        }
    };
}

uuid_id!(
    /// Identifier for one command stream.
    ///
    /// A stream is a single ordered producer of edit operations: a
    /// network connection, or the editor UI feeding edits back through
    /// the same decode path.
    StreamId,
    "stream"
);

uuid_id!(
    /// Identifier for a graph owned by the mutation engine.
    ///
    /// External components hold graphs only by id, never by reference.
    GraphId,
    "graph"
);

uuid_id!(
    /// Identifier for a node within a graph.
    NodeId,
    "node"
);

uuid_id!(
    /// Identifier for one compile pass.
    JobId,
    "job"
);

/// Sequence number of an edit operation within its stream.
///
/// Operation ids are assigned by the producer and must increase
/// monotonically within a stream. For a given graph the scheduler
/// rejects any operation whose id is not greater than the last id it
/// applied — reordering is never silently accepted.
///
/// # Example
///
/// ```
/// use tentacle_types::OperationId;
///
/// let first = OperationId::new(1);
/// let second = OperationId::new(2);
/// assert!(second.is_after(first));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OperationId(pub u64);

impl OperationId {
    /// The id that precedes every real operation. A fresh graph has
    /// `ZERO` as its last-applied id so that operation 1 is accepted.
    pub const ZERO: OperationId = OperationId(0);

    /// Creates an operation id from a raw sequence number.
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw sequence number.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    /// Returns `true` if this id is strictly greater than `other`.
    #[must_use]
    pub fn is_after(self, other: OperationId) -> bool {
        self.0 > other.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Identifier for an atomic batch of operations within a stream.
///
/// Operations sharing a batch id buffer in the scheduler until the
/// batch is committed, then apply atomically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl BatchId {
    /// Creates a batch id from a raw number.
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_short_form() {
        let id = GraphId::new();
        let shown = format!("{}", id);
        assert!(shown.starts_with("graph:"));
        assert_eq!(shown.len(), "graph:".len() + 8);
    }

    #[test]
    fn operation_id_zero_precedes_all() {
        assert!(OperationId::new(1).is_after(OperationId::ZERO));
    }

    #[test]
    fn ids_roundtrip_through_serde() {
        let id = NodeId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let op = OperationId::new(42);
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, "42");
        let back: OperationId = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
