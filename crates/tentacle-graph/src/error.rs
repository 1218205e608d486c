//! Mutation engine errors.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`ApplyError::InvalidReference`] | `GRAPH_INVALID_REFERENCE` | No |
//! | [`ApplyError::TypeMismatch`] | `GRAPH_TYPE_MISMATCH` | No |
//! | [`ApplyError::CyclicConnection`] | `GRAPH_CYCLIC_CONNECTION` | No |
//!
//! An apply failure never changes graph state; it is reported to the
//! originator as a rejected outcome, not raised as a fault.

use tentacle_types::{ErrorCode, OperationId, PinType};
use thiserror::Error;

/// Validation failure while applying one edit operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// The operation names a node, pin or link that does not exist
    /// (or creates one that already does).
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Link endpoint types are incompatible.
    #[error("type mismatch: {from} output cannot feed {to} input")]
    TypeMismatch { from: PinType, to: PinType },

    /// The link would introduce a cycle.
    #[error("connection would create a cycle")]
    CyclicConnection,
}

impl ErrorCode for ApplyError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidReference(_) => "GRAPH_INVALID_REFERENCE",
            Self::TypeMismatch { .. } => "GRAPH_TYPE_MISMATCH",
            Self::CyclicConnection => "GRAPH_CYCLIC_CONNECTION",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Failure of an atomic batch: which member failed and why.
///
/// The graph has already been rolled back to its pre-batch state when
/// this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("batch rolled back: {failed} failed: {error}")]
pub struct BatchFailure {
    pub failed: OperationId,
    pub error: ApplyError,
}
