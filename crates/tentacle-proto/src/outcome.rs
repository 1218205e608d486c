//! Result envelopes sent back to originators.
//!
//! Every submitted operation eventually receives exactly one terminal
//! outcome. An `Applied` operation may later be followed by a compile
//! outcome correlated to the same operation id (the compile trigger).
//!
//! Delivery order is preserved per (stream, graph) pair; outcomes for
//! different graphs may interleave.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use tentacle_types::{Diagnostic, GraphId, JobId, OperationId};

/// Terminal outcome of one operation, or a later compile result
/// correlated to its trigger operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// The operation mutated the graph.
    Applied,
    /// The operation was rejected; the graph is unchanged.
    ///
    /// `code` is the stable machine-readable code of the underlying
    /// error (`GRAPH_TYPE_MISMATCH`, `SCHED_STALE_OPERATION`, ...).
    Rejected { code: String, reason: String },
    /// The operation was dropped before application (cancel or
    /// stream disconnect).
    Cancelled,
    /// A compile pass triggered by this operation succeeded.
    Compiled {
        job: JobId,
        diagnostics: Vec<Diagnostic>,
    },
    /// A compile pass triggered by this operation failed. Failure is
    /// data, not a fault: the diagnostics say why.
    CompileFailed {
        job: JobId,
        diagnostics: Vec<Diagnostic>,
    },
    /// The compile pass exceeded its bounded wait; the originator may
    /// retry by submitting another mutation.
    CompileTimedOut { job: JobId },
    /// The compile pass was preempted by newer graph state; its
    /// diagnostics were discarded.
    Superseded { job: JobId },
}

impl Outcome {
    /// Returns `true` if this outcome reports a successful mutation.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// An outcome correlated to one operation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub op: OperationId,
    pub graph: GraphId,
    pub outcome: Outcome,
}

impl OperationOutcome {
    #[must_use]
    pub fn new(op: OperationId, graph: GraphId, outcome: Outcome) -> Self {
        Self { op, graph, outcome }
    }
}

/// One response-path frame payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultEnvelope {
    /// Outcomes for one or more operations.
    Operations(Vec<OperationOutcome>),
    /// A stream-level fault that is not correlated to an operation id:
    /// a decode failure (tagged with the frame sequence) or a
    /// transport fault.
    Fault {
        seq: Option<u64>,
        diagnostic: Diagnostic,
    },
}

impl ResultEnvelope {
    /// Wraps a single operation outcome.
    #[must_use]
    pub fn single(outcome: OperationOutcome) -> Self {
        Self::Operations(vec![outcome])
    }

    /// Builds the fault envelope for a decode failure.
    #[must_use]
    pub fn decode_fault(seq: u64, error: &DecodeError) -> Self {
        Self::Fault {
            seq: Some(seq),
            diagnostic: error.to_diagnostic(seq),
        }
    }

    /// Encodes this envelope as a frame payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("envelope serialization")
    }

    /// Decodes an envelope from a frame payload.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error if the payload is not a
    /// result envelope.
    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_roundtrip() {
        let envelope = ResultEnvelope::Operations(vec![
            OperationOutcome::new(OperationId::new(1), GraphId::new(), Outcome::Applied),
            OperationOutcome::new(
                OperationId::new(2),
                GraphId::new(),
                Outcome::Rejected {
                    code: "GRAPH_TYPE_MISMATCH".to_string(),
                    reason: "float output cannot feed bool input".to_string(),
                },
            ),
        ]);

        let back = ResultEnvelope::decode(&envelope.encode()).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn decode_fault_tags_sequence() {
        let err = DecodeError::UnknownOperationKind("warp".into());
        match ResultEnvelope::decode_fault(50, &err) {
            ResultEnvelope::Fault { seq, diagnostic } => {
                assert_eq!(seq, Some(50));
                assert!(diagnostic.message.contains("frame 50"));
            }
            other => panic!("expected Fault, got {:?}", other),
        }
    }

    #[test]
    fn compile_outcomes_carry_job() {
        let job = JobId::new();
        let outcome = Outcome::Compiled {
            job,
            diagnostics: vec![Diagnostic::info("2 nodes, 1 link")],
        };
        assert!(!outcome.is_applied());
        let json = serde_json::to_string(&outcome).unwrap();
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
