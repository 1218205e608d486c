//! Decode-layer errors.
//!
//! All codes carry the `PROTO_` prefix:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`DecodeError::UnknownOperationKind`] | `PROTO_UNKNOWN_KIND` | No |
//! | [`DecodeError::MalformedArguments`] | `PROTO_MALFORMED_ARGS` | No |
//! | [`DecodeError::SchemaVersionMismatch`] | `PROTO_VERSION_MISMATCH` | No |
//!
//! None are recoverable: a malformed frame will not become valid on
//! retry. None are fatal either — a decode failure produces a
//! [`Diagnostic`] tagged with the frame's sequence number and the
//! stream continues.

use serde::{Deserialize, Serialize};
use tentacle_types::{Diagnostic, ErrorCode};
use thiserror::Error;

/// Failure to turn a frame into a typed edit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DecodeError {
    /// The operation kind is not known to this decoder.
    ///
    /// Detectable because the kind is matched as a string before any
    /// argument parsing — newer producers degrade gracefully.
    #[error("unknown operation kind '{0}'")]
    UnknownOperationKind(String),

    /// The envelope or the kind-specific arguments failed to parse.
    #[error("malformed arguments for '{kind}': {detail}")]
    MalformedArguments { kind: String, detail: String },

    /// The frame header carries a schema version this decoder does
    /// not speak.
    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: u8, found: u8 },
}

impl DecodeError {
    /// Converts this error into a diagnostic tagged with the frame's
    /// sequence number, for delivery on the result path.
    #[must_use]
    pub fn to_diagnostic(&self, seq: u64) -> Diagnostic {
        Diagnostic::error(format!("frame {}: {}", seq, self))
    }
}

impl ErrorCode for DecodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownOperationKind(_) => "PROTO_UNKNOWN_KIND",
            Self::MalformedArguments { .. } => "PROTO_MALFORMED_ARGS",
            Self::SchemaVersionMismatch { .. } => "PROTO_VERSION_MISMATCH",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tentacle_types::assert_error_codes;

    #[test]
    fn codes_follow_convention() {
        assert_error_codes(
            &[
                DecodeError::UnknownOperationKind("x".into()),
                DecodeError::MalformedArguments {
                    kind: "create_node".into(),
                    detail: "missing field".into(),
                },
                DecodeError::SchemaVersionMismatch {
                    expected: 1,
                    found: 2,
                },
            ],
            "PROTO_",
        );
    }

    #[test]
    fn diagnostic_carries_sequence() {
        let err = DecodeError::UnknownOperationKind("warp".into());
        let diag = err.to_diagnostic(50);
        assert!(diag.severity.is_error());
        assert!(diag.message.contains("frame 50"));
        assert!(diag.message.contains("warp"));
    }
}
