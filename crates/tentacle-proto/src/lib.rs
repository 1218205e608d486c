//! Wire protocol for the Tentacle graph-edit bridge.
//!
//! This crate defines the frame format, the typed edit operations a
//! stream may carry, the stateless decoder, and the result envelopes
//! sent back to originators.
//!
//! # Frame Format
//!
//! ```text
//! ┌─────────┬──────────────┬──────────────┬──────────────────┐
//! │ version │  sequence    │  length      │  payload         │
//! │  u8     │  u64 BE      │  u32 BE      │  length bytes    │
//! └─────────┴──────────────┴──────────────┴──────────────────┘
//! ```
//!
//! The payload is JSON: a command envelope on the inbound path, a
//! [`ResultEnvelope`] on the response path. JSON keeps the protocol
//! forward-compatible — an operation kind the decoder does not know
//! is reported as [`DecodeError::UnknownOperationKind`] instead of
//! desynchronizing the stream.
//!
//! # Decode Path
//!
//! ```text
//! CommandFrame ──► raw envelope (op, graph, batch, kind, args)
//!                        │
//!                        ├─ version mismatch ──► SchemaVersionMismatch
//!                        ├─ unknown kind ──────► UnknownOperationKind
//!                        ├─ bad args ──────────► MalformedArguments
//!                        ▼
//!                  EditOperation
//! ```
//!
//! Decoding is pure and stateless; a failed frame never advances graph
//! state and never terminates the stream.
//!
//! # Example
//!
//! ```
//! use tentacle_proto::{decode, CommandFrame, EditOperation, OperationKind};
//! use tentacle_types::{GraphId, NodeId, OperationId, StreamId};
//!
//! let op = EditOperation::single(
//!     OperationId::new(1),
//!     GraphId::new(),
//!     OperationKind::DeleteNode { node: NodeId::new() },
//! );
//!
//! let frame = CommandFrame::new(1, StreamId::new(), op.encode());
//! let decoded = decode(&frame).unwrap();
//! assert_eq!(decoded, op);
//! ```

mod error;
mod frame;
mod operation;
mod outcome;

pub use error::DecodeError;
pub use frame::{CommandFrame, HEADER_LEN, PROTOCOL_VERSION};
pub use operation::{decode, EditOperation, OperationKind};
pub use outcome::{OperationOutcome, Outcome, ResultEnvelope};
