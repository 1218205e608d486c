//! Typed edit operations and the stateless decoder.

use crate::error::DecodeError;
use crate::frame::{CommandFrame, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tentacle_types::{BatchId, GraphId, NodeId, OperationId, PinRef, PinSpec};

/// A decoded, typed request against one graph.
///
/// The operation id is assigned by the producer and must increase
/// monotonically within its stream; the scheduler rejects anything
/// else as stale. Operations carrying a batch id buffer until a
/// [`OperationKind::CommitBatch`] arrives for that id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditOperation {
    pub id: OperationId,
    pub graph: GraphId,
    pub batch: Option<BatchId>,
    pub kind: OperationKind,
}

/// What an edit operation does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Registers a new empty graph under the operation's graph id.
    CreateGraph,
    /// Removes the graph and cancels anything still queued for it.
    DestroyGraph,
    /// Adds a node with the given pin layout.
    CreateNode {
        node: NodeId,
        title: String,
        pins: Vec<PinSpec>,
    },
    /// Removes a node, severing all of its links.
    DeleteNode { node: NodeId },
    /// Links an output pin to an input pin.
    ConnectPins { from: PinRef, to: PinRef },
    /// Removes an existing link.
    DisconnectPins { from: PinRef, to: PinRef },
    /// Sets a node property to a JSON value.
    SetProperty {
        node: NodeId,
        key: String,
        value: Value,
    },
    /// Atomically applies every buffered operation of this batch.
    CommitBatch,
    /// Drops every queued operation for the graph, emitting a
    /// Cancelled outcome for each dropped id.
    CancelGraph,
}

impl OperationKind {
    /// Wire name of this kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateGraph => "create_graph",
            Self::DestroyGraph => "destroy_graph",
            Self::CreateNode { .. } => "create_node",
            Self::DeleteNode { .. } => "delete_node",
            Self::ConnectPins { .. } => "connect_pins",
            Self::DisconnectPins { .. } => "disconnect_pins",
            Self::SetProperty { .. } => "set_property",
            Self::CommitBatch => "commit_batch",
            Self::CancelGraph => "cancel_graph",
        }
    }

    /// Returns `true` for kinds the mutation engine applies directly
    /// (as opposed to lifecycle and queue-control kinds handled by the
    /// scheduler).
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateNode { .. }
                | Self::DeleteNode { .. }
                | Self::ConnectPins { .. }
                | Self::DisconnectPins { .. }
                | Self::SetProperty { .. }
        )
    }
}

impl EditOperation {
    /// Creates an unbatched operation.
    #[must_use]
    pub fn single(id: OperationId, graph: GraphId, kind: OperationKind) -> Self {
        Self {
            id,
            graph,
            batch: None,
            kind,
        }
    }

    /// Creates an operation belonging to a batch.
    #[must_use]
    pub fn batched(id: OperationId, graph: GraphId, batch: BatchId, kind: OperationKind) -> Self {
        Self {
            id,
            graph,
            batch: Some(batch),
            kind,
        }
    }

    /// Encodes this operation as a frame payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let args = match &self.kind {
            OperationKind::CreateNode { node, title, pins } => serde_json::json!({
                "node": node, "title": title, "pins": pins,
            }),
            OperationKind::DeleteNode { node } => serde_json::json!({ "node": node }),
            OperationKind::ConnectPins { from, to }
            | OperationKind::DisconnectPins { from, to } => {
                serde_json::json!({ "from": from, "to": to })
            }
            OperationKind::SetProperty { node, key, value } => serde_json::json!({
                "node": node, "key": key, "value": value,
            }),
            OperationKind::CreateGraph
            | OperationKind::DestroyGraph
            | OperationKind::CommitBatch
            | OperationKind::CancelGraph => Value::Null,
        };

        let envelope = RawEnvelope {
            op: self.id,
            graph: self.graph,
            batch: self.batch,
            kind: self.kind.name().to_string(),
            args,
        };

        // An in-memory envelope of plain values cannot fail to serialize.
        serde_json::to_vec(&envelope).expect("envelope serialization")
    }
}

/// Untyped first decode stage. Splitting the kind string from its
/// arguments is what makes unknown kinds and malformed arguments
/// distinguishable failures.
#[derive(Debug, Serialize, Deserialize)]
struct RawEnvelope {
    op: OperationId,
    graph: GraphId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch: Option<BatchId>,
    kind: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
struct CreateNodeArgs {
    node: NodeId,
    title: String,
    #[serde(default)]
    pins: Vec<PinSpec>,
}

#[derive(Deserialize)]
struct NodeArgs {
    node: NodeId,
}

#[derive(Deserialize)]
struct LinkArgs {
    from: PinRef,
    to: PinRef,
}

#[derive(Deserialize)]
struct SetPropertyArgs {
    node: NodeId,
    key: String,
    value: Value,
}

/// Decodes a frame into a typed edit operation.
///
/// Pure and stateless: no side effects beyond allocation. A failure
/// reports the frame, not the stream — callers keep decoding
/// subsequent frames.
///
/// # Errors
///
/// - [`DecodeError::SchemaVersionMismatch`] if the frame header
///   carries a different protocol version
/// - [`DecodeError::UnknownOperationKind`] if the kind string is not
///   recognized
/// - [`DecodeError::MalformedArguments`] if the envelope or the
///   kind-specific arguments fail to parse
pub fn decode(frame: &CommandFrame) -> Result<EditOperation, DecodeError> {
    if frame.version != PROTOCOL_VERSION {
        return Err(DecodeError::SchemaVersionMismatch {
            expected: PROTOCOL_VERSION,
            found: frame.version,
        });
    }

    let envelope: RawEnvelope =
        serde_json::from_slice(&frame.payload).map_err(|e| DecodeError::MalformedArguments {
            kind: "envelope".to_string(),
            detail: e.to_string(),
        })?;

    let malformed = |detail: serde_json::Error| DecodeError::MalformedArguments {
        kind: envelope.kind.clone(),
        detail: detail.to_string(),
    };

    let kind = match envelope.kind.as_str() {
        "create_graph" => OperationKind::CreateGraph,
        "destroy_graph" => OperationKind::DestroyGraph,
        "create_node" => {
            let args: CreateNodeArgs =
                serde_json::from_value(envelope.args.clone()).map_err(malformed)?;
            OperationKind::CreateNode {
                node: args.node,
                title: args.title,
                pins: args.pins,
            }
        }
        "delete_node" => {
            let args: NodeArgs =
                serde_json::from_value(envelope.args.clone()).map_err(malformed)?;
            OperationKind::DeleteNode { node: args.node }
        }
        "connect_pins" => {
            let args: LinkArgs =
                serde_json::from_value(envelope.args.clone()).map_err(malformed)?;
            OperationKind::ConnectPins {
                from: args.from,
                to: args.to,
            }
        }
        "disconnect_pins" => {
            let args: LinkArgs =
                serde_json::from_value(envelope.args.clone()).map_err(malformed)?;
            OperationKind::DisconnectPins {
                from: args.from,
                to: args.to,
            }
        }
        "set_property" => {
            let args: SetPropertyArgs =
                serde_json::from_value(envelope.args.clone()).map_err(malformed)?;
            OperationKind::SetProperty {
                node: args.node,
                key: args.key,
                value: args.value,
            }
        }
        "commit_batch" => OperationKind::CommitBatch,
        "cancel_graph" => OperationKind::CancelGraph,
        other => return Err(DecodeError::UnknownOperationKind(other.to_string())),
    };

    Ok(EditOperation {
        id: envelope.op,
        graph: envelope.graph,
        batch: envelope.batch,
        kind,
    })
}
