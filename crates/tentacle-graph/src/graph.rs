//! The mutable graph and its apply/undo machinery.

use crate::delta::AppliedDelta;
use crate::error::{ApplyError, BatchFailure};
use crate::model::{Link, Node};
use crate::snapshot::GraphSnapshot;
use std::collections::HashMap;
use tentacle_proto::{EditOperation, OperationKind};
use tentacle_types::{GraphId, NodeId, OperationId, PinDirection, PinRef};
use tracing::debug;

/// One mutable visual-scripting graph.
///
/// Owned exclusively by the [`GraphStore`](crate::GraphStore); mutated
/// only through [`apply`](Graph::apply) and [`apply_batch`](Graph::apply_batch)
/// from the scheduler's execution context.
#[derive(Debug, Clone)]
pub struct Graph {
    id: GraphId,
    nodes: HashMap<NodeId, Node>,
    links: Vec<Link>,
    /// Highest operation id applied to this graph. Operations at or
    /// below this id are stale.
    last_applied: OperationId,
    /// Set on every successful mutation, cleared when a compile pass
    /// picks the graph up.
    dirty: bool,
    history: Vec<AppliedDelta>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(id: GraphId) -> Self {
        Self {
            id,
            nodes: HashMap::new(),
            links: Vec::new(),
            last_applied: OperationId::ZERO,
            dirty: false,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Highest operation id applied so far.
    #[must_use]
    pub fn last_applied(&self) -> OperationId {
        self.last_applied
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag. Called when a compile pass has captured
    /// the current state.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Number of deltas in the undo history.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Takes a committed, immutable snapshot for read-side consumers.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(self.id, &self.nodes, &self.links, self.last_applied)
    }

    /// Applies one edit operation.
    ///
    /// Validation happens before any mutation: on error the graph is
    /// unchanged, bit for bit. On success the invertible delta is
    /// appended to the undo history, the graph is marked dirty and the
    /// operation id becomes the new last-applied id.
    ///
    /// # Errors
    ///
    /// [`ApplyError::InvalidReference`], [`ApplyError::TypeMismatch`]
    /// or [`ApplyError::CyclicConnection`]; see each check below.
    pub fn apply(&mut self, op: &EditOperation) -> Result<AppliedDelta, ApplyError> {
        let delta = match &op.kind {
            OperationKind::CreateNode { node, title, pins } => {
                if self.nodes.contains_key(node) {
                    return Err(ApplyError::InvalidReference(format!(
                        "node {} already exists",
                        node
                    )));
                }
                let mut seen = std::collections::HashSet::new();
                for pin in pins {
                    if !seen.insert(pin.name.as_str()) {
                        return Err(ApplyError::InvalidReference(format!(
                            "duplicate pin name '{}'",
                            pin.name
                        )));
                    }
                }
                let created = Node::new(*node, title.clone(), pins.clone());
                self.nodes.insert(*node, created.clone());
                AppliedDelta::NodeCreated { node: created }
            }

            OperationKind::DeleteNode { node } => {
                let removed = self.nodes.remove(node).ok_or_else(|| {
                    ApplyError::InvalidReference(format!("node {} does not exist", node))
                })?;
                let mut severed = Vec::new();
                self.links.retain(|link| {
                    if link.touches(*node) {
                        severed.push(link.clone());
                        false
                    } else {
                        true
                    }
                });
                AppliedDelta::NodeDeleted {
                    node: removed,
                    severed,
                }
            }

            OperationKind::ConnectPins { from, to } => {
                self.validate_link(from, to)?;
                let link = Link::new(from.clone(), to.clone());
                self.links.push(link.clone());
                AppliedDelta::LinkAdded { link }
            }

            OperationKind::DisconnectPins { from, to } => {
                let pos = self
                    .links
                    .iter()
                    .position(|l| &l.from == from && &l.to == to)
                    .ok_or_else(|| {
                        ApplyError::InvalidReference(format!(
                            "no link from {} to {}",
                            from, to
                        ))
                    })?;
                let link = self.links.remove(pos);
                AppliedDelta::LinkRemoved { link }
            }

            OperationKind::SetProperty { node, key, value } => {
                let target = self.nodes.get_mut(node).ok_or_else(|| {
                    ApplyError::InvalidReference(format!("node {} does not exist", node))
                })?;
                let previous = target.properties.insert(key.clone(), value.clone());
                AppliedDelta::PropertySet {
                    node: *node,
                    key: key.clone(),
                    previous,
                    value: value.clone(),
                }
            }

            // Lifecycle and queue-control kinds never reach the
            // mutation engine; the scheduler handles them.
            other => {
                return Err(ApplyError::InvalidReference(format!(
                    "'{}' is not a graph mutation",
                    other.name()
                )));
            }
        };

        debug!(graph = %self.id, op = %op.id, delta = delta.name(), "applied");
        self.last_applied = op.id;
        self.dirty = true;
        self.history.push(delta.clone());
        Ok(delta)
    }

    /// Applies a batch atomically.
    ///
    /// If any member fails validation the graph is rolled back to its
    /// pre-batch state and [`BatchFailure`] names the failing
    /// operation — none of the batch's deltas remain observable.
    pub fn apply_batch(
        &mut self,
        ops: &[EditOperation],
    ) -> Result<Vec<AppliedDelta>, BatchFailure> {
        let checkpoint = self.clone();
        let mut deltas = Vec::with_capacity(ops.len());

        for op in ops {
            match self.apply(op) {
                Ok(delta) => deltas.push(delta),
                Err(error) => {
                    let failed = op.id;
                    *self = checkpoint;
                    debug!(graph = %self.id, op = %failed, "batch rolled back");
                    return Err(BatchFailure { failed, error });
                }
            }
        }

        Ok(deltas)
    }

    /// Undoes the most recent delta, if any.
    pub fn undo_last(&mut self) -> Option<AppliedDelta> {
        let delta = self.history.pop()?;
        match &delta {
            AppliedDelta::NodeCreated { node } => {
                self.nodes.remove(&node.id);
            }
            AppliedDelta::NodeDeleted { node, severed } => {
                self.nodes.insert(node.id, node.clone());
                self.links.extend(severed.iter().cloned());
            }
            AppliedDelta::LinkAdded { link } => {
                self.links.retain(|l| l != link);
            }
            AppliedDelta::LinkRemoved { link } => {
                self.links.push(link.clone());
            }
            AppliedDelta::PropertySet {
                node,
                key,
                previous,
                ..
            } => {
                if let Some(target) = self.nodes.get_mut(node) {
                    match previous {
                        Some(value) => {
                            target.properties.insert(key.clone(), value.clone());
                        }
                        None => {
                            target.properties.remove(key);
                        }
                    }
                }
            }
        }
        self.dirty = true;
        Some(delta)
    }

    /// Validates a prospective link without mutating anything.
    fn validate_link(&self, from: &PinRef, to: &PinRef) -> Result<(), ApplyError> {
        let from_node = self.nodes.get(&from.node).ok_or_else(|| {
            ApplyError::InvalidReference(format!("node {} does not exist", from.node))
        })?;
        let to_node = self.nodes.get(&to.node).ok_or_else(|| {
            ApplyError::InvalidReference(format!("node {} does not exist", to.node))
        })?;

        let from_pin = from_node.pin(&from.pin).ok_or_else(|| {
            ApplyError::InvalidReference(format!("pin {} does not exist", from))
        })?;
        let to_pin = to_node.pin(&to.pin).ok_or_else(|| {
            ApplyError::InvalidReference(format!("pin {} does not exist", to))
        })?;

        if from_pin.direction != PinDirection::Output {
            return Err(ApplyError::InvalidReference(format!(
                "{} is not an output pin",
                from
            )));
        }
        if to_pin.direction != PinDirection::Input {
            return Err(ApplyError::InvalidReference(format!(
                "{} is not an input pin",
                to
            )));
        }

        if !from_pin.pin_type.can_feed(to_pin.pin_type) {
            return Err(ApplyError::TypeMismatch {
                from: from_pin.pin_type,
                to: to_pin.pin_type,
            });
        }

        if self
            .links
            .iter()
            .any(|l| &l.from == from && &l.to == to)
        {
            return Err(ApplyError::InvalidReference(format!(
                "link from {} to {} already exists",
                from, to
            )));
        }

        if from.node == to.node || self.reaches(to.node, from.node) {
            return Err(ApplyError::CyclicConnection);
        }

        Ok(())
    }

    /// Depth-first reachability over link direction: is `target`
    /// reachable from `start`?
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut visited = std::collections::HashSet::new();
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            for link in self.links.iter().filter(|l| l.from.node == node) {
                stack.push(link.to.node);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tentacle_types::{BatchId, PinSpec, PinType};

    fn add_node(graph: &mut Graph, seq: u64, pins: Vec<PinSpec>) -> NodeId {
        let node = NodeId::new();
        graph
            .apply(&EditOperation::single(
                OperationId::new(seq),
                graph.id(),
                OperationKind::CreateNode {
                    node,
                    title: "test".to_string(),
                    pins,
                },
            ))
            .unwrap();
        node
    }

    fn float_source(graph: &mut Graph, seq: u64) -> NodeId {
        add_node(graph, seq, vec![PinSpec::output("out", PinType::Float)])
    }

    fn float_sink(graph: &mut Graph, seq: u64) -> NodeId {
        add_node(graph, seq, vec![PinSpec::input("in", PinType::Float)])
    }

    fn connect(graph: &mut Graph, seq: u64, from: PinRef, to: PinRef) -> Result<AppliedDelta, ApplyError> {
        graph.apply(&EditOperation::single(
            OperationId::new(seq),
            graph.id(),
            OperationKind::ConnectPins { from, to },
        ))
    }

    #[test]
    fn create_and_connect() {
        let mut graph = Graph::new(GraphId::new());
        let a = float_source(&mut graph, 1);
        let b = float_sink(&mut graph, 2);

        connect(&mut graph, 3, PinRef::new(a, "out"), PinRef::new(b, "in")).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.last_applied(), OperationId::new(3));
        assert!(graph.is_dirty());
    }

    #[test]
    fn connect_missing_pin_is_invalid_reference() {
        let mut graph = Graph::new(GraphId::new());
        let a = float_source(&mut graph, 1);
        let b = float_sink(&mut graph, 2);

        let err = connect(&mut graph, 3, PinRef::new(a, "nope"), PinRef::new(b, "in"))
            .unwrap_err();
        assert!(matches!(err, ApplyError::InvalidReference(_)));
    }

    #[test]
    fn type_mismatch_rejected() {
        let mut graph = Graph::new(GraphId::new());
        let a = float_source(&mut graph, 1);
        let b = add_node(&mut graph, 2, vec![PinSpec::input("in", PinType::Bool)]);

        let err = connect(&mut graph, 3, PinRef::new(a, "out"), PinRef::new(b, "in"))
            .unwrap_err();
        assert_eq!(
            err,
            ApplyError::TypeMismatch {
                from: PinType::Float,
                to: PinType::Bool,
            }
        );
    }

    #[test]
    fn direction_misuse_rejected() {
        let mut graph = Graph::new(GraphId::new());
        let a = float_source(&mut graph, 1);
        let b = float_sink(&mut graph, 2);

        // Input used as source.
        let err = connect(&mut graph, 3, PinRef::new(b, "in"), PinRef::new(a, "out"))
            .unwrap_err();
        assert!(matches!(err, ApplyError::InvalidReference(_)));
    }

    #[test]
    fn cycle_rejected() {
        let mut graph = Graph::new(GraphId::new());
        let a = add_node(
            &mut graph,
            1,
            vec![
                PinSpec::input("in", PinType::Float),
                PinSpec::output("out", PinType::Float),
            ],
        );
        let b = add_node(
            &mut graph,
            2,
            vec![
                PinSpec::input("in", PinType::Float),
                PinSpec::output("out", PinType::Float),
            ],
        );

        connect(&mut graph, 3, PinRef::new(a, "out"), PinRef::new(b, "in")).unwrap();
        let err = connect(&mut graph, 4, PinRef::new(b, "out"), PinRef::new(a, "in"))
            .unwrap_err();
        assert_eq!(err, ApplyError::CyclicConnection);

        // Self-loops are cycles too.
        let err = connect(&mut graph, 5, PinRef::new(a, "out"), PinRef::new(a, "in"))
            .unwrap_err();
        assert_eq!(err, ApplyError::CyclicConnection);
    }

    #[test]
    fn failed_apply_leaves_graph_unchanged() {
        let mut graph = Graph::new(GraphId::new());
        let a = float_source(&mut graph, 1);
        let b = add_node(&mut graph, 2, vec![PinSpec::input("in", PinType::Bool)]);

        let before = graph.snapshot();
        let _ = connect(&mut graph, 3, PinRef::new(a, "out"), PinRef::new(b, "in"))
            .unwrap_err();
        let after = graph.snapshot();

        assert_eq!(before, after);
        assert_eq!(graph.last_applied(), OperationId::new(2));
    }

    #[test]
    fn delete_node_severs_links_and_undo_restores() {
        let mut graph = Graph::new(GraphId::new());
        let a = float_source(&mut graph, 1);
        let b = float_sink(&mut graph, 2);
        connect(&mut graph, 3, PinRef::new(a, "out"), PinRef::new(b, "in")).unwrap();

        graph
            .apply(&EditOperation::single(
                OperationId::new(4),
                graph.id(),
                OperationKind::DeleteNode { node: a },
            ))
            .unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.link_count(), 0);

        graph.undo_last().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn set_property_undo_restores_previous() {
        let mut graph = Graph::new(GraphId::new());
        let a = float_source(&mut graph, 1);

        let set = |graph: &mut Graph, seq: u64, value: serde_json::Value| {
            graph
                .apply(&EditOperation::single(
                    OperationId::new(seq),
                    graph.id(),
                    OperationKind::SetProperty {
                        node: a,
                        key: "speed".to_string(),
                        value,
                    },
                ))
                .unwrap();
        };

        set(&mut graph, 2, json!(1.0));
        set(&mut graph, 3, json!(2.0));

        graph.undo_last().unwrap();
        let snapshot = graph.snapshot();
        assert_eq!(
            snapshot.node(&a).unwrap().properties.get("speed"),
            Some(&json!(1.0))
        );

        graph.undo_last().unwrap();
        let snapshot = graph.snapshot();
        assert!(snapshot.node(&a).unwrap().properties.get("speed").is_none());
    }

    #[test]
    fn batch_rolls_back_on_member_failure() {
        let mut graph = Graph::new(GraphId::new());
        let a = float_source(&mut graph, 1);
        let before = graph.snapshot();

        let graph_id = graph.id();
        let batch = BatchId::new(1);
        let n1 = NodeId::new();
        let ops = vec![
            EditOperation::batched(
                OperationId::new(2),
                graph_id,
                batch,
                OperationKind::CreateNode {
                    node: n1,
                    title: "ok".to_string(),
                    pins: vec![PinSpec::input("in", PinType::Float)],
                },
            ),
            EditOperation::batched(
                OperationId::new(3),
                graph_id,
                batch,
                OperationKind::ConnectPins {
                    from: PinRef::new(a, "out"),
                    to: PinRef::new(n1, "in"),
                },
            ),
            // Fails: node already exists.
            EditOperation::batched(
                OperationId::new(4),
                graph_id,
                batch,
                OperationKind::CreateNode {
                    node: a,
                    title: "dup".to_string(),
                    pins: vec![],
                },
            ),
        ];

        let failure = graph.apply_batch(&ops).unwrap_err();
        assert_eq!(failure.failed, OperationId::new(4));
        assert_eq!(graph.snapshot(), before);
        assert_eq!(graph.last_applied(), OperationId::new(1));
        assert_eq!(graph.history_len(), 1);
    }

    #[test]
    fn batch_applies_atomically_on_success() {
        let mut graph = Graph::new(GraphId::new());
        let graph_id = graph.id();
        let batch = BatchId::new(1);
        let a = NodeId::new();
        let b = NodeId::new();

        let ops = vec![
            EditOperation::batched(
                OperationId::new(1),
                graph_id,
                batch,
                OperationKind::CreateNode {
                    node: a,
                    title: "src".to_string(),
                    pins: vec![PinSpec::output("out", PinType::Int)],
                },
            ),
            EditOperation::batched(
                OperationId::new(2),
                graph_id,
                batch,
                OperationKind::CreateNode {
                    node: b,
                    title: "dst".to_string(),
                    pins: vec![PinSpec::input("in", PinType::Float)],
                },
            ),
            // Int output feeding a Float input widens.
            EditOperation::batched(
                OperationId::new(3),
                graph_id,
                batch,
                OperationKind::ConnectPins {
                    from: PinRef::new(a, "out"),
                    to: PinRef::new(b, "in"),
                },
            ),
        ];

        let deltas = graph.apply_batch(&ops).unwrap();
        assert_eq!(deltas.len(), 3);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.last_applied(), OperationId::new(3));
    }

    #[test]
    fn duplicate_link_rejected() {
        let mut graph = Graph::new(GraphId::new());
        let a = float_source(&mut graph, 1);
        let b = float_sink(&mut graph, 2);

        connect(&mut graph, 3, PinRef::new(a, "out"), PinRef::new(b, "in")).unwrap();
        let err = connect(&mut graph, 4, PinRef::new(a, "out"), PinRef::new(b, "in"))
            .unwrap_err();
        assert!(matches!(err, ApplyError::InvalidReference(_)));
    }
}
