//! Committed, immutable graph snapshots.
//!
//! Read-side consumers (the compile bridge, the editor UI) never see
//! live graph state. They receive a [`GraphSnapshot`]: a copy of the
//! committed nodes and links behind an `Arc`, cheap to clone and safe
//! to hold on any task. This is what removes the need for locks on
//! graph internals — at the cost of copy-on-read.

use crate::model::{Link, Node};
use std::collections::HashMap;
use std::sync::Arc;
use tentacle_types::{GraphId, NodeId, OperationId, PinRef};

#[derive(Debug, PartialEq)]
struct SnapshotData {
    id: GraphId,
    nodes: HashMap<NodeId, Node>,
    links: Vec<Link>,
    last_applied: OperationId,
}

/// An immutable view of a graph at one committed operation id.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSnapshot {
    data: Arc<SnapshotData>,
}

impl GraphSnapshot {
    pub(crate) fn capture(
        id: GraphId,
        nodes: &HashMap<NodeId, Node>,
        links: &[Link],
        last_applied: OperationId,
    ) -> Self {
        Self {
            data: Arc::new(SnapshotData {
                id,
                nodes: nodes.clone(),
                links: links.to_vec(),
                last_applied,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> GraphId {
        self.data.id
    }

    /// Operation id this snapshot was committed at.
    #[must_use]
    pub fn last_applied(&self) -> OperationId {
        self.data.last_applied
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.data.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.data.nodes.values()
    }

    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.data.links
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.data.nodes.len()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.data.links.len()
    }

    /// Returns `true` if some link feeds the given input pin.
    #[must_use]
    pub fn has_incoming(&self, pin: &PinRef) -> bool {
        self.data.links.iter().any(|l| &l.to == pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Graph;
    use tentacle_proto::{EditOperation, OperationKind};
    use tentacle_types::{PinSpec, PinType};

    #[test]
    fn snapshot_is_detached_from_later_mutation() {
        let mut graph = Graph::new(GraphId::new());
        let node = NodeId::new();
        graph
            .apply(&EditOperation::single(
                OperationId::new(1),
                graph.id(),
                OperationKind::CreateNode {
                    node,
                    title: "a".to_string(),
                    pins: vec![PinSpec::output("out", PinType::Exec)],
                },
            ))
            .unwrap();

        let snapshot = graph.snapshot();
        assert_eq!(snapshot.node_count(), 1);
        assert_eq!(snapshot.last_applied(), OperationId::new(1));

        graph
            .apply(&EditOperation::single(
                OperationId::new(2),
                graph.id(),
                OperationKind::DeleteNode { node },
            ))
            .unwrap();

        // The snapshot still sees the node.
        assert_eq!(snapshot.node_count(), 1);
        assert!(snapshot.node(&node).is_some());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn clones_share_data() {
        let graph = Graph::new(GraphId::new());
        let a = graph.snapshot();
        let b = a.clone();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.data, &b.data));
    }
}
