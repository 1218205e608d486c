//! Exclusive owner of all live graphs.

use crate::graph::Graph;
use crate::snapshot::GraphSnapshot;
use std::collections::HashMap;
use tentacle_types::GraphId;
use tracing::debug;

/// Owns every mutable graph.
///
/// The store lives inside the scheduler task; no reference to a
/// contained [`Graph`] ever escapes that execution context. External
/// components address graphs by id and read them through snapshots.
#[derive(Debug, Default)]
pub struct GraphStore {
    graphs: HashMap<GraphId, Graph>,
}

impl GraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an empty graph. Returns `false` if the id is taken.
    pub fn create(&mut self, id: GraphId) -> bool {
        if self.graphs.contains_key(&id) {
            return false;
        }
        debug!(graph = %id, "graph created");
        self.graphs.insert(id, Graph::new(id));
        true
    }

    /// Removes a graph. Returns `false` if it did not exist.
    pub fn destroy(&mut self, id: &GraphId) -> bool {
        let existed = self.graphs.remove(id).is_some();
        if existed {
            debug!(graph = %id, "graph destroyed");
        }
        existed
    }

    #[must_use]
    pub fn contains(&self, id: &GraphId) -> bool {
        self.graphs.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &GraphId) -> Option<&Graph> {
        self.graphs.get(id)
    }

    pub fn get_mut(&mut self, id: &GraphId) -> Option<&mut Graph> {
        self.graphs.get_mut(id)
    }

    /// Snapshot of one graph, if it exists.
    #[must_use]
    pub fn snapshot(&self, id: &GraphId) -> Option<GraphSnapshot> {
        self.graphs.get(id).map(Graph::snapshot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}
