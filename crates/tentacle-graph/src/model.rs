//! Nodes and links.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tentacle_types::{NodeId, PinDirection, PinRef, PinSpec};

/// One node in a graph: a title, a pin layout and a property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    pub pins: Vec<PinSpec>,
    /// Property values set on the node. BTreeMap keeps snapshot
    /// comparisons deterministic.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl Node {
    #[must_use]
    pub fn new(id: NodeId, title: impl Into<String>, pins: Vec<PinSpec>) -> Self {
        Self {
            id,
            title: title.into(),
            pins,
            properties: BTreeMap::new(),
        }
    }

    /// Looks up a pin by name.
    #[must_use]
    pub fn pin(&self, name: &str) -> Option<&PinSpec> {
        self.pins.iter().find(|p| p.name == name)
    }

    /// Returns the node's input pins.
    pub fn inputs(&self) -> impl Iterator<Item = &PinSpec> {
        self.pins
            .iter()
            .filter(|p| p.direction == PinDirection::Input)
    }

    /// Returns the node's output pins.
    pub fn outputs(&self) -> impl Iterator<Item = &PinSpec> {
        self.pins
            .iter()
            .filter(|p| p.direction == PinDirection::Output)
    }
}

/// A directed link from an output pin to an input pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: PinRef,
    pub to: PinRef,
}

impl Link {
    #[must_use]
    pub fn new(from: PinRef, to: PinRef) -> Self {
        Self { from, to }
    }

    /// Returns `true` if either endpoint touches the given node.
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.from.node == node || self.to.node == node
    }
}
