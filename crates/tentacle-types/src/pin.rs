//! Pin vocabulary for visual-scripting graphs.
//!
//! A node exposes named pins; links connect an output pin of one node
//! to an input pin of another. These types are shared between the wire
//! protocol (node creation arguments, link references) and the graph
//! model itself.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a pin relative to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDirection {
    /// Data or execution flows into the node.
    Input,
    /// Data or execution flows out of the node.
    Output,
}

/// Value category carried by a pin.
///
/// Links are only valid between pins of compatible types; the mutation
/// engine rejects a connection whose endpoint types differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinType {
    /// Execution flow (no value).
    Exec,
    Bool,
    Int,
    Float,
    String,
    Vector,
    /// Opaque object reference.
    Object,
}

impl PinType {
    /// Returns `true` if a link from a pin of this type may feed a pin
    /// of type `other`.
    ///
    /// Types must match exactly, with one widening exception: an `Int`
    /// output may feed a `Float` input.
    #[must_use]
    pub fn can_feed(self, other: PinType) -> bool {
        self == other || (self == PinType::Int && other == PinType::Float)
    }

    /// Returns `true` for execution-flow pins.
    #[must_use]
    pub fn is_exec(self) -> bool {
        self == PinType::Exec
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PinType::Exec => "exec",
            PinType::Bool => "bool",
            PinType::Int => "int",
            PinType::Float => "float",
            PinType::String => "string",
            PinType::Vector => "vector",
            PinType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Declaration of a pin, carried by node-creation operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSpec {
    /// Pin name, unique within one node.
    pub name: String,
    pub direction: PinDirection,
    #[serde(rename = "type")]
    pub pin_type: PinType,
}

impl PinSpec {
    /// Declares an input pin.
    #[must_use]
    pub fn input(name: impl Into<String>, pin_type: PinType) -> Self {
        Self {
            name: name.into(),
            direction: PinDirection::Input,
            pin_type,
        }
    }

    /// Declares an output pin.
    #[must_use]
    pub fn output(name: impl Into<String>, pin_type: PinType) -> Self {
        Self {
            name: name.into(),
            direction: PinDirection::Output,
            pin_type,
        }
    }
}

/// Reference to a pin on a specific node.
///
/// Used by link operations and by diagnostics pointing at a pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef {
    pub node: NodeId,
    pub pin: String,
}

impl PinRef {
    #[must_use]
    pub fn new(node: NodeId, pin: impl Into<String>) -> Self {
        Self {
            node,
            pin: pin.into(),
        }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_types_feed_each_other() {
        assert!(PinType::Bool.can_feed(PinType::Bool));
        assert!(PinType::Exec.can_feed(PinType::Exec));
        assert!(!PinType::Bool.can_feed(PinType::Int));
        assert!(!PinType::String.can_feed(PinType::Object));
    }

    #[test]
    fn int_widens_to_float() {
        assert!(PinType::Int.can_feed(PinType::Float));
        assert!(!PinType::Float.can_feed(PinType::Int));
    }

    #[test]
    fn pin_spec_constructors() {
        let spec = PinSpec::input("value", PinType::Float);
        assert_eq!(spec.direction, PinDirection::Input);
        let spec = PinSpec::output("then", PinType::Exec);
        assert_eq!(spec.direction, PinDirection::Output);
        assert!(spec.pin_type.is_exec());
    }
}
