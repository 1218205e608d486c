//! Invertible mutation deltas.

use crate::model::{Link, Node};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tentacle_types::NodeId;

/// The recorded effect of one successful mutation.
///
/// Every delta carries enough information to undo itself: deleted
/// nodes keep their severed links, property writes keep the previous
/// value. Deltas are appended to the graph's history and reported to
/// the host on commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppliedDelta {
    NodeCreated {
        node: Node,
    },
    NodeDeleted {
        node: Node,
        /// Links severed by the deletion, in their original order.
        severed: Vec<Link>,
    },
    LinkAdded {
        link: Link,
    },
    LinkRemoved {
        link: Link,
    },
    PropertySet {
        node: NodeId,
        key: String,
        /// Previous value, `None` if the key was unset.
        previous: Option<Value>,
        value: Value,
    },
}

impl AppliedDelta {
    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NodeCreated { .. } => "node_created",
            Self::NodeDeleted { .. } => "node_deleted",
            Self::LinkAdded { .. } => "link_added",
            Self::LinkRemoved { .. } => "link_removed",
            Self::PropertySet { .. } => "property_set",
        }
    }
}
