//! Diagnostics reported back to edit originators.
//!
//! A [`Diagnostic`] is structured data, never a thrown fault: decode
//! failures, rejected operations and compile results all surface as
//! diagnostics correlated to the offending operation or frame. Once
//! emitted a diagnostic is immutable.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Returns `true` for [`Severity::Error`].
    ///
    /// A compile pass that produced any error-severity diagnostic is
    /// reported as failed.
    #[must_use]
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// One structured finding about a graph or an operation.
///
/// # Example
///
/// ```
/// use tentacle_types::{Diagnostic, NodeId, Severity};
///
/// let node = NodeId::new();
/// let diag = Diagnostic::error("required input not connected")
///     .with_node(node)
///     .with_pin("target");
///
/// assert!(diag.severity.is_error());
/// assert_eq!(diag.node, Some(node));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Node the finding points at, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
    /// Pin name on `node` the finding points at, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl Diagnostic {
    /// Creates a diagnostic with the given severity.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            node: None,
            pin: None,
        }
    }

    /// Creates an info diagnostic.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Creates a warning diagnostic.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Creates an error diagnostic.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Attaches a node reference.
    #[must_use]
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Attaches a pin name (meaningful together with a node).
    #[must_use]
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(node) = self.node {
            write!(f, " ({}", node)?;
            if let Some(pin) = &self.pin {
                write!(f, ".{}", pin)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn builders_set_fields() {
        let node = NodeId::new();
        let diag = Diagnostic::warning("loose pin").with_node(node).with_pin("a");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.node, Some(node));
        assert_eq!(diag.pin.as_deref(), Some("a"));
    }

    #[test]
    fn display_includes_location() {
        let node = NodeId::new();
        let diag = Diagnostic::error("boom").with_node(node).with_pin("out");
        let shown = format!("{}", diag);
        assert!(shown.contains("[error] boom"));
        assert!(shown.contains(".out"));
    }

    #[test]
    fn optional_fields_omitted_from_json() {
        let diag = Diagnostic::info("ok");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(!json.contains("node"));
        assert!(!json.contains("pin"));
    }
}
