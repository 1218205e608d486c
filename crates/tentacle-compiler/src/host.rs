//! Host compiler boundary.
//!
//! The bridge does not know how to compile a graph; the embedding
//! host does. [`HostCompiler`] is that seam. The crate ships one
//! implementation, [`GraphChecker`], which performs structural
//! validation — enough for headless use and for exercising the full
//! pipeline without a host.

use async_trait::async_trait;
use tentacle_graph::GraphSnapshot;
use tentacle_types::{Diagnostic, ErrorCode, PinRef};
use thiserror::Error;

/// The host compiler could not run at all.
///
/// This is distinct from a compile that ran and found problems: found
/// problems are diagnostics in an `Ok` return, not errors.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The host is not ready (editor shutting down, module unloaded).
    #[error("host compiler unavailable: {0}")]
    Unavailable(String),

    /// The host failed internally.
    #[error("host compiler failed: {0}")]
    Internal(String),
}

impl ErrorCode for CompileError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "COMPILE_UNAVAILABLE",
            Self::Internal(_) => "COMPILE_INTERNAL",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Compiles one committed snapshot into diagnostics.
///
/// Implementations must tolerate cancellation: the bridge drops the
/// compile future on timeout and discards late results on supersede.
#[async_trait]
pub trait HostCompiler: Send + Sync {
    /// Runs one compile pass. Returns the full diagnostic set; the
    /// pass failed iff any diagnostic has error severity.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] only when the compiler itself could
    /// not run.
    async fn compile(&self, snapshot: &GraphSnapshot) -> Result<Vec<Diagnostic>, CompileError>;
}

/// Structural validation pass, the built-in host.
///
/// Checks, in order:
/// - the graph has nodes (warning if empty)
/// - some node can start execution: an exec output with no exec input
///   (error otherwise)
/// - every non-exec input pin is fed by a link (warning per pin)
///
/// Always ends with an info summary so a clean pass still produces
/// output.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphChecker;

#[async_trait]
impl HostCompiler for GraphChecker {
    async fn compile(&self, snapshot: &GraphSnapshot) -> Result<Vec<Diagnostic>, CompileError> {
        let mut diagnostics = Vec::new();

        if snapshot.node_count() == 0 {
            diagnostics.push(Diagnostic::warning("graph has no nodes"));
        } else if !snapshot.nodes().any(is_entry_node) {
            diagnostics.push(Diagnostic::error(
                "graph has no entry node (an exec output with no exec input)",
            ));
        }

        // Stable order for reporting; the node map does not iterate
        // deterministically.
        let mut nodes: Vec<_> = snapshot.nodes().collect();
        nodes.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        for node in nodes {
            for pin in node.inputs() {
                if pin.pin_type.is_exec() {
                    continue;
                }
                let pin_ref = PinRef::new(node.id, pin.name.clone());
                if !snapshot.has_incoming(&pin_ref) {
                    diagnostics.push(
                        Diagnostic::warning(format!(
                            "input '{}' of node '{}' is unconnected",
                            pin.name, node.title
                        ))
                        .with_node(node.id)
                        .with_pin(pin.name.clone()),
                    );
                }
            }
        }

        diagnostics.push(Diagnostic::info(format!(
            "{} nodes, {} links",
            snapshot.node_count(),
            snapshot.link_count()
        )));
        Ok(diagnostics)
    }
}

fn is_entry_node(node: &tentacle_graph::Node) -> bool {
    let has_exec_out = node.outputs().any(|p| p.pin_type.is_exec());
    let has_exec_in = node.inputs().any(|p| p.pin_type.is_exec());
    has_exec_out && !has_exec_in
}

#[cfg(test)]
mod tests {
    use super::*;
    use tentacle_graph::Graph;
    use tentacle_proto::{EditOperation, OperationKind};
    use tentacle_types::{GraphId, NodeId, OperationId, PinSpec, PinType, Severity};

    fn create(graph: &mut Graph, id: u64, node: NodeId, title: &str, pins: Vec<PinSpec>) {
        graph
            .apply(&EditOperation::single(
                OperationId::new(id),
                graph.id(),
                OperationKind::CreateNode {
                    node,
                    title: title.to_string(),
                    pins,
                },
            ))
            .unwrap();
    }

    #[tokio::test]
    async fn empty_graph_warns() {
        let graph = Graph::new(GraphId::new());
        let diags = GraphChecker.compile(&graph.snapshot()).await.unwrap();
        assert!(diags
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains("no nodes")));
        assert!(!diags.iter().any(|d| d.severity.is_error()));
    }

    #[tokio::test]
    async fn missing_entry_node_is_an_error() {
        let mut graph = Graph::new(GraphId::new());
        // Only a pass-through node: exec in and out, so not an entry.
        create(
            &mut graph,
            1,
            NodeId::new(),
            "relay",
            vec![
                PinSpec::input("exec", PinType::Exec),
                PinSpec::output("then", PinType::Exec),
            ],
        );
        let diags = GraphChecker.compile(&graph.snapshot()).await.unwrap();
        assert!(diags
            .iter()
            .any(|d| d.severity.is_error() && d.message.contains("entry")));
    }

    #[tokio::test]
    async fn unconnected_inputs_warn_with_pin_location() {
        let mut graph = Graph::new(GraphId::new());
        let node = NodeId::new();
        create(
            &mut graph,
            1,
            node,
            "start",
            vec![
                PinSpec::output("then", PinType::Exec),
                PinSpec::input("count", PinType::Int),
            ],
        );
        let diags = GraphChecker.compile(&graph.snapshot()).await.unwrap();
        let warning = diags
            .iter()
            .find(|d| d.message.contains("unconnected"))
            .expect("unconnected warning");
        assert_eq!(warning.node, Some(node));
        assert_eq!(warning.pin.as_deref(), Some("count"));
        // Warnings do not fail the pass.
        assert!(!diags.iter().any(|d| d.severity.is_error()));
    }

    #[tokio::test]
    async fn clean_graph_reports_only_the_summary() {
        let mut graph = Graph::new(GraphId::new());
        create(
            &mut graph,
            1,
            NodeId::new(),
            "start",
            vec![PinSpec::output("then", PinType::Exec)],
        );
        let diags = GraphChecker.compile(&graph.snapshot()).await.unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Info);
    }
}
