//! Graphviz rendering of the project graph.

use std::fmt::{self, Display, Formatter};

use super::Graph;

/// Display wrapper writing a [`Graph`] in DOT format.
///
/// Nodes appear in declaration order labelled with their kind; edges point
/// from a node to each of its inputs in edge order.
#[derive(Debug, Clone, Copy)]
pub struct Dot<'a> {
    graph: &'a Graph,
}

impl<'a> Dot<'a> {
    pub(crate) const fn new(graph: &'a Graph) -> Self {
        Self { graph }
    }
}

impl Display for Dot<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph kiln {{")?;
        for node in self.graph.nodes() {
            writeln!(
                f,
                "  {:?} [label=\"{}\\n({})\"];",
                node.name(),
                node.name().escape_default(),
                node.kind()
            )?;
        }
        for node in self.graph.nodes() {
            for input in node.base().inputs() {
                if let Some(target) = self.graph.get(*input) {
                    writeln!(f, "  {:?} -> {:?};", node.name(), target.name())?;
                }
            }
        }
        writeln!(f, "}}")
    }
}
