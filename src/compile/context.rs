//! Read-only view handed to each contribution.

use crate::graph::{Graph, NodeId};
use crate::node::ProjectNode;
use crate::project::ProjectOptions;

/// What a node may see while contributing: the graph, the project options
/// and its own identity.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    graph: &'a Graph,
    project: &'a ProjectOptions,
    id: NodeId,
}

impl<'a> NodeContext<'a> {
    /// Context for node `id`.
    #[must_use]
    pub const fn new(graph: &'a Graph, project: &'a ProjectOptions, id: NodeId) -> Self {
        Self { graph, project, id }
    }

    /// The same view for another node.
    #[must_use]
    pub const fn for_node(&self, id: NodeId) -> Self {
        Self { id, ..*self }
    }

    /// The project graph.
    #[must_use]
    pub const fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// Project-wide options.
    #[must_use]
    pub const fn project(&self) -> &'a ProjectOptions {
        self.project
    }

    /// Identifier of the contributing node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Direct inputs accepted by `predicate`.
    pub fn direct_matching_inputs<P>(&self, predicate: P) -> Vec<&'a ProjectNode>
    where
        P: Fn(&ProjectNode) -> bool,
    {
        self.graph.direct_matching_inputs(self.id, predicate)
    }

    /// Names of the direct inputs accepted by `predicate`.
    pub fn direct_matching_input_names<P>(&self, predicate: P) -> Vec<&'a str>
    where
        P: Fn(&ProjectNode) -> bool,
    {
        self.graph.direct_matching_input_names(self.id, predicate)
    }

    /// Nearest ancestors accepted by `predicate` on every input path.
    pub fn recursive_matching_inputs<P>(&self, predicate: P) -> Vec<&'a ProjectNode>
    where
        P: Fn(&ProjectNode) -> bool,
    {
        self.graph.recursive_matching_inputs(self.id, predicate)
    }
}
