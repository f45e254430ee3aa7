//! Project graph.
//!
//! The graph owns every [`ProjectNode`] in manifest declaration order and
//! resolves node inputs to [`NodeId`] edges. Construction runs in phases:
//! names are registered first so a node may reference one declared later,
//! inputs are then resolved, and finally the resolved edges are checked for
//! cycles. A graph that builds is therefore a DAG with no dangling edges, and
//! it is never mutated afterwards.
//!
//! ```rust
//! use kiln::ast::{AliasSpec, NodeSpec, SetupSpec};
//! use kiln::graph::Graph;
//!
//! let nodes = vec![
//!     NodeSpec::Alias(AliasSpec {
//!         name: "ci".into(),
//!         inputs: vec!["setup-ci".into()],
//!         ..AliasSpec::default()
//!     }),
//!     NodeSpec::Setup(SetupSpec::default()),
//! ];
//! let graph = Graph::from_nodes(&nodes, &[]).expect("graph");
//! let ci = graph.node("ci").expect("known node");
//! assert_eq!(graph.direct_matching_input_names(ci, |_| true), ["setup-ci"]);
//! ```

mod cycle;
mod dot;
mod error;
pub mod predicate;
mod traverse;

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::{KilnManifest, NodeSpec};
use crate::node::ProjectNode;

pub use dot::Dot;
pub use error::GraphError;

/// Dense index of a node within its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the node in declaration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Identity and edges shared by every node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseNode {
    id: NodeId,
    name: String,
    inputs: Vec<NodeId>,
}

impl BaseNode {
    /// Identifier of the node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Unique node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved inputs in declaration order, without repeats.
    #[must_use]
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }
}

/// Immutable project graph.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<ProjectNode>,
    index: IndexMap<String, NodeId>,
    defaults: Vec<NodeId>,
}

impl Graph {
    /// Build the graph described by a parsed manifest.
    ///
    /// # Errors
    ///
    /// See [`Graph::from_nodes`].
    pub fn from_manifest(manifest: &KilnManifest) -> Result<Self, GraphError> {
        Self::from_nodes(&manifest.nodes, &manifest.defaults)
    }

    /// Build a graph from node declarations and default target names.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] when two nodes share a name,
    /// [`GraphError::UnknownInput`] when an input names no node,
    /// [`GraphError::CircularDependency`] when inputs form a cycle and
    /// [`GraphError::UnknownDefault`] when a default names no node.
    pub fn from_nodes(specs: &[NodeSpec], defaults: &[String]) -> Result<Self, GraphError> {
        let index = register_names(specs)?;
        let edges = resolve_inputs(specs, &index)?;

        let names: Vec<&str> = specs.iter().map(NodeSpec::name).collect();
        if let Some(cycle) = cycle::find_cycle(&edges, &names) {
            return Err(GraphError::CircularDependency { cycle });
        }

        let defaults = defaults
            .iter()
            .map(|name| {
                index
                    .get(name)
                    .copied()
                    .ok_or_else(|| GraphError::UnknownDefault { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let nodes: Vec<ProjectNode> = specs
            .iter()
            .zip(edges)
            .enumerate()
            .map(|(position, (spec, inputs))| {
                let base = BaseNode {
                    id: NodeId::new(position),
                    name: spec.name().to_owned(),
                    inputs,
                };
                ProjectNode::new(base, spec.clone())
            })
            .collect();

        debug!(nodes = nodes.len(), "built project graph");
        Ok(Self {
            nodes,
            index,
            defaults,
        })
    }

    /// Every node in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ProjectNode] {
        &self.nodes
    }

    /// Node with the given identifier.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&ProjectNode> {
        self.nodes.get(id.index())
    }

    /// Look up a node by name.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] when no node has that name.
    pub fn node(&self, name: &str) -> Result<NodeId, GraphError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode {
                name: name.to_owned(),
            })
    }

    /// Nodes aggregated into the default Makefile target.
    #[must_use]
    pub fn default_targets(&self) -> &[NodeId] {
        &self.defaults
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// DOT rendering of the graph.
    #[must_use]
    pub const fn dot(&self) -> Dot<'_> {
        Dot::new(self)
    }
}

fn register_names(specs: &[NodeSpec]) -> Result<IndexMap<String, NodeId>, GraphError> {
    let mut index = IndexMap::with_capacity(specs.len());
    for (position, spec) in specs.iter().enumerate() {
        let name = spec.name();
        if index.insert(name.to_owned(), NodeId::new(position)).is_some() {
            return Err(GraphError::DuplicateNode {
                name: name.to_owned(),
            });
        }
    }
    Ok(index)
}

fn resolve_inputs(
    specs: &[NodeSpec],
    index: &IndexMap<String, NodeId>,
) -> Result<Vec<Vec<NodeId>>, GraphError> {
    specs
        .iter()
        .map(|spec| {
            let mut inputs: Vec<NodeId> = Vec::with_capacity(spec.inputs().len());
            for input in spec.inputs() {
                let id = index
                    .get(input)
                    .copied()
                    .ok_or_else(|| GraphError::UnknownInput {
                        node: spec.name().to_owned(),
                        input: input.clone(),
                    })?;
                if !inputs.contains(&id) {
                    inputs.push(id);
                }
            }
            Ok(inputs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AliasSpec, CustomSpec};
    use rstest::rstest;

    fn custom(name: &str, inputs: &[&str]) -> NodeSpec {
        NodeSpec::Custom(CustomSpec {
            name: name.into(),
            inputs: inputs.iter().map(|s| (*s).to_owned()).collect(),
            ..CustomSpec::default()
        })
    }

    #[rstest]
    fn forward_references_resolve() {
        let specs = vec![custom("b", &["a"]), custom("a", &[])];
        let graph = Graph::from_nodes(&specs, &[]).expect("graph");
        let b = graph.node("b").expect("b");
        let a = graph.node("a").expect("a");
        let node = graph.get(b).expect("node");
        assert_eq!(node.base().inputs(), [a]);
    }

    #[rstest]
    fn repeated_inputs_collapse() {
        let specs = vec![custom("a", &[]), custom("b", &["a", "a"])];
        let graph = Graph::from_nodes(&specs, &[]).expect("graph");
        let b = graph.get(graph.node("b").expect("b")).expect("node");
        assert_eq!(b.base().inputs().len(), 1);
    }

    #[rstest]
    #[case(
        vec![custom("a", &[]), custom("a", &[])],
        GraphError::DuplicateNode { name: "a".into() }
    )]
    #[case(
        vec![custom("a", &["missing"])],
        GraphError::UnknownInput { node: "a".into(), input: "missing".into() }
    )]
    #[case(
        vec![custom("c", &["b"]), custom("b", &["a"]), custom("a", &["c"])],
        GraphError::CircularDependency {
            cycle: vec!["a".into(), "c".into(), "b".into(), "a".into()],
        }
    )]
    fn invalid_graphs_are_rejected(#[case] specs: Vec<NodeSpec>, #[case] expected: GraphError) {
        let err = Graph::from_nodes(&specs, &[]).expect_err("invalid graph");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn unknown_default_is_rejected() {
        let specs = vec![NodeSpec::Alias(AliasSpec {
            name: "lint".into(),
            ..AliasSpec::default()
        })];
        let err = Graph::from_nodes(&specs, &["build".into()]).expect_err("unknown default");
        assert_eq!(err, GraphError::UnknownDefault { name: "build".into() });
    }

    #[rstest]
    fn unknown_name_lookup_fails() {
        let graph = Graph::from_nodes(&[], &[]).expect("graph");
        assert!(graph.is_empty());
        assert_eq!(
            graph.node("ghost"),
            Err(GraphError::UnknownNode { name: "ghost".into() })
        );
    }
}
