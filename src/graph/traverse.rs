//! Predicate-filtered traversal over node inputs.
//!
//! Direct queries filter a node's own inputs. The recursive query walks the
//! transitive input closure depth first and stops at the nearest match on
//! every path: a matching node is reported and its inputs are not explored.
//! Results keep edge declaration order and never repeat a node.

use std::collections::HashSet;

use super::{Graph, GraphError, NodeId};
use crate::node::ProjectNode;

impl Graph {
    fn inputs_of(&self, id: NodeId) -> impl Iterator<Item = &ProjectNode> {
        self.get(id)
            .map(|node| node.base().inputs())
            .unwrap_or_default()
            .iter()
            .filter_map(|input| self.get(*input))
    }

    /// Direct inputs of `id` accepted by `predicate`, in edge order.
    pub fn direct_matching_inputs<P>(&self, id: NodeId, predicate: P) -> Vec<&ProjectNode>
    where
        P: Fn(&ProjectNode) -> bool,
    {
        self.inputs_of(id).filter(|node| predicate(node)).collect()
    }

    /// Names of the direct inputs of `id` accepted by `predicate`.
    pub fn direct_matching_input_names<P>(&self, id: NodeId, predicate: P) -> Vec<&str>
    where
        P: Fn(&ProjectNode) -> bool,
    {
        self.inputs_of(id)
            .filter(|node| predicate(node))
            .map(ProjectNode::name)
            .collect()
    }

    /// Nearest matching ancestors of `id` on every input path.
    ///
    /// A node reachable along several paths is reported once, at its first
    /// visit. A match found on one path does not hide another match reached
    /// along a path that bypasses it.
    pub fn recursive_matching_inputs<P>(&self, id: NodeId, predicate: P) -> Vec<&ProjectNode>
    where
        P: Fn(&ProjectNode) -> bool,
    {
        let mut found = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::from([id]);
        let mut stack: Vec<&ProjectNode> = self.inputs_of(id).collect();
        stack.reverse();

        while let Some(node) = stack.pop() {
            if !visited.insert(node.id()) {
                continue;
            }
            if predicate(node) {
                found.push(node);
                continue;
            }
            let pending = stack.len();
            stack.extend(self.inputs_of(node.id()));
            if let Some(fresh) = stack.get_mut(pending..) {
                fresh.reverse();
            }
        }
        found
    }

    /// [`Graph::direct_matching_inputs`] for the node called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] when no node has that name.
    pub fn direct_matching_inputs_of<P>(
        &self,
        name: &str,
        predicate: P,
    ) -> Result<Vec<&ProjectNode>, GraphError>
    where
        P: Fn(&ProjectNode) -> bool,
    {
        Ok(self.direct_matching_inputs(self.node(name)?, predicate))
    }

    /// [`Graph::direct_matching_input_names`] for the node called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] when no node has that name.
    pub fn direct_matching_input_names_of<P>(
        &self,
        name: &str,
        predicate: P,
    ) -> Result<Vec<&str>, GraphError>
    where
        P: Fn(&ProjectNode) -> bool,
    {
        Ok(self.direct_matching_input_names(self.node(name)?, predicate))
    }

    /// [`Graph::recursive_matching_inputs`] for the node called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] when no node has that name.
    pub fn recursive_matching_inputs_of<P>(
        &self,
        name: &str,
        predicate: P,
    ) -> Result<Vec<&ProjectNode>, GraphError>
    where
        P: Fn(&ProjectNode) -> bool,
    {
        Ok(self.recursive_matching_inputs(self.node(name)?, predicate))
    }
}
