//! Error types for graph construction and name-keyed traversal.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while assembling or querying the project graph.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum GraphError {
    /// Two nodes share a name.
    #[error("node `{name}` is declared more than once")]
    #[diagnostic(
        code(kiln::graph::duplicate_node),
        help("node names double as Makefile targets and CI steps; rename one of them")
    )]
    DuplicateNode {
        /// The repeated name.
        name: String,
    },

    /// A node lists an input that names no declared node.
    #[error("node `{node}` depends on unknown node `{input}`")]
    #[diagnostic(code(kiln::graph::unknown_input))]
    UnknownInput {
        /// The node declaring the input.
        node: String,
        /// The unresolved input name.
        input: String,
    },

    /// A name-keyed query referenced a node that does not exist.
    #[error("unknown node `{name}`")]
    #[diagnostic(code(kiln::graph::unknown_node))]
    UnknownNode {
        /// The unresolved name.
        name: String,
    },

    /// A manifest default names no declared node.
    #[error("default target `{name}` does not name a declared node")]
    #[diagnostic(code(kiln::graph::unknown_default))]
    UnknownDefault {
        /// The unresolved default.
        name: String,
    },

    /// Inputs form a cycle.
    #[error("circular dependency: {}", .cycle.join(" -> "))]
    #[diagnostic(code(kiln::graph::cycle))]
    CircularDependency {
        /// Node names along the cycle, starting and ending with the same node.
        cycle: Vec<String>,
    },
}
