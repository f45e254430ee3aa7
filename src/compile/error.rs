//! Error types raised while compiling backends.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use thiserror::Error;

use super::Backend;
use crate::graph::GraphError;

/// Failure of a single node contribution or of an output builder accepting it.
#[derive(Debug, Error, Diagnostic)]
pub enum ContributionError {
    /// Node configuration is malformed or contradictory.
    #[error("invalid `{field}`: {reason}")]
    #[diagnostic(code(kiln::compile::invalid_config))]
    InvalidConfig {
        /// Path of the offending field within the node declaration.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two contributors produced the same identity.
    #[error("{kind} `{name}` is declared by both `{first}` and `{second}`")]
    #[diagnostic(
        code(kiln::compile::collision),
        help("rename one of the contributions or drop one of the nodes")
    )]
    Collision {
        /// What collided, e.g. `target` or `step`.
        kind: &'static str,
        /// Colliding name.
        name: String,
        /// Contributor that declared the name first.
        first: String,
        /// Contributor that declared it again.
        second: String,
    },

    /// Two contributors assigned different values to one variable.
    #[error(
        "variable `{name}` is `{first_value}` in `{first}` but `{second_value}` in `{second}`"
    )]
    #[diagnostic(code(kiln::compile::variable_conflict))]
    VariableConflict {
        /// Variable name.
        name: String,
        /// Contributor of the first declaration.
        first: String,
        /// Value of the first declaration.
        first_value: String,
        /// Contributor of the conflicting declaration.
        second: String,
        /// Value of the conflicting declaration.
        second_value: String,
    },

    /// A named pipeline was declared again with different triggers.
    #[error("pipeline `{name}` is declared with different triggers by `{first}` and `{second}`")]
    #[diagnostic(code(kiln::compile::pipeline_mismatch))]
    PipelineMismatch {
        /// Pipeline name.
        name: String,
        /// Contributor of the first declaration.
        first: String,
        /// Contributor of the conflicting declaration.
        second: String,
    },

    /// A contribution used a name the builder keeps for itself.
    #[error("{kind} name `{name}` is reserved")]
    #[diagnostic(code(kiln::compile::reserved_name))]
    ReservedName {
        /// What was named, e.g. `pipeline`.
        kind: &'static str,
        /// The reserved name.
        name: String,
    },

    /// A graph query made by the contribution failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    /// A command or policy template failed to render.
    #[error("failed to render {template}")]
    #[diagnostic(code(kiln::compile::template))]
    Template {
        /// Which template failed.
        template: &'static str,
        /// Underlying template error.
        #[source]
        source: minijinja::Error,
    },
}

/// A backend pass aborted by one contribution.
#[derive(Debug, Error, Diagnostic)]
#[error("{backend} compilation failed at node `{node}`")]
#[diagnostic(code(kiln::compile::failed))]
pub struct CompileError {
    /// Backend whose pass failed.
    pub backend: Backend,
    /// Contributor that failed.
    pub node: String,
    /// Why it failed.
    #[source]
    #[diagnostic_source]
    pub source: ContributionError,
}
