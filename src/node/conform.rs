//! Conformance policy node.

use super::ConformCompiler;
use crate::ast::ConformSpec;
use crate::compile::{ContributionError, NodeContext};
use crate::graph::BaseNode;
use crate::output::conform::{self, Policy};

/// Commit and license policy.
#[derive(Debug, Clone)]
pub struct Conform {
    pub(super) base: BaseNode,
    spec: ConformSpec,
}

impl Conform {
    pub(super) const fn new(base: BaseNode, spec: ConformSpec) -> Self {
        Self { base, spec }
    }

    /// Declared configuration.
    #[must_use]
    pub const fn spec(&self) -> &ConformSpec {
        &self.spec
    }
}

impl ConformCompiler for Conform {
    fn compile_conform(
        &self,
        _ctx: &NodeContext<'_>,
        output: &mut conform::Scope<'_>,
    ) -> Result<(), ContributionError> {
        output.policy(&Policy {
            types: self.spec.types.clone(),
            scopes: self.spec.scopes.clone(),
            license_header: self.spec.license_header.clone(),
            skip_paths: self.spec.skip_paths.clone(),
            include_suffixes: self.spec.include_suffixes.clone(),
            exclude_suffixes: self.spec.exclude_suffixes.clone(),
        })
    }
}
