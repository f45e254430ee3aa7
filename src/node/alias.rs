//! Makefile aggregate target.

use super::{Capability, MakefileCompiler};
use crate::ast::AliasSpec;
use crate::compile::{ContributionError, NodeContext};
use crate::graph::BaseNode;
use crate::graph::predicate::enabled;
use crate::output::makefile::{self, Target};

/// A target whose prerequisites are its Makefile-enabled inputs.
#[derive(Debug, Clone)]
pub struct Alias {
    pub(super) base: BaseNode,
    spec: AliasSpec,
}

impl Alias {
    pub(super) const fn new(base: BaseNode, spec: AliasSpec) -> Self {
        Self { base, spec }
    }

    /// Declared configuration.
    #[must_use]
    pub const fn spec(&self) -> &AliasSpec {
        &self.spec
    }
}

impl MakefileCompiler for Alias {
    fn compile_makefile(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut makefile::Scope<'_>,
    ) -> Result<(), ContributionError> {
        let mut target = Target::new(self.base.name())
            .depends(ctx.direct_matching_input_names(enabled(Capability::Makefile)))
            .script(&self.spec.script);
        if self.spec.phony {
            target = target.phony();
        }
        output.target(target)
    }
}
