//! CI setup node.
//!
//! Prepares the CI environment. It runs in the default pipeline like any
//! Drone step and is also the base step named pipelines replay before they
//! restore artifacts.

use super::{BaseDroneSteps, DroneCompiler};
use crate::ast::SetupSpec;
use crate::compile::{ContributionError, NodeContext};
use crate::graph::BaseNode;
use crate::graph::predicate::has_drone_output;
use crate::output::drone::{self, Step};

const DEFAULT_COMMANDS: [&str; 5] = [
    "sleep 5",
    "git fetch --tags",
    "install-ci-key",
    "docker buildx create --driver docker-container --platform linux/amd64 --name local --use",
    "docker buildx inspect --bootstrap",
];

/// CI environment preparation step.
#[derive(Debug, Clone)]
pub struct SetupStep {
    pub(super) base: BaseNode,
    spec: SetupSpec,
}

impl SetupStep {
    pub(super) const fn new(base: BaseNode, spec: SetupSpec) -> Self {
        Self { base, spec }
    }

    /// Declared configuration.
    #[must_use]
    pub const fn spec(&self) -> &SetupSpec {
        &self.spec
    }

    fn step(&self, ctx: &NodeContext<'_>) -> Step {
        let image = self.spec.image.as_deref().unwrap_or(&ctx.project().ci.image);
        let commands: Vec<String> = if self.spec.commands.is_empty() {
            DEFAULT_COMMANDS.into_iter().map(str::to_owned).collect()
        } else {
            self.spec.commands.clone()
        };
        let mut step = Step::custom(self.base.name(), image, commands);
        if self.spec.privileged {
            step = step.privileged();
        }
        self.spec
            .environment
            .iter()
            .fold(step, |acc, (name, value)| acc.environment(name, value))
    }
}

impl DroneCompiler for SetupStep {
    fn compile_drone(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut drone::Scope<'_>,
    ) -> Result<(), ContributionError> {
        output.step(
            self.step(ctx)
                .depends_on(ctx.direct_matching_input_names(has_drone_output())),
        )
    }
}

impl BaseDroneSteps for SetupStep {
    fn build_base_drone_steps(
        &self,
        ctx: &NodeContext<'_>,
        pipeline: &mut drone::PipelineScope<'_>,
    ) -> Result<(), ContributionError> {
        if pipeline.has_step(self.base.name()) {
            return Ok(());
        }
        let depends: Vec<&str> = ctx
            .direct_matching_input_names(has_drone_output())
            .into_iter()
            .filter(|name| pipeline.has_step(name))
            .collect();
        pipeline.step(self.step(ctx).depends_on(depends))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::output::drone::{Output, Trigger};
    use crate::project::ProjectOptions;
    use rstest::rstest;

    #[rstest]
    fn base_steps_are_added_once() {
        let specs = vec![crate::ast::NodeSpec::Setup(SetupSpec {
            commands: vec!["make tools".into()],
            ..SetupSpec::default()
        })];
        let graph = Graph::from_nodes(&specs, &[]).expect("graph");
        let project = ProjectOptions::default();
        let node = graph.nodes().first().expect("setup node");
        let setup = node.as_base_drone_steps().expect("base steps");
        let ctx = NodeContext::new(&graph, &project, node.id());

        let mut output = Output::new("kubernetes");
        let mut scope = output.scope("consumer");
        let mut pipeline = scope
            .pipeline("nightly", Trigger::default())
            .expect("pipeline");
        for _ in 0..2 {
            setup
                .build_base_drone_steps(&ctx, &mut pipeline)
                .expect("idempotent base step");
        }
        let nightly = output.pipeline("nightly").expect("nightly");
        let step = nightly.step("setup-ci").expect("setup step");
        assert_eq!(nightly.steps().count(), 1);
        assert_eq!(step.commands(), ["make tools"]);
    }

    #[rstest]
    fn default_commands_bootstrap_buildx() {
        let specs = vec![crate::ast::NodeSpec::Setup(SetupSpec::default())];
        let graph = Graph::from_nodes(&specs, &[]).expect("graph");
        let project = ProjectOptions::default();
        let output = crate::compile::Compiler::new(&graph, &project)
            .drone()
            .expect("drone");
        let step = output
            .default_pipeline()
            .step("setup-ci")
            .expect("setup step");
        assert_eq!(step.commands().len(), DEFAULT_COMMANDS.len());
        assert!(output.to_string().contains("    image: autonomy/build-container:latest\n"));
    }
}
