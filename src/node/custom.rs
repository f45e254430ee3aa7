//! Custom step node.
//!
//! A custom step spells out its Makefile target, Dockerfile stages and Drone
//! step by hand, each block switched on independently. Its Drone block may
//! also fan out into named pipelines: every pipeline replays the nearest
//! upstream base steps, restores the artifacts saved by the default pipeline
//! and then runs the step itself with the pipeline's environment overrides.

use tracing::debug;

use super::{Capability, DockerfileCompiler, DroneCompiler, MakefileCompiler};
use crate::ast::{CustomSpec, StageSpec, StageStep};
use crate::compile::{ContributionError, NodeContext};
use crate::graph::BaseNode;
use crate::graph::predicate::{enabled, has_drone_output, implements};
use crate::output::dockerfile::{self, Copy, Instruction, Script, Stage};
use crate::output::drone::{self, Resources, Step, Trigger};
use crate::output::makefile::{self, Target, Variable, VariableGroup};
use crate::project::{ArtifactStore, ProjectOptions};

/// Name of the step restoring artifacts in named pipelines.
pub const LOAD_ARTIFACTS: &str = "load-artifacts";

/// Name of the step persisting artifacts from the default pipeline.
pub const SAVE_ARTIFACTS: &str = "save-artifacts";

/// A user-declared step with hand-written backend blocks.
#[derive(Debug, Clone)]
pub struct CustomStep {
    pub(super) base: BaseNode,
    spec: CustomSpec,
}

impl CustomStep {
    pub(super) const fn new(base: BaseNode, spec: CustomSpec) -> Self {
        Self { base, spec }
    }

    /// Declared configuration.
    #[must_use]
    pub const fn spec(&self) -> &CustomSpec {
        &self.spec
    }

    fn base_drone_step(&self, project: &ProjectOptions) -> Step {
        let block = &self.spec.drone;
        let mut step = Step::make(self.base.name(), &project.ci.image);
        if block.privileged {
            step = step.privileged();
        }
        if let Some(requests) = block.requests {
            step = step.resources(Resources::new(requests.cpu_cores, requests.memory_gib));
        }
        for (name, value) in &block.environment {
            step = step.environment(name, value);
        }
        for volume in &block.volumes {
            step = step.empty_dir_volume(&volume.name, &volume.mount_path);
        }
        step
    }
}

fn store_step(name: &str, image: &str, commands: Vec<String>, store: &ArtifactStore) -> Step {
    store
        .credentials
        .iter()
        .fold(Step::custom(name, image, commands), |step, (env, secret)| {
            step.environment_from_secret(env, secret)
        })
}

fn render_commands(
    template: &'static str,
    rendered: Result<Vec<String>, minijinja::Error>,
) -> Result<Vec<String>, ContributionError> {
    rendered.map_err(|source| ContributionError::Template { template, source })
}

impl MakefileCompiler for CustomStep {
    fn makefile_enabled(&self) -> bool {
        self.spec.makefile.enabled
    }

    fn compile_makefile(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut makefile::Scope<'_>,
    ) -> Result<(), ContributionError> {
        let block = &self.spec.makefile;
        if !block.enabled {
            return Ok(());
        }

        for variable in &block.variables {
            output.variable(
                VariableGroup::Extra,
                Variable::overridable(&variable.name, &variable.default_value),
            )?;
        }

        let mut target = Target::new(self.base.name())
            .depends(ctx.direct_matching_input_names(enabled(Capability::Makefile)))
            .depends(&block.depends)
            .script(&block.script);
        if block.phony {
            target = target.phony();
        }
        output.target(target)
    }
}

impl DockerfileCompiler for CustomStep {
    fn dockerfile_enabled(&self) -> bool {
        self.spec.docker.enabled
    }

    fn compile_dockerfile(
        &self,
        _ctx: &NodeContext<'_>,
        output: &mut dockerfile::Scope<'_>,
    ) -> Result<(), ContributionError> {
        if !self.spec.docker.enabled {
            return Ok(());
        }

        for (stage_index, spec) in self.spec.docker.stages.iter().enumerate() {
            let mut stage = Stage::new(&spec.name).description(&spec.description);
            if let Some(from) = &spec.from {
                stage = stage.from(from);
            }
            for (step_index, step) in spec.steps.iter().enumerate() {
                let instruction = match step {
                    StageStep::Arg(name) => Instruction::Arg(name.clone()),
                    StageStep::Script(script) => script
                        .cache
                        .iter()
                        .fold(Script::new(&script.command), |acc, cache| {
                            acc.mount_cache(cache)
                        })
                        .into(),
                    StageStep::Copy(copy) => {
                        let mut instruction = Copy::new(&copy.src, &copy.dst);
                        if let Some(source) = &copy.from {
                            check_copy_source(
                                output,
                                self.spec.docker.stages.get(stage_index..).unwrap_or_default(),
                                source,
                                (stage_index, step_index),
                            )?;
                            instruction = instruction.from(source);
                        }
                        instruction.into()
                    }
                };
                stage = stage.step(instruction);
            }
            output.stage(stage)?;
        }
        Ok(())
    }
}

/// A copy source is an earlier stage or an image. Names of the current stage
/// and of stages this node declares after it are rejected.
fn check_copy_source(
    output: &dockerfile::Scope<'_>,
    pending: &[StageSpec],
    source: &str,
    (stage_index, step_index): (usize, usize),
) -> Result<(), ContributionError> {
    if output.has_stage(source) || !pending.iter().any(|stage| stage.name == source) {
        return Ok(());
    }
    Err(ContributionError::InvalidConfig {
        field: format!("docker.stages[{stage_index}].steps[{step_index}].copy.from"),
        reason: format!("`{source}` names a stage that is not built yet"),
    })
}

impl DroneCompiler for CustomStep {
    fn drone_enabled(&self) -> bool {
        self.spec.drone.enabled
    }

    fn compile_drone(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut drone::Scope<'_>,
    ) -> Result<(), ContributionError> {
        let block = &self.spec.drone;
        if !block.enabled {
            return Ok(());
        }
        let project = ctx.project();
        let store = &project.ci.artifact_store;

        output.step(
            self.base_drone_step(project)
                .depends_on(ctx.direct_matching_input_names(has_drone_output())),
        )?;

        for spec in &block.pipelines {
            let trigger = Trigger {
                targets: spec.triggers.clone(),
                crons: spec.crons.clone(),
            };
            let mut pipeline = output.pipeline(&spec.name, trigger)?;

            let mut base_steps = Vec::new();
            for provider in ctx.recursive_matching_inputs(implements(Capability::BaseDroneSteps)) {
                let Some(steps) = provider.as_base_drone_steps() else {
                    continue;
                };
                steps.build_base_drone_steps(
                    &ctx.for_node(provider.id()),
                    &mut pipeline.as_contributor(provider.name()),
                )?;
                base_steps.push(provider.name());
            }
            debug!(
                node = self.base.name(),
                pipeline = %spec.name,
                base_steps = base_steps.len(),
                "replayed base steps"
            );

            let load = render_commands(
                "artifact store load commands",
                store.load_commands(&project.artifacts_path),
            )?;
            pipeline.step(
                store_step(LOAD_ARTIFACTS, &project.ci.image, load, store).depends_on(base_steps),
            )?;

            let step = spec
                .environment_override
                .iter()
                .fold(self.base_drone_step(project), |step, (name, value)| {
                    step.environment(name, value)
                });
            pipeline.step(step.depends_on([LOAD_ARTIFACTS]))?;
        }

        if !block.pipelines.is_empty() {
            let save = render_commands(
                "artifact store save commands",
                store.save_commands(&project.artifacts_path),
            )?;
            output.step(
                store_step(SAVE_ARTIFACTS, &project.ci.image, save, store)
                    .depends_on([self.base.name()]),
            )?;
        }
        Ok(())
    }
}
