//! Backend contracts implemented by node kinds.
//!
//! Every contract has a single contribution method receiving the node's
//! [`NodeContext`] and a contributor-scoped view of the backend builder. The
//! view lives for one call only, so a node cannot hold on to the builder.

use crate::compile::{ContributionError, NodeContext};
use crate::output::{conform, dockerfile, drone, makefile};

/// Contributes Makefile targets and variables.
pub trait MakefileCompiler {
    /// Whether the node's own configuration switches the Makefile on.
    fn makefile_enabled(&self) -> bool {
        true
    }

    /// Add the node's Makefile entries.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the builder
    /// rejects an entry.
    fn compile_makefile(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut makefile::Scope<'_>,
    ) -> Result<(), ContributionError>;
}

/// Contributes Dockerfile stages.
pub trait DockerfileCompiler {
    /// Whether the node's own configuration switches the Dockerfile on.
    fn dockerfile_enabled(&self) -> bool {
        true
    }

    /// Add the node's Dockerfile stages.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the builder
    /// rejects a stage.
    fn compile_dockerfile(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut dockerfile::Scope<'_>,
    ) -> Result<(), ContributionError>;
}

/// Contributes Drone steps and pipelines.
pub trait DroneCompiler {
    /// Whether the node's own configuration switches Drone on.
    fn drone_enabled(&self) -> bool {
        true
    }

    /// Add the node's Drone steps.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid, a graph query
    /// fails or the builder rejects a step.
    fn compile_drone(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut drone::Scope<'_>,
    ) -> Result<(), ContributionError>;
}

/// Replays the steps a named pipeline needs before loading artifacts.
pub trait BaseDroneSteps {
    /// Add the base steps to `pipeline`, skipping ones already present.
    ///
    /// # Errors
    ///
    /// Returns an error when the builder rejects a step.
    fn build_base_drone_steps(
        &self,
        ctx: &NodeContext<'_>,
        pipeline: &mut drone::PipelineScope<'_>,
    ) -> Result<(), ContributionError>;
}

/// Contributes the conformance policy.
pub trait ConformCompiler {
    /// Add the node's policy.
    ///
    /// # Errors
    ///
    /// Returns an error when a policy already exists or rendering fails.
    fn compile_conform(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut conform::Scope<'_>,
    ) -> Result<(), ContributionError>;
}
