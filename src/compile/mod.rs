//! Per-backend compilation passes.
//!
//! A pass creates one output builder, walks the graph in declaration order
//! and hands every node that implements and enables the backend a scoped
//! view of that builder. The first failing contribution aborts the pass;
//! other passes are unaffected.
//!
//! ```rust
//! use kiln::ast::{CustomSpec, MakefileBlock, NodeSpec};
//! use kiln::compile::Compiler;
//! use kiln::graph::Graph;
//! use kiln::project::ProjectOptions;
//!
//! let nodes = vec![NodeSpec::Custom(CustomSpec {
//!     name: "fmt".into(),
//!     makefile: MakefileBlock {
//!         enabled: true,
//!         script: vec!["cargo fmt".into()],
//!         ..MakefileBlock::default()
//!     },
//!     ..CustomSpec::default()
//! })];
//! let graph = Graph::from_nodes(&nodes, &[]).expect("graph");
//! let project = ProjectOptions::default();
//! let makefile = Compiler::new(&graph, &project).makefile().expect("makefile");
//! assert!(makefile.to_string().contains("fmt:\n\tcargo fmt\n"));
//! ```

mod context;
mod error;

use std::fmt;

use clap::ValueEnum;
use tracing::{debug, info};

use crate::graph::Graph;
use crate::node::{Capability, ProjectNode};
use crate::output::makefile::{Variable, VariableGroup};
use crate::output::{conform, dockerfile, drone, makefile};
use crate::project::ProjectOptions;

pub use context::NodeContext;
pub use error::{CompileError, ContributionError};

/// Contributor name used for entries seeded from project options.
pub const PROJECT_CONTRIBUTOR: &str = "project";

/// An output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Backend {
    /// `Makefile`.
    Makefile,
    /// `Dockerfile`.
    Dockerfile,
    /// `.drone.yml`.
    Drone,
    /// `.conform.yaml`.
    Conform,
}

impl Backend {
    /// Every backend in compilation order.
    pub const ALL: [Self; 4] = [Self::Makefile, Self::Dockerfile, Self::Drone, Self::Conform];

    /// Conventional file name of the artifact.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Makefile => "Makefile",
            Self::Dockerfile => "Dockerfile",
            Self::Drone => ".drone.yml",
            Self::Conform => ".conform.yaml",
        }
    }

    /// Capability a node needs to take part in this backend.
    #[must_use]
    pub const fn capability(self) -> Capability {
        match self {
            Self::Makefile => Capability::Makefile,
            Self::Dockerfile => Capability::Dockerfile,
            Self::Drone => Capability::Drone,
            Self::Conform => Capability::Conform,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Makefile => "makefile",
            Self::Dockerfile => "dockerfile",
            Self::Drone => "drone",
            Self::Conform => "conform",
        })
    }
}

/// A rendered backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Backend that produced the text.
    pub backend: Backend,
    /// Rendered file contents.
    pub contents: String,
    /// Whether no node contributed anything.
    pub empty: bool,
}

/// Runs backend passes over one graph.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    graph: &'a Graph,
    project: &'a ProjectOptions,
}

impl<'a> Compiler<'a> {
    /// Compiler for `graph` under `project` options.
    #[must_use]
    pub const fn new(graph: &'a Graph, project: &'a ProjectOptions) -> Self {
        Self { graph, project }
    }

    /// Run the Makefile pass.
    ///
    /// # Errors
    ///
    /// Returns the first failing contribution.
    pub fn makefile(&self) -> Result<makefile::Output, CompileError> {
        let project_error = |source| CompileError {
            backend: Backend::Makefile,
            node: PROJECT_CONTRIBUTOR.to_owned(),
            source,
        };
        let mut output = makefile::Output::new();
        self.seed_makefile(&mut output).map_err(project_error)?;
        self.run_pass(Backend::Makefile, &mut output, |node, ctx, out| {
            node.as_makefile()
                .map(|c| c.compile_makefile(ctx, &mut out.scope(node.name())))
        })?;
        self.set_makefile_defaults(&mut output).map_err(project_error)?;
        Ok(output)
    }

    /// Run the Dockerfile pass.
    ///
    /// # Errors
    ///
    /// Returns the first failing contribution.
    pub fn dockerfile(&self) -> Result<dockerfile::Output, CompileError> {
        let mut output = dockerfile::Output::new(self.project.dockerfile.syntax.clone());
        self.run_pass(Backend::Dockerfile, &mut output, |node, ctx, out| {
            node.as_dockerfile()
                .map(|c| c.compile_dockerfile(ctx, &mut out.scope(node.name())))
        })?;
        Ok(output)
    }

    /// Run the Drone pass.
    ///
    /// # Errors
    ///
    /// Returns the first failing contribution.
    pub fn drone(&self) -> Result<drone::Output, CompileError> {
        let mut output = drone::Output::new(self.project.ci.pipeline_type.clone());
        self.run_pass(Backend::Drone, &mut output, |node, ctx, out| {
            node.as_drone()
                .map(|c| c.compile_drone(ctx, &mut out.scope(node.name())))
        })?;
        Ok(output)
    }

    /// Run the conformance policy pass.
    ///
    /// # Errors
    ///
    /// Returns the first failing contribution.
    pub fn conform(&self) -> Result<conform::Output, CompileError> {
        let mut output = conform::Output::new();
        self.run_pass(Backend::Conform, &mut output, |node, ctx, out| {
            node.as_conform()
                .map(|c| c.compile_conform(ctx, &mut out.scope(node.name())))
        })?;
        Ok(output)
    }

    /// Run one backend pass and render the result.
    ///
    /// # Errors
    ///
    /// Returns the first failing contribution.
    pub fn compile(&self, backend: Backend) -> Result<Artifact, CompileError> {
        let (contents, empty) = match backend {
            Backend::Makefile => self.makefile().map(|o| (o.to_string(), o.is_empty()))?,
            Backend::Dockerfile => self.dockerfile().map(|o| (o.to_string(), o.is_empty()))?,
            Backend::Drone => self.drone().map(|o| (o.to_string(), o.is_empty()))?,
            Backend::Conform => self.conform().map(|o| (o.to_string(), o.is_empty()))?,
        };
        Ok(Artifact {
            backend,
            contents,
            empty,
        })
    }

    /// Run every backend pass independently.
    #[must_use]
    pub fn compile_all(&self) -> Vec<Result<Artifact, CompileError>> {
        Backend::ALL
            .into_iter()
            .map(|backend| self.compile(backend))
            .collect()
    }

    fn seed_makefile(&self, output: &mut makefile::Output) -> Result<(), ContributionError> {
        let mut scope = output.scope(PROJECT_CONTRIBUTOR);
        scope.variable(
            VariableGroup::Common,
            Variable::simple("ARTIFACTS", &self.project.artifacts_path),
        )?;
        scope.variable(
            VariableGroup::Common,
            Variable::overridable("TAG", &self.project.makefile.tag),
        )?;
        Ok(())
    }

    /// Point `all` at the manifest defaults, each of which must have produced
    /// a Makefile target.
    fn set_makefile_defaults(
        &self,
        output: &mut makefile::Output,
    ) -> Result<(), ContributionError> {
        let names: Vec<&str> = self
            .graph
            .default_targets()
            .iter()
            .filter_map(|id| self.graph.get(*id))
            .map(ProjectNode::name)
            .collect();
        if let Some((index, name)) = names
            .iter()
            .enumerate()
            .find(|(_, name)| !output.has_target(name))
        {
            return Err(ContributionError::InvalidConfig {
                field: format!("defaults[{index}]"),
                reason: format!("`{name}` contributes no Makefile target"),
            });
        }
        output.set_defaults(names);
        Ok(())
    }

    fn run_pass<O, F>(
        &self,
        backend: Backend,
        output: &mut O,
        mut contribute: F,
    ) -> Result<(), CompileError>
    where
        F: FnMut(&ProjectNode, &NodeContext<'a>, &mut O) -> Option<Result<(), ContributionError>>,
    {
        let capability = backend.capability();
        let mut contributors = 0_usize;
        for node in self.graph.nodes() {
            if !node.implements(capability) {
                continue;
            }
            if !node.is_enabled(capability) {
                debug!(%backend, node = node.name(), "backend disabled for node");
                continue;
            }
            let ctx = NodeContext::new(self.graph, self.project, node.id());
            let Some(result) = contribute(node, &ctx, output) else {
                continue;
            };
            result.map_err(|source| CompileError {
                backend,
                node: node.name().to_owned(),
                source,
            })?;
            contributors += 1;
            debug!(%backend, node = node.name(), "node contributed");
        }
        info!(%backend, contributors, "backend compiled");
        Ok(())
    }
}
