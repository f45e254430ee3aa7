//! Project node kinds and their backend capabilities.
//!
//! Node kinds form a closed set. Which backends a kind can contribute to is
//! fixed by [`NodeKind::capabilities`]; whether a node actually contributes
//! is decided by its own configuration. Capability access goes through the
//! `as_*` try-casts, which return `None` for unsupported capabilities rather
//! than failing.

mod alias;
mod capability;
mod conform;
mod custom;
mod release;
mod setup;

use std::fmt;

use crate::ast::NodeSpec;
use crate::graph::{BaseNode, NodeId};

pub use alias::Alias;
pub use capability::{
    BaseDroneSteps, ConformCompiler, DockerfileCompiler, DroneCompiler, MakefileCompiler,
};
pub use conform::Conform;
pub use custom::CustomStep;
pub use release::Release;
pub use setup::SetupStep;

/// A backend contract a node kind may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Contributes Makefile targets.
    Makefile,
    /// Contributes Dockerfile stages.
    Dockerfile,
    /// Contributes Drone steps.
    Drone,
    /// Replays base steps into named pipelines.
    BaseDroneSteps,
    /// Contributes the conformance policy.
    Conform,
}

/// Discriminant of [`ProjectNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// [`CustomStep`].
    Custom,
    /// [`Release`].
    Release,
    /// [`SetupStep`].
    Setup,
    /// [`Alias`].
    Alias,
    /// [`Conform`].
    Conform,
}

impl NodeKind {
    /// Every kind.
    pub const ALL: [Self; 5] = [
        Self::Custom,
        Self::Release,
        Self::Setup,
        Self::Alias,
        Self::Conform,
    ];

    /// Capabilities implemented by nodes of this kind.
    #[must_use]
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::Custom => &[
                Capability::Makefile,
                Capability::Dockerfile,
                Capability::Drone,
            ],
            Self::Release => &[Capability::Makefile, Capability::Drone],
            Self::Setup => &[Capability::Drone, Capability::BaseDroneSteps],
            Self::Alias => &[Capability::Makefile],
            Self::Conform => &[Capability::Conform],
        }
    }

    /// Manifest key of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Release => "release",
            Self::Setup => "setup",
            Self::Alias => "alias",
            Self::Conform => "conform",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the project graph.
#[derive(Debug, Clone)]
pub enum ProjectNode {
    /// Hand-written backend contributions.
    Custom(CustomStep),
    /// Release notes and publishing.
    Release(Release),
    /// CI environment preparation.
    Setup(SetupStep),
    /// Makefile aggregate target.
    Alias(Alias),
    /// Conformance policy.
    Conform(Conform),
}

impl ProjectNode {
    pub(crate) fn new(base: BaseNode, spec: NodeSpec) -> Self {
        match spec {
            NodeSpec::Custom(spec) => Self::Custom(CustomStep::new(base, spec)),
            NodeSpec::Release(spec) => Self::Release(Release::new(base, spec)),
            NodeSpec::Setup(spec) => Self::Setup(SetupStep::new(base, spec)),
            NodeSpec::Alias(spec) => Self::Alias(Alias::new(base, spec)),
            NodeSpec::Conform(spec) => Self::Conform(Conform::new(base, spec)),
        }
    }

    /// Identity and edges of the node.
    #[must_use]
    pub const fn base(&self) -> &BaseNode {
        match self {
            Self::Custom(node) => &node.base,
            Self::Release(node) => &node.base,
            Self::Setup(node) => &node.base,
            Self::Alias(node) => &node.base,
            Self::Conform(node) => &node.base,
        }
    }

    /// Identifier of the node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.base().id()
    }

    /// Unique node name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.base().name()
    }

    /// Kind of the node.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Custom(_) => NodeKind::Custom,
            Self::Release(_) => NodeKind::Release,
            Self::Setup(_) => NodeKind::Setup,
            Self::Alias(_) => NodeKind::Alias,
            Self::Conform(_) => NodeKind::Conform,
        }
    }

    /// Makefile contract, if the kind implements it.
    #[must_use]
    pub fn as_makefile(&self) -> Option<&dyn MakefileCompiler> {
        match self {
            Self::Custom(node) => Some(node),
            Self::Release(node) => Some(node),
            Self::Alias(node) => Some(node),
            Self::Setup(_) | Self::Conform(_) => None,
        }
    }

    /// Dockerfile contract, if the kind implements it.
    #[must_use]
    pub fn as_dockerfile(&self) -> Option<&dyn DockerfileCompiler> {
        match self {
            Self::Custom(node) => Some(node),
            Self::Release(_) | Self::Setup(_) | Self::Alias(_) | Self::Conform(_) => None,
        }
    }

    /// Drone contract, if the kind implements it.
    #[must_use]
    pub fn as_drone(&self) -> Option<&dyn DroneCompiler> {
        match self {
            Self::Custom(node) => Some(node),
            Self::Release(node) => Some(node),
            Self::Setup(node) => Some(node),
            Self::Alias(_) | Self::Conform(_) => None,
        }
    }

    /// Base step contract, if the kind implements it.
    #[must_use]
    pub fn as_base_drone_steps(&self) -> Option<&dyn BaseDroneSteps> {
        match self {
            Self::Setup(node) => Some(node),
            Self::Custom(_) | Self::Release(_) | Self::Alias(_) | Self::Conform(_) => None,
        }
    }

    /// Conformance contract, if the kind implements it.
    #[must_use]
    pub fn as_conform(&self) -> Option<&dyn ConformCompiler> {
        match self {
            Self::Conform(node) => Some(node),
            Self::Custom(_) | Self::Release(_) | Self::Setup(_) | Self::Alias(_) => None,
        }
    }

    /// Whether the node's kind implements `capability`.
    #[must_use]
    pub fn implements(&self, capability: Capability) -> bool {
        match capability {
            Capability::Makefile => self.as_makefile().is_some(),
            Capability::Dockerfile => self.as_dockerfile().is_some(),
            Capability::Drone => self.as_drone().is_some(),
            Capability::BaseDroneSteps => self.as_base_drone_steps().is_some(),
            Capability::Conform => self.as_conform().is_some(),
        }
    }

    /// Whether the node implements `capability` and its own configuration
    /// switches that backend on.
    ///
    /// Base steps carry no switch of their own.
    #[must_use]
    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::Makefile => self.as_makefile().is_some_and(|n| n.makefile_enabled()),
            Capability::Dockerfile => self.as_dockerfile().is_some_and(|n| n.dockerfile_enabled()),
            Capability::Drone => self.as_drone().is_some_and(|n| n.drone_enabled()),
            Capability::BaseDroneSteps => self.as_base_drone_steps().is_some(),
            Capability::Conform => self.as_conform().is_some(),
        }
    }
}
