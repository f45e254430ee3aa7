//! Kiln manifest Abstract Syntax Tree structures.
//!
//! This module defines the data structures used to represent a parsed
//! `Kilnfile`. They mirror the YAML schema described in the design document
//! and are deserialised from the order-preserving JSON value produced by the
//! YAML front end, so map-valued fields keep their declaration order.
//!
//! Nodes are externally tagged by their kind:
//!
//! ```yaml
//! kiln_version: "1.0.0"
//! nodes:
//!   - setup:
//!       name: setup-ci
//!   - custom:
//!       name: lint
//!       inputs: [setup-ci]
//!       makefile:
//!         enabled: true
//!         script: ["cargo clippy"]
//! ```
//!
//! ```rust
//! use kiln::ast::{KilnManifest, NodeSpec};
//!
//! let json = serde_json::json!({
//!     "kiln_version": "1.0.0",
//!     "nodes": [{ "custom": { "name": "lint" } }],
//! });
//! let manifest: KilnManifest = serde_json::from_value(json).expect("parse");
//! assert!(matches!(&manifest.nodes[0], NodeSpec::Custom(step) if step.name == "lint"));
//! ```

use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize, de::Deserializer};

use crate::project::ProjectOptions;

/// Ordered `NAME: value` map used for step environments.
pub type Environment = IndexMap<String, String>;

/// Top-level manifest structure parsed from a `Kilnfile`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KilnManifest {
    /// Semantic version of the manifest format.
    pub kiln_version: Version,

    /// Project-wide options shared by every node.
    #[serde(default)]
    pub project: ProjectOptions,

    /// Names of nodes aggregated into the Makefile `all` target.
    #[serde(default)]
    pub defaults: Vec<String>,

    /// Project nodes in declaration order.
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

/// Declaration of a single project node, tagged by its kind.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeSpec {
    /// A step whose backend contributions are written out by hand.
    Custom(CustomSpec),
    /// Release notes and artifact publishing on tag builds.
    Release(ReleaseSpec),
    /// CI environment preparation replayed into named pipelines.
    Setup(SetupSpec),
    /// A Makefile aggregate target over its inputs.
    Alias(AliasSpec),
    /// Commit and license conformance policy.
    Conform(ConformSpec),
}

impl NodeSpec {
    /// Unique name of the declared node.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Custom(spec) => &spec.name,
            Self::Release(spec) => &spec.name,
            Self::Setup(spec) => &spec.name,
            Self::Alias(spec) => &spec.name,
            Self::Conform(spec) => &spec.name,
        }
    }

    /// Names of the nodes this node depends on, in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        match self {
            Self::Custom(spec) => &spec.inputs,
            Self::Release(spec) => &spec.inputs,
            Self::Setup(spec) => &spec.inputs,
            Self::Alias(spec) => &spec.inputs,
            Self::Conform(spec) => &spec.inputs,
        }
    }
}

/// A custom step with independently enabled backend blocks.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CustomSpec {
    /// Node name, also used as Makefile target and CI step name.
    pub name: String,
    /// Names of upstream nodes.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Dockerfile contribution.
    #[serde(default)]
    pub docker: DockerBlock,
    /// Makefile contribution.
    #[serde(default)]
    pub makefile: MakefileBlock,
    /// Drone pipeline contribution.
    #[serde(default)]
    pub drone: DroneBlock,
}

/// Dockerfile stages contributed by a custom step.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DockerBlock {
    /// Whether the block contributes anything.
    #[serde(default)]
    pub enabled: bool,
    /// Stages in emission order.
    #[serde(default)]
    pub stages: Vec<StageSpec>,
}

/// One named Dockerfile build stage.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StageSpec {
    /// Stage name used in `FROM ... AS <name>`.
    pub name: String,
    /// Human readable summary emitted as a comment.
    #[serde(default)]
    pub description: String,
    /// Base image or earlier stage; `scratch` when omitted.
    #[serde(default)]
    pub from: Option<String>,
    /// Instructions in emission order.
    #[serde(default)]
    pub steps: Vec<StageStep>,
}

/// A primitive Dockerfile operation.
///
/// Exactly one of `arg`, `script` or `copy` must be provided for each step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStep {
    /// Declare a build argument.
    Arg(String),
    /// Run a shell command.
    Script(ScriptSpec),
    /// Copy files from the build context or another stage.
    Copy(CopySpec),
}

impl<'de> Deserialize<'de> for StageStep {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct RawStep {
            arg: Option<String>,
            script: Option<ScriptSpec>,
            copy: Option<CopySpec>,
        }

        let raw = RawStep::deserialize(deserializer)?;
        match (raw.arg, raw.script, raw.copy) {
            (Some(arg), None, None) => Ok(Self::Arg(arg)),
            (None, Some(script), None) => Ok(Self::Script(script)),
            (None, None, Some(copy)) => Ok(Self::Copy(copy)),
            (None, None, None) => Err(serde::de::Error::custom(
                "missing one of arg, script, or copy",
            )),
            (arg, script, copy) => {
                let present: Vec<&str> = [
                    ("arg", arg.is_some()),
                    ("script", script.is_some()),
                    ("copy", copy.is_some()),
                ]
                .into_iter()
                .filter_map(|(name, is_present)| is_present.then_some(name))
                .collect();
                Err(serde::de::Error::custom(format!(
                    "fields {} are mutually exclusive",
                    present.join(", ")
                )))
            }
        }
    }
}

/// `RUN` instruction with optional cache mounts.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScriptSpec {
    /// Shell command line.
    pub command: String,
    /// Paths mounted as build caches while the command runs.
    #[serde(default)]
    pub cache: Vec<String>,
}

/// `COPY` instruction.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CopySpec {
    /// Source stage or image; the build context when omitted. Must not
    /// name the current stage or a stage this node declares later.
    #[serde(default)]
    pub from: Option<String>,
    /// Source path.
    pub src: String,
    /// Destination path.
    pub dst: String,
}

/// Makefile target contributed by a custom step.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MakefileBlock {
    /// Whether the block contributes anything.
    #[serde(default)]
    pub enabled: bool,
    /// Declare the target `.PHONY`.
    #[serde(default)]
    pub phony: bool,
    /// Extra prerequisites appended after the graph-derived ones.
    #[serde(default)]
    pub depends: Vec<String>,
    /// Recipe lines.
    #[serde(default)]
    pub script: Vec<String>,
    /// Overridable variables merged into the shared `extra` group.
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
}

/// An overridable Makefile variable.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    /// Variable name.
    pub name: String,
    /// Value used when the environment does not override it.
    #[serde(default)]
    pub default_value: String,
}

/// Drone step and named pipelines contributed by a custom step.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DroneBlock {
    /// Whether the block contributes anything.
    #[serde(default)]
    pub enabled: bool,
    /// Run the step privileged.
    #[serde(default)]
    pub privileged: bool,
    /// Step environment.
    #[serde(default)]
    pub environment: Environment,
    /// Resource requests for the step.
    #[serde(default)]
    pub requests: Option<RequestsSpec>,
    /// Empty-dir volumes mounted into the step.
    #[serde(default)]
    pub volumes: Vec<VolumeSpec>,
    /// Named pipelines replaying this step.
    #[serde(default)]
    pub pipelines: Vec<PipelineSpec>,
}

/// CPU and memory requests.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RequestsSpec {
    /// Whole CPU cores.
    pub cpu_cores: u32,
    /// Memory in GiB.
    pub memory_gib: u32,
}

/// An empty-dir volume mount.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VolumeSpec {
    /// Volume name shared with the pipeline declaration.
    pub name: String,
    /// Mount path inside the step container.
    pub mount_path: String,
}

/// A named pipeline keyed by its triggers.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineSpec {
    /// Pipeline name.
    pub name: String,
    /// Promotion targets starting the pipeline.
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Cron job names starting the pipeline.
    #[serde(default)]
    pub crons: Vec<String>,
    /// Environment merged over the step environment in this pipeline.
    #[serde(default)]
    pub environment_override: Environment,
}

fn default_release_name() -> String {
    "release".to_owned()
}

fn default_release_artifacts() -> Vec<String> {
    vec!["*".to_owned()]
}

/// Release notes and publishing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReleaseSpec {
    /// Node name, also the publish step name.
    #[serde(default = "default_release_name")]
    pub name: String,
    /// Names of upstream nodes.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Glob patterns relative to the artifacts path to publish.
    #[serde(default = "default_release_artifacts")]
    pub artifacts: Vec<String>,
}

impl Default for ReleaseSpec {
    fn default() -> Self {
        Self {
            name: default_release_name(),
            inputs: Vec::new(),
            artifacts: default_release_artifacts(),
        }
    }
}

fn default_setup_name() -> String {
    "setup-ci".to_owned()
}

/// CI environment preparation step.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SetupSpec {
    /// Node and step name.
    #[serde(default = "default_setup_name")]
    pub name: String,
    /// Names of upstream nodes.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Step image; the project build image when omitted.
    #[serde(default)]
    pub image: Option<String>,
    /// Step commands; the buildx bootstrap sequence when empty.
    #[serde(default)]
    pub commands: Vec<String>,
    /// Run the step privileged.
    #[serde(default)]
    pub privileged: bool,
    /// Step environment.
    #[serde(default)]
    pub environment: Environment,
}

impl Default for SetupSpec {
    fn default() -> Self {
        Self {
            name: default_setup_name(),
            inputs: Vec::new(),
            image: None,
            commands: Vec::new(),
            privileged: false,
            environment: Environment::new(),
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Makefile aggregate target.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AliasSpec {
    /// Node and target name.
    pub name: String,
    /// Names of upstream nodes, used as prerequisites.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Declare the target `.PHONY`.
    #[serde(default = "default_true")]
    pub phony: bool,
    /// Recipe lines run after the prerequisites.
    #[serde(default)]
    pub script: Vec<String>,
}

impl Default for AliasSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            inputs: Vec::new(),
            phony: true,
            script: Vec::new(),
        }
    }
}

fn default_conform_name() -> String {
    "conform".to_owned()
}

fn default_commit_types() -> Vec<String> {
    ["chore", "docs", "perf", "refactor", "style", "test", "release"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_commit_scopes() -> Vec<String> {
    vec![".*".to_owned()]
}

fn default_skip_paths() -> Vec<String> {
    vec![".git/".to_owned()]
}

fn default_include_suffixes() -> Vec<String> {
    vec![".rs".to_owned()]
}

fn default_license_header() -> String {
    concat!(
        "// This Source Code Form is subject to the terms of the Mozilla Public\n",
        "// License, v. 2.0. If a copy of the MPL was not distributed with this\n",
        "// file, You can obtain one at http://mozilla.org/MPL/2.0/.\n",
    )
    .to_owned()
}

/// Commit and license conformance policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConformSpec {
    /// Node name.
    #[serde(default = "default_conform_name")]
    pub name: String,
    /// Names of upstream nodes.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Conventional commit types.
    #[serde(default = "default_commit_types")]
    pub types: Vec<String>,
    /// Conventional commit scopes.
    #[serde(default = "default_commit_scopes")]
    pub scopes: Vec<String>,
    /// Required license header text.
    #[serde(default = "default_license_header")]
    pub license_header: String,
    /// Paths excluded from the license check.
    #[serde(default = "default_skip_paths")]
    pub skip_paths: Vec<String>,
    /// File suffixes the license check applies to.
    #[serde(default = "default_include_suffixes")]
    pub include_suffixes: Vec<String>,
    /// File suffixes excluded from the license check.
    #[serde(default)]
    pub exclude_suffixes: Vec<String>,
}

impl Default for ConformSpec {
    fn default() -> Self {
        Self {
            name: default_conform_name(),
            inputs: Vec::new(),
            types: default_commit_types(),
            scopes: default_commit_scopes(),
            license_header: default_license_header(),
            skip_paths: default_skip_paths(),
            include_suffixes: default_include_suffixes(),
            exclude_suffixes: Vec::new(),
        }
    }
}
