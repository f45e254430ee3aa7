//! Drone pipeline builder.
//!
//! The document holds the default pipeline followed by named pipelines in
//! declaration order, each rendered as its own YAML document. Named pipelines
//! carry promotion and cron triggers; re-declaring one with the same triggers
//! reuses it, anything else is a conflict.
//!
//! Steps keep insertion order within their pipeline. The pipeline-level
//! `volumes` section is derived from step mounts, every mounted volume
//! becoming a `temp` volume.

use std::fmt::{self, Display, Formatter};

use indexmap::{IndexMap, IndexSet};

use super::Owned;
use crate::compile::ContributionError;

/// Name of the pipeline receiving unscoped steps.
pub const DEFAULT_PIPELINE: &str = "default";

/// Value of a step environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    /// Literal value.
    Plain(String),
    /// Value read from the named CI secret.
    Secret(String),
}

/// CPU and memory requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    /// CPU in millicores.
    pub cpu_millis: u64,
    /// Memory in GiB.
    pub memory_gib: u32,
}

impl Resources {
    /// Requests for whole `cpu_cores` and `memory_gib` GiB.
    #[must_use]
    pub fn new(cpu_cores: u32, memory_gib: u32) -> Self {
        Self {
            cpu_millis: u64::from(cpu_cores) * 1000,
            memory_gib,
        }
    }
}

/// Volume mounted into a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Volume name.
    pub name: String,
    /// Path inside the container.
    pub path: String,
}

/// Settings of the `plugins/github-release` publish plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    /// Release notes file.
    pub note: String,
    /// Files or globs uploaded with the release.
    pub files: Vec<String>,
}

/// Triggers of a named pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trigger {
    /// Promotion targets.
    pub targets: Vec<String>,
    /// Cron job names.
    pub crons: Vec<String>,
}

impl Trigger {
    fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.crons.is_empty()
    }
}

/// A pipeline step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    name: String,
    image: String,
    commands: Vec<String>,
    environment: IndexMap<String, EnvValue>,
    depends_on: Vec<String>,
    privileged: bool,
    resources: Option<Resources>,
    volumes: Vec<VolumeMount>,
    only_on_tag: bool,
    publish: Option<Publish>,
}

impl Step {
    /// Step running `make <name>` in `image`.
    #[must_use]
    pub fn make(name: impl Into<String>, image: impl Into<String>) -> Self {
        let name = name.into();
        let command = format!("make {name}");
        Self::custom(name, image, [command])
    }

    /// Step running arbitrary `commands` in `image`.
    #[must_use]
    pub fn custom<I, S>(name: impl Into<String>, image: impl Into<String>, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            image: image.into(),
            commands: commands.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names this step waits for.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    /// Set a plain environment variable, replacing any earlier value.
    #[must_use]
    pub fn environment(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment
            .insert(name.into(), EnvValue::Plain(value.into()));
        self
    }

    /// Read an environment variable from a CI secret.
    #[must_use]
    pub fn environment_from_secret(
        mut self,
        name: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.environment
            .insert(name.into(), EnvValue::Secret(secret.into()));
        self
    }

    /// Append step names this step waits for, skipping repeats.
    #[must_use]
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let dep = name.into();
            if !self.depends_on.contains(&dep) {
                self.depends_on.push(dep);
            }
        }
        self
    }

    /// Run the container privileged.
    #[must_use]
    pub const fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Request CPU and memory.
    #[must_use]
    pub const fn resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Mount the empty-dir volume `name` at `path`.
    #[must_use]
    pub fn empty_dir_volume(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.volumes.push(VolumeMount {
            name: name.into(),
            path: path.into(),
        });
        self
    }

    /// Run only for tag events.
    #[must_use]
    pub const fn only_on_tag(mut self) -> Self {
        self.only_on_tag = true;
        self
    }

    /// Publish `note` and `files` as a GitHub release.
    #[must_use]
    pub fn publish_artifacts<I, S>(mut self, note: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.publish = Some(Publish {
            note: note.into(),
            files: files.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Whether the step only runs on tags.
    #[must_use]
    pub const fn is_tag_only(&self) -> bool {
        self.only_on_tag
    }

    /// Commands in execution order.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Value of the environment variable `name`, if set.
    #[must_use]
    pub fn env(&self, name: &str) -> Option<&EnvValue> {
        self.environment.get(name)
    }
}

/// A step sequence run under one set of triggers.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    trigger: Trigger,
    owner: String,
    steps: IndexMap<String, Owned<Step>>,
}

impl Pipeline {
    fn new(name: &str, trigger: Trigger, owner: &str) -> Self {
        Self {
            name: name.to_owned(),
            trigger,
            owner: owner.to_owned(),
            steps: IndexMap::new(),
        }
    }

    /// Pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Step named `name`, if any.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.get(name).map(|owned| &owned.value)
    }

    /// Steps in insertion order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.values().map(|owned| &owned.value)
    }

    fn add(&mut self, step: Step, contributor: &str) -> Result<(), ContributionError> {
        if let Some(existing) = self.steps.get(&step.name) {
            return Err(ContributionError::Collision {
                kind: "step",
                name: step.name,
                first: existing.contributor.clone(),
                second: contributor.to_owned(),
            });
        }
        self.steps
            .insert(step.name.clone(), Owned::new(step, contributor));
        Ok(())
    }
}

/// Accumulated Drone document.
#[derive(Debug, Clone)]
pub struct Output {
    pipeline_type: String,
    default: Pipeline,
    named: IndexMap<String, Pipeline>,
}

impl Output {
    /// Empty document whose pipelines have the given `type`.
    #[must_use]
    pub fn new(pipeline_type: impl Into<String>) -> Self {
        Self {
            pipeline_type: pipeline_type.into(),
            default: Pipeline::new(DEFAULT_PIPELINE, Trigger::default(), ""),
            named: IndexMap::new(),
        }
    }

    /// View of the builder attributing additions to `contributor`.
    pub fn scope<'a>(&'a mut self, contributor: &'a str) -> Scope<'a> {
        Scope {
            output: self,
            contributor,
        }
    }

    /// The default pipeline.
    #[must_use]
    pub const fn default_pipeline(&self) -> &Pipeline {
        &self.default
    }

    /// Named pipeline `name`, if declared.
    #[must_use]
    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.named.get(name)
    }

    /// Whether no step has been contributed to any pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.default.steps.is_empty() && self.named.values().all(|p| p.steps.is_empty())
    }
}

/// Contributor-scoped view of an [`Output`].
#[derive(Debug)]
pub struct Scope<'a> {
    output: &'a mut Output,
    contributor: &'a str,
}

impl<'a> Scope<'a> {
    /// Append a step to the default pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ContributionError::Collision`] when the default pipeline has
    /// a step of that name.
    pub fn step(&mut self, step: Step) -> Result<(), ContributionError> {
        self.output.default.add(step, self.contributor)
    }

    /// Declare or reuse the named pipeline `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ContributionError::ReservedName`] for the default pipeline's
    /// name and [`ContributionError::PipelineMismatch`] when the pipeline
    /// exists with different triggers.
    pub fn pipeline(
        &mut self,
        name: &str,
        trigger: Trigger,
    ) -> Result<PipelineScope<'_>, ContributionError> {
        if name == DEFAULT_PIPELINE {
            return Err(ContributionError::ReservedName {
                kind: "pipeline",
                name: name.to_owned(),
            });
        }
        let contributor = self.contributor;
        let pipeline = self
            .output
            .named
            .entry(name.to_owned())
            .or_insert_with(|| Pipeline::new(name, trigger.clone(), contributor));
        if pipeline.trigger != trigger {
            return Err(ContributionError::PipelineMismatch {
                name: name.to_owned(),
                first: pipeline.owner.clone(),
                second: contributor.to_owned(),
            });
        }
        Ok(PipelineScope {
            pipeline,
            contributor,
        })
    }

    /// Whether the default pipeline has a step named `name`.
    #[must_use]
    pub fn has_step(&self, name: &str) -> bool {
        self.output.default.steps.contains_key(name)
    }
}

/// Contributor-scoped view of one named pipeline.
#[derive(Debug)]
pub struct PipelineScope<'a> {
    pipeline: &'a mut Pipeline,
    contributor: &'a str,
}

impl PipelineScope<'_> {
    /// Pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.pipeline.name
    }

    /// Append a step.
    ///
    /// # Errors
    ///
    /// Returns [`ContributionError::Collision`] when the pipeline has a step
    /// of that name.
    pub fn step(&mut self, step: Step) -> Result<(), ContributionError> {
        self.pipeline.add(step, self.contributor)
    }

    /// Whether the pipeline has a step named `name`.
    #[must_use]
    pub fn has_step(&self, name: &str) -> bool {
        self.pipeline.steps.contains_key(name)
    }

    /// The same pipeline, attributing additions to `contributor`.
    pub fn as_contributor<'b>(&'b mut self, contributor: &'b str) -> PipelineScope<'b> {
        PipelineScope {
            pipeline: &mut *self.pipeline,
            contributor,
        }
    }
}

/// Render `value` as a YAML scalar, quoting it unless it reads back verbatim.
fn scalar(value: &str) -> String {
    if is_plain(value) {
        value.to_owned()
    } else {
        serde_json::Value::String(value.to_owned()).to_string()
    }
}

fn is_plain(value: &str) -> bool {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
        '`',
    ];
    const KEYWORDS: &[&str] = &["true", "false", "yes", "no", "on", "off", "null", "~", "y", "n"];

    let Some(first) = value.chars().next() else {
        return false;
    };
    if INDICATORS.contains(&first) || first.is_ascii_digit() || first == '.' || first == '+' {
        return false;
    }
    if value.trim() != value || value.ends_with(':') {
        return false;
    }
    if value.contains(": ") || value.contains(" #") || value.contains(['\n', '\t', '\r']) {
        return false;
    }
    !KEYWORDS.iter().any(|kw| value.eq_ignore_ascii_case(kw))
}

fn write_list(f: &mut Formatter<'_>, indent: &str, key: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "{indent}{key}:")?;
    for item in items {
        writeln!(f, "{indent}  - {}", scalar(item))?;
    }
    Ok(())
}

fn write_include(f: &mut Formatter<'_>, indent: &str, key: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "{indent}{key}:")?;
    let nested = format!("{indent}  ");
    write_list(f, &nested, "include", items)
}

struct DisplayStep<'a>(&'a Step);

impl Display for DisplayStep<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let step = self.0;
        writeln!(f, "  - name: {}", scalar(&step.name))?;
        writeln!(f, "    image: {}", scalar(&step.image))?;
        write_list(f, "    ", "commands", &step.commands)?;
        if !step.environment.is_empty() {
            writeln!(f, "    environment:")?;
            for (name, value) in &step.environment {
                match value {
                    EnvValue::Plain(text) => writeln!(f, "      {}: {}", scalar(name), scalar(text))?,
                    EnvValue::Secret(secret) => {
                        writeln!(f, "      {}:", scalar(name))?;
                        writeln!(f, "        from_secret: {}", scalar(secret))?;
                    }
                }
            }
        }
        if step.privileged {
            writeln!(f, "    privileged: true")?;
        }
        if let Some(resources) = step.resources {
            writeln!(f, "    resources:")?;
            writeln!(f, "      requests:")?;
            writeln!(f, "        cpu: {}", resources.cpu_millis)?;
            writeln!(f, "        memory: {}GiB", resources.memory_gib)?;
        }
        if let Some(publish) = &step.publish {
            writeln!(f, "    settings:")?;
            writeln!(f, "      api_key:")?;
            writeln!(f, "        from_secret: github_token")?;
            writeln!(f, "      draft: true")?;
            writeln!(f, "      note: {}", scalar(&publish.note))?;
            write_list(f, "      ", "files", &publish.files)?;
            write_list(f, "      ", "checksum", &["sha256".to_owned(), "sha512".to_owned()])?;
        }
        if !step.volumes.is_empty() {
            writeln!(f, "    volumes:")?;
            for volume in &step.volumes {
                writeln!(f, "      - name: {}", scalar(&volume.name))?;
                writeln!(f, "        path: {}", scalar(&volume.path))?;
            }
        }
        if step.only_on_tag {
            writeln!(f, "    when:")?;
            write_include(f, "      ", "event", &["tag".to_owned()])?;
        }
        write_list(f, "    ", "depends_on", &step.depends_on)
    }
}

struct DisplayPipeline<'a> {
    pipeline: &'a Pipeline,
    pipeline_type: &'a str,
}

impl Display for DisplayPipeline<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let pipeline = self.pipeline;
        writeln!(f, "---")?;
        writeln!(f, "kind: pipeline")?;
        writeln!(f, "type: {}", scalar(self.pipeline_type))?;
        writeln!(f, "name: {}", scalar(&pipeline.name))?;
        writeln!(f)?;
        writeln!(f, "steps:")?;
        for owned in pipeline.steps.values() {
            write!(f, "{}", DisplayStep(&owned.value))?;
        }

        let volumes: IndexSet<&str> = pipeline
            .steps
            .values()
            .flat_map(|owned| owned.value.volumes.iter().map(|v| v.name.as_str()))
            .collect();
        if !volumes.is_empty() {
            writeln!(f)?;
            writeln!(f, "volumes:")?;
            for name in volumes {
                writeln!(f, "  - name: {}", scalar(name))?;
                writeln!(f, "    temp: {{}}")?;
            }
        }

        if !pipeline.trigger.is_empty() {
            writeln!(f)?;
            writeln!(f, "trigger:")?;
            write_include(f, "  ", "cron", &pipeline.trigger.crons)?;
            write_include(f, "  ", "target", &pipeline.trigger.targets)?;
        }
        Ok(())
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for pipeline in std::iter::once(&self.default).chain(self.named.values()) {
            write!(
                f,
                "{}",
                DisplayPipeline {
                    pipeline,
                    pipeline_type: &self.pipeline_type,
                }
            )?;
        }
        Ok(())
    }
}
