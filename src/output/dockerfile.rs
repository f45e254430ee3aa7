//! Dockerfile builder.
//!
//! Stages render in insertion order, each as a `FROM ... AS <name>` line
//! followed by its instructions. The optional syntax header precedes the
//! generated-file banner so BuildKit still recognises it.

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;

use super::{Owned, write_banner};
use crate::compile::ContributionError;

/// Base used by stages that do not name one.
pub const SCRATCH: &str = "scratch";

/// `RUN` instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    command: String,
    caches: Vec<String>,
}

impl Script {
    /// Run `command` in the stage.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            caches: Vec::new(),
        }
    }

    /// Mount a build cache at `target` while the command runs.
    #[must_use]
    pub fn mount_cache(mut self, target: impl Into<String>) -> Self {
        self.caches.push(target.into());
        self
    }
}

/// `COPY` instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Copy {
    from: Option<String>,
    src: String,
    dst: String,
}

impl Copy {
    /// Copy `src` from the build context to `dst`.
    #[must_use]
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            from: None,
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Copy from a stage or image instead of the build context.
    #[must_use]
    pub fn from(mut self, source: impl Into<String>) -> Self {
        self.from = Some(source.into());
        self
    }
}

/// A single stage instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `ARG <name>`.
    Arg(String),
    /// `RUN` with cache mounts.
    Script(Script),
    /// `COPY`.
    Copy(Copy),
}

impl From<Script> for Instruction {
    fn from(value: Script) -> Self {
        Self::Script(value)
    }
}

impl From<Copy> for Instruction {
    fn from(value: Copy) -> Self {
        Self::Copy(value)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arg(name) => write!(f, "ARG {name}"),
            Self::Script(script) => {
                write!(f, "RUN")?;
                for cache in &script.caches {
                    write!(f, " --mount=type=cache,target={cache}")?;
                }
                write!(f, " {}", script.command)
            }
            Self::Copy(copy) => {
                write!(f, "COPY")?;
                if let Some(from) = &copy.from {
                    write!(f, " --from={from}")?;
                }
                write!(f, " {} {}", copy.src, copy.dst)
            }
        }
    }
}

/// A named build stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    name: String,
    description: String,
    from: String,
    instructions: Vec<Instruction>,
}

impl Stage {
    /// Stage `name` based on [`SCRATCH`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            from: SCRATCH.to_owned(),
            instructions: Vec::new(),
        }
    }

    /// Comment emitted above the stage.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Base image or earlier stage.
    #[must_use]
    pub fn from(mut self, base: impl Into<String>) -> Self {
        self.from = base.into();
        self
    }

    /// Append an instruction.
    #[must_use]
    pub fn step(mut self, instruction: impl Into<Instruction>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for line in self.description.lines() {
            writeln!(f, "# {line}")?;
        }
        writeln!(f, "FROM {} AS {}", self.from, self.name)?;
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

/// Accumulated Dockerfile contents.
#[derive(Debug, Clone, Default)]
pub struct Output {
    syntax: Option<String>,
    stages: IndexMap<String, Owned<Stage>>,
}

impl Output {
    /// Empty Dockerfile announcing `syntax` when set.
    #[must_use]
    pub fn new(syntax: Option<String>) -> Self {
        Self {
            syntax,
            stages: IndexMap::new(),
        }
    }

    /// View of the builder attributing additions to `contributor`.
    pub fn scope<'a>(&'a mut self, contributor: &'a str) -> Scope<'a> {
        Scope {
            output: self,
            contributor,
        }
    }

    /// Whether a stage named `name` exists.
    #[must_use]
    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Whether no stage has been contributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Contributor-scoped view of an [`Output`].
#[derive(Debug)]
pub struct Scope<'a> {
    output: &'a mut Output,
    contributor: &'a str,
}

impl Scope<'_> {
    /// Append a stage.
    ///
    /// # Errors
    ///
    /// Returns [`ContributionError::Collision`] when a stage of that name
    /// exists.
    pub fn stage(&mut self, stage: Stage) -> Result<(), ContributionError> {
        if let Some(existing) = self.output.stages.get(&stage.name) {
            return Err(ContributionError::Collision {
                kind: "stage",
                name: stage.name,
                first: existing.contributor.clone(),
                second: self.contributor.to_owned(),
            });
        }
        self.output
            .stages
            .insert(stage.name.clone(), Owned::new(stage, self.contributor));
        Ok(())
    }

    /// Whether a stage named `name` exists.
    #[must_use]
    pub fn has_stage(&self, name: &str) -> bool {
        self.output.has_stage(name)
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(syntax) = &self.syntax {
            writeln!(f, "# syntax = {syntax}")?;
            writeln!(f)?;
        }
        write_banner(f)?;
        for owned in self.stages.values() {
            writeln!(f)?;
            write!(f, "{}", owned.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn renders_stages_in_order() {
        let mut output = Output::new(Some("docker/dockerfile:1".into()));
        let mut scope = output.scope("build");
        scope
            .stage(
                Stage::new("base")
                    .description("toolchain")
                    .from("rust:1.89")
                    .step(Instruction::Arg("VERSION".into()))
                    .step(Script::new("cargo build").mount_cache("/root/.cargo")),
            )
            .expect("base stage");
        scope
            .stage(Stage::new("out").step(Copy::new("/src/target", "/").from("base")))
            .expect("out stage");

        let expected = concat!(
            "# syntax = docker/dockerfile:1\n",
            "\n",
            "# THIS FILE WAS AUTOMATICALLY GENERATED, PLEASE DO NOT EDIT.\n",
            "#\n",
            "# Generated by kiln from the project manifest.\n",
            "\n",
            "# toolchain\n",
            "FROM rust:1.89 AS base\n",
            "ARG VERSION\n",
            "RUN --mount=type=cache,target=/root/.cargo cargo build\n",
            "\n",
            "FROM scratch AS out\n",
            "COPY --from=base /src/target /\n",
        );
        assert_eq!(output.to_string(), expected);
    }

    #[rstest]
    fn copy_without_source_uses_build_context() {
        assert_eq!(
            Instruction::from(Copy::new("./src", "/src")).to_string(),
            "COPY ./src /src"
        );
    }

    #[rstest]
    fn duplicate_stage_names_collide() {
        let mut output = Output::new(None);
        output
            .scope("a")
            .stage(Stage::new("base"))
            .expect("first stage");
        let err = output
            .scope("b")
            .stage(Stage::new("base"))
            .expect_err("collision");
        assert_eq!(err.to_string(), "stage `base` is declared by both `a` and `b`");
        assert!(output.has_stage("base"));
    }
}
