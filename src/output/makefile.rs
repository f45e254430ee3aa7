//! Makefile builder.
//!
//! Variables live in two ordered groups, `common` for project-wide values and
//! `extra` for variables contributed by nodes. Targets render in insertion
//! order after the aggregate `all` target, each phony target preceded by its
//! own `.PHONY` line:
//!
//! ```rust
//! use kiln::output::makefile::{Output, Target, Variable, VariableGroup};
//!
//! let mut output = Output::new();
//! let mut scope = output.scope("lint");
//! scope
//!     .variable(VariableGroup::Extra, Variable::overridable("LINT_FLAGS", "-D warnings"))
//!     .expect("variable");
//! scope
//!     .target(Target::new("lint").script(["cargo clippy $(LINT_FLAGS)"]).phony())
//!     .expect("target");
//! let text = output.to_string();
//! assert!(text.contains("LINT_FLAGS ?= -D warnings\n"));
//! assert!(text.contains(".PHONY: lint\nlint:\n\tcargo clippy $(LINT_FLAGS)\n"));
//! ```

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use itertools::Itertools;

use super::{Owned, write_banner};
use crate::compile::ContributionError;

/// Name of the aggregate default target.
pub const DEFAULT_TARGET: &str = "all";

/// Variable group a declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableGroup {
    /// Project-wide values.
    Common,
    /// Values contributed by individual nodes.
    Extra,
}

impl VariableGroup {
    const fn title(self) -> &'static str {
        match self {
            Self::Common => "common variables",
            Self::Extra => "extra variables",
        }
    }
}

/// A variable assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    value: String,
    overridable: bool,
}

impl Variable {
    /// Immediately expanded assignment (`:=`).
    #[must_use]
    pub fn simple(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            overridable: false,
        }
    }

    /// Assignment the environment may override (`?=`).
    #[must_use]
    pub fn overridable(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            overridable: true,
        }
    }

    const fn operator(&self) -> &'static str {
        if self.overridable { "?=" } else { ":=" }
    }

    fn describe(&self) -> String {
        format!("{} {}", self.operator(), self.value)
    }
}

/// A Makefile rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    name: String,
    depends: Vec<String>,
    script: Vec<String>,
    phony: bool,
}

impl Target {
    /// Empty rule named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append prerequisites, skipping ones already listed.
    #[must_use]
    pub fn depends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let dep = name.into();
            if !self.depends.contains(&dep) {
                self.depends.push(dep);
            }
        }
        self
    }

    /// Append recipe lines.
    #[must_use]
    pub fn script<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Declare the rule `.PHONY`.
    #[must_use]
    pub const fn phony(mut self) -> Self {
        self.phony = true;
        self
    }

    /// Rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prerequisites in declaration order.
    #[must_use]
    pub fn prerequisites(&self) -> &[String] {
        &self.depends
    }
}

/// Accumulated Makefile contents.
#[derive(Debug, Clone, Default)]
pub struct Output {
    variables: IndexMap<String, Owned<(VariableGroup, Variable)>>,
    targets: IndexMap<String, Owned<Target>>,
    defaults: Vec<String>,
}

impl Output {
    /// Empty Makefile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// View of the builder attributing additions to `contributor`.
    pub fn scope<'a>(&'a mut self, contributor: &'a str) -> Scope<'a> {
        Scope {
            output: self,
            contributor,
        }
    }

    /// Prerequisites of the aggregate `all` target.
    pub fn set_defaults<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults = names.into_iter().map(Into::into).collect();
    }

    /// Whether a rule named `name` exists.
    #[must_use]
    pub fn has_target(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Rule named `name`, if any.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.get(name).map(|owned| &owned.value)
    }

    /// Whether nothing has been contributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.defaults.is_empty()
    }

    fn group(&self, group: VariableGroup) -> impl Iterator<Item = &Variable> {
        self.variables
            .values()
            .filter(move |owned| owned.value.0 == group)
            .map(|owned| &owned.value.1)
    }
}

/// Contributor-scoped view of an [`Output`].
#[derive(Debug)]
pub struct Scope<'a> {
    output: &'a mut Output,
    contributor: &'a str,
}

impl Scope<'_> {
    /// Declare a variable.
    ///
    /// Repeating an identical declaration is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ContributionError::VariableConflict`] when the name is
    /// already bound to a different value.
    pub fn variable(
        &mut self,
        group: VariableGroup,
        variable: Variable,
    ) -> Result<(), ContributionError> {
        if let Some(existing) = self.output.variables.get(&variable.name) {
            let (_, previous) = &existing.value;
            if *previous == variable {
                return Ok(());
            }
            return Err(ContributionError::VariableConflict {
                name: variable.name.clone(),
                first: existing.contributor.clone(),
                first_value: previous.describe(),
                second: self.contributor.to_owned(),
                second_value: variable.describe(),
            });
        }
        self.output.variables.insert(
            variable.name.clone(),
            Owned::new((group, variable), self.contributor),
        );
        Ok(())
    }

    /// Add a rule.
    ///
    /// # Errors
    ///
    /// Returns [`ContributionError::Collision`] when a rule of that name
    /// exists and [`ContributionError::ReservedName`] for `all`.
    pub fn target(&mut self, target: Target) -> Result<(), ContributionError> {
        if target.name == DEFAULT_TARGET {
            return Err(ContributionError::ReservedName {
                kind: "target",
                name: target.name,
            });
        }
        if let Some(existing) = self.output.targets.get(&target.name) {
            return Err(ContributionError::Collision {
                kind: "target",
                name: target.name,
                first: existing.contributor.clone(),
                second: self.contributor.to_owned(),
            });
        }
        self.output
            .targets
            .insert(target.name.clone(), Owned::new(target, self.contributor));
        Ok(())
    }

    /// Whether a rule named `name` exists.
    #[must_use]
    pub fn has_target(&self, name: &str) -> bool {
        self.output.has_target(name)
    }
}

struct DisplayTarget<'a>(&'a Target);

impl Display for DisplayTarget<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let target = self.0;
        if target.phony {
            writeln!(f, ".PHONY: {}", target.name)?;
        }
        write!(f, "{}:", target.name)?;
        if !target.depends.is_empty() {
            write!(f, " {}", target.depends.iter().join(" "))?;
        }
        writeln!(f)?;
        for line in &target.script {
            writeln!(f, "\t{line}")?;
        }
        Ok(())
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_banner(f)?;
        for group in [VariableGroup::Common, VariableGroup::Extra] {
            let mut variables = self.group(group).peekable();
            if variables.peek().is_none() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "# {}", group.title())?;
            writeln!(f)?;
            for variable in variables {
                writeln!(
                    f,
                    "{} {} {}",
                    variable.name,
                    variable.operator(),
                    variable.value
                )?;
            }
        }
        if !self.defaults.is_empty() {
            let all = Target::new(DEFAULT_TARGET)
                .depends(self.defaults.iter().cloned())
                .phony();
            writeln!(f)?;
            write!(f, "{}", DisplayTarget(&all))?;
        }
        for owned in self.targets.values() {
            writeln!(f)?;
            write!(f, "{}", DisplayTarget(&owned.value))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn renders_groups_defaults_and_targets() {
        let mut output = Output::new();
        output
            .scope("project")
            .variable(VariableGroup::Common, Variable::simple("ARTIFACTS", "_out"))
            .expect("common variable");
        let mut scope = output.scope("build");
        scope
            .variable(VariableGroup::Extra, Variable::overridable("PROFILE", "release"))
            .expect("extra variable");
        scope
            .target(
                Target::new("build")
                    .depends(["setup", "setup"])
                    .script(["cargo build --profile $(PROFILE)"]),
            )
            .expect("target");
        output.set_defaults(["build"]);

        let expected = concat!(
            "# THIS FILE WAS AUTOMATICALLY GENERATED, PLEASE DO NOT EDIT.\n",
            "#\n",
            "# Generated by kiln from the project manifest.\n",
            "\n",
            "# common variables\n",
            "\n",
            "ARTIFACTS := _out\n",
            "\n",
            "# extra variables\n",
            "\n",
            "PROFILE ?= release\n",
            "\n",
            ".PHONY: all\n",
            "all: build\n",
            "\n",
            "build: setup\n",
            "\tcargo build --profile $(PROFILE)\n",
        );
        assert_eq!(output.to_string(), expected);
    }

    #[rstest]
    fn identical_variables_are_deduplicated() {
        let mut output = Output::new();
        for node in ["a", "b"] {
            output
                .scope(node)
                .variable(VariableGroup::Extra, Variable::overridable("GO", "go"))
                .expect("identical declaration");
        }
        assert_eq!(output.to_string().matches("GO ?= go").count(), 1);
    }

    #[rstest]
    fn conflicting_variables_name_both_contributors() {
        let mut output = Output::new();
        output
            .scope("a")
            .variable(VariableGroup::Extra, Variable::overridable("GO", "go1.21"))
            .expect("first declaration");
        let err = output
            .scope("b")
            .variable(VariableGroup::Extra, Variable::overridable("GO", "go1.22"))
            .expect_err("conflict");
        let ContributionError::VariableConflict { first, second, .. } = err else {
            panic!("expected variable conflict, got {err:?}");
        };
        assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
    }

    #[rstest]
    #[case("lint", "target `lint` is declared by both `first` and `second`")]
    #[case("all", "target name `all` is reserved")]
    fn duplicate_or_reserved_targets_fail(#[case] name: &str, #[case] message: &str) {
        let mut output = Output::new();
        output
            .scope("first")
            .target(Target::new("lint"))
            .expect("first target");
        let err = output
            .scope("second")
            .target(Target::new(name))
            .expect_err("rejected target");
        assert_eq!(err.to_string(), message);
    }
}
