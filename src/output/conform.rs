//! Conformance policy builder.
//!
//! The policy document is a fixed template; only the commit conventions and
//! the license check settings vary. List placeholders render as YAML flow
//! sequences and the license header as an indented block scalar.

use std::fmt::{self, Display, Formatter};

use minijinja::{Environment, context};

use super::Owned;
use crate::compile::ContributionError;

const POLICY_TEMPLATE: &str = "\
policies:
- type: commit
  spec:
    dco: true
    gpg: false
    spellcheck:
      locale: US
    maximumOfOneCommit: true
    header:
      length: 89
      imperative: true
      case: lower
      invalidLastCharacters: .
    body:
      required: true
    conventional:
      types: {{ types | flow }}
      scopes: {{ scopes | flow }}
- type: license
  spec:
    skipPaths: {{ skip_paths | flow }}
    includeSuffixes: {{ include_suffixes | flow }}
    excludeSuffixes: {{ exclude_suffixes | flow }}
    header: |
{{ header }}";

/// Settings substituted into the policy template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// Conventional commit types.
    pub types: Vec<String>,
    /// Conventional commit scopes.
    pub scopes: Vec<String>,
    /// Required license header text.
    pub license_header: String,
    /// Paths excluded from the license check.
    pub skip_paths: Vec<String>,
    /// File suffixes the license check applies to.
    pub include_suffixes: Vec<String>,
    /// File suffixes excluded from the license check.
    pub exclude_suffixes: Vec<String>,
}

/// Accumulated policy document.
#[derive(Debug, Clone, Default)]
pub struct Output {
    policy: Option<Owned<String>>,
}

impl Output {
    /// Output with no policy.
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

    /// Whether no policy has been contributed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.policy.is_none()
    }
}

/// Contributor-scoped view of an [`Output`].
#[derive(Debug)]
pub struct Scope<'a> {
    output: &'a mut Output,
    contributor: &'a str,
}

impl Scope<'_> {
    /// Render and store the policy document.
    ///
    /// # Errors
    ///
    /// Returns [`ContributionError::Collision`] when a policy exists and
    /// [`ContributionError::Template`] when rendering fails.
    pub fn policy(&mut self, policy: &Policy) -> Result<(), ContributionError> {
        if let Some(existing) = &self.output.policy {
            return Err(ContributionError::Collision {
                kind: "conform policy",
                name: "policy".to_owned(),
                first: existing.contributor.clone(),
                second: self.contributor.to_owned(),
            });
        }
        let text = render(policy).map_err(|source| ContributionError::Template {
            template: "conform policy",
            source,
        })?;
        self.output.policy = Some(Owned::new(text, self.contributor));
        Ok(())
    }
}

fn flow(items: Vec<String>) -> Result<String, minijinja::Error> {
    serde_json::to_string(&items).map_err(|err| {
        minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, err.to_string())
    })
}

fn render(policy: &Policy) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
    env.set_keep_trailing_newline(true);
    env.add_filter("flow", flow);
    env.add_template("policy", POLICY_TEMPLATE)?;
    let header = policy
        .license_header
        .lines()
        .map(|line| format!("      {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    let mut text = env.get_template("policy")?.render(context! {
        types => &policy.types,
        scopes => &policy.scopes,
        skip_paths => &policy.skip_paths,
        include_suffixes => &policy.include_suffixes,
        exclude_suffixes => &policy.exclude_suffixes,
        header => header,
    })?;
    text.push('\n');
    Ok(text)
}

impl Display for Output {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.policy {
            Some(owned) => f.write_str(&owned.value),
            None => Ok(()),
        }
    }
}
