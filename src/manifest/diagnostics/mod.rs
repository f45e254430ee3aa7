//! Translates manifest parsing errors into actionable diagnostics.
//!
//! [`ManifestSource`] retains the YAML content, [`ManifestName`] labels its
//! origin, and the mapping helpers ([`map_yaml_error`], [`map_data_error`])
//! turn parser and deserialisation failures into [`miette`] diagnostics with
//! spans, hints and stable codes.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use semver::Version;
use thiserror::Error;

use super::hints::{self, SCHEMA_HINTS};

mod yaml;

pub use yaml::map_yaml_error;

/// YAML source content for a manifest.
///
/// # Examples
/// ```rust
/// use kiln::manifest::ManifestSource;
/// let source = ManifestSource::from("kiln_version: 1.0.0");
/// assert_eq!(source.as_str(), "kiln_version: 1.0.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestSource(String);

impl ManifestSource {
    /// Wrap manifest text.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    /// The stored text.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestSource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ManifestSource {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestSource {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Display name for a manifest used in diagnostics, usually its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestName(String);

impl ManifestName {
    /// Wrap a diagnostic label.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The label.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ManifestName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ManifestName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Error raised when a manifest cannot be loaded.
///
/// # Examples
/// ```rust
/// use miette::MietteDiagnostic;
/// use kiln::manifest::ManifestError;
///
/// let err = ManifestError::Parse {
///     name: "Kilnfile".into(),
///     source: Box::new(MietteDiagnostic::new("bad manifest")),
/// };
/// assert_eq!(err.to_string(), "failed to parse manifest Kilnfile");
/// ```
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// Parsing or schema validation failed with the supplied diagnostic.
    #[error("failed to parse manifest {name}")]
    #[diagnostic(code(kiln::manifest::parse))]
    Parse {
        /// Manifest label.
        name: ManifestName,
        /// Underlying diagnostic reported by the parser or validator.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
    },

    /// The manifest declares a format version this build cannot read.
    #[error("manifest {name} declares kiln_version {version}, expected {supported}")]
    #[diagnostic(
        code(kiln::manifest::version),
        help("Set `kiln_version` to a 1.x release.")
    )]
    UnsupportedVersion {
        /// Manifest label.
        name: ManifestName,
        /// Declared version.
        version: Version,
        /// Accepted version requirement.
        supported: &'static str,
    },
}

#[derive(Debug, Error, Diagnostic)]
#[error("{name}: {source}")]
#[diagnostic(code(kiln::manifest::structure))]
struct DataDiagnostic {
    #[source]
    source: serde_json::Error,
    name: ManifestName,
    #[help]
    help: Option<&'static str>,
}

/// Map a [`serde_json`] structural error into a diagnostic.
///
/// Schema validation runs on the decoded value, which carries no byte
/// offsets, so the diagnostic names the manifest but has no span.
#[must_use]
pub fn map_data_error(
    err: serde_json::Error,
    name: &ManifestName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let help = hints::find(&SCHEMA_HINTS, &err.to_string());
    Box::new(DataDiagnostic {
        source: err,
        name: name.clone(),
        help,
    })
}
