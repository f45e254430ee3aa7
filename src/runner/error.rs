//! Error types for the runner module.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The manifest file does not exist at the expected path.
    #[error("no manifest named `{manifest_name}` in {directory}")]
    #[diagnostic(
        code(kiln::runner::manifest_not_found),
        help("Create a Kilnfile or point at one with `-f <FILE>`.")
    )]
    ManifestNotFound {
        /// Expected manifest file name.
        manifest_name: String,
        /// Description of the directory searched.
        directory: String,
        /// Path that was tried.
        path: Utf8PathBuf,
    },

    /// One or more backends failed to compile.
    #[error("{} of {total} backends failed: {}", .failed.len(), .failed.join(", "))]
    #[diagnostic(code(kiln::runner::backends_failed))]
    BackendsFailed {
        /// Names of the failing backends.
        failed: Vec<String>,
        /// Number of backends attempted.
        total: usize,
    },
}
