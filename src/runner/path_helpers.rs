//! Path resolution helpers for the runner module.
//!
//! `-C/--directory` behaves like a working directory change for every path
//! given on the command line.

use crate::cli::Cli;
use anyhow::{Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use std::borrow::Cow;

use super::RunnerError;

/// Determine the manifest path respecting the CLI's directory option.
pub(super) fn resolve_manifest_path(cli: &Cli) -> Result<Utf8PathBuf> {
    let resolved = resolve_output_path(cli, &cli.file).into_owned();
    if resolved.file_name().is_none() {
        return Err(anyhow!("manifest path {resolved} has no file name"));
    }
    Ok(resolved)
}

/// Resolve a command-line path against `-C/--directory` when relative.
#[must_use]
pub(super) fn resolve_output_path<'a>(cli: &Cli, path: &'a Utf8Path) -> Cow<'a, Utf8Path> {
    if path.is_relative() {
        cli.directory
            .as_ref()
            .map_or(Cow::Borrowed(path), |dir| Cow::Owned(dir.join(path)))
    } else {
        Cow::Borrowed(path)
    }
}

pub(super) fn ensure_manifest_exists_or_error(cli: &Cli, manifest_path: &Utf8Path) -> Result<()> {
    if manifest_path.exists() {
        return Ok(());
    }
    let manifest_name = manifest_path
        .file_name()
        .ok_or_else(|| anyhow!("manifest path {manifest_path} has no file name"))?
        .to_owned();
    let directory = if cli.directory.is_some() {
        let parent = manifest_path.parent().map_or(manifest_path.as_str(), Utf8Path::as_str);
        format!("directory {parent}")
    } else {
        "the current directory".to_owned()
    };
    Err(RunnerError::ManifestNotFound {
        manifest_name,
        directory,
        path: manifest_path.to_owned(),
    }
    .into())
}
