//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! loads the manifest, builds the project graph and hands it to the
//! compiler for the requested command.

mod error;
mod file_io;
mod path_helpers;

pub use error::RunnerError;

use crate::ast::KilnManifest;
use crate::cli::{Cli, Commands, GenerateArgs};
use crate::compile::{Backend, Compiler};
use crate::graph::Graph;
use crate::manifest;
use anyhow::{Context, Result};
use camino::Utf8Path;
use cap_std::fs_utf8::Dir;
use tracing::{debug, error, info, warn};

use path_helpers::{ensure_manifest_exists_or_error, resolve_manifest_path, resolve_output_path};

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, the graph is invalid,
/// a backend fails to compile or an artifact cannot be written.
pub fn run(cli: &Cli) -> Result<()> {
    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| Commands::Generate(GenerateArgs::default()));
    let manifest = load_manifest(cli)?;
    let graph = Graph::from_manifest(&manifest).context("failed to build the project graph")?;
    debug!(nodes = graph.len(), "built project graph");
    let compiler = Compiler::new(&graph, &manifest.project);
    match command {
        Commands::Generate(args) => handle_generate(cli, &args, &compiler),
        Commands::Emit { backend, file } => handle_emit(cli, backend, file.as_deref(), &compiler),
        Commands::Graph => file_io::write_stdout(&graph.dot().to_string()),
    }
}

fn load_manifest(cli: &Cli) -> Result<KilnManifest> {
    let manifest_path = resolve_manifest_path(cli)?;
    ensure_manifest_exists_or_error(cli, &manifest_path)?;
    let manifest = manifest::from_path(&manifest_path)?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        let ast_json =
            serde_json::to_string_pretty(&manifest).context("failed to serialise the manifest")?;
        debug!("AST:\n{ast_json}");
    }
    Ok(manifest)
}

/// Compile every backend and write the non-empty successes.
///
/// Failures are logged individually and summarised once all successful
/// artifacts have been written. Failed and empty backends lose any file a
/// previous run left behind.
fn handle_generate(cli: &Cli, args: &GenerateArgs, compiler: &Compiler<'_>) -> Result<()> {
    let out = args.out.as_deref().unwrap_or_else(|| Utf8Path::new("."));
    let out_path = resolve_output_path(cli, out);
    let dir = file_io::open_or_create_dir(&out_path)?;

    let results = compiler.compile_all();
    let total = results.len();
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(artifact) if artifact.empty => {
                info!(backend = %artifact.backend, "nothing to generate");
                remove_stale(&dir, &out_path, artifact.backend)?;
            }
            Ok(artifact) => {
                let file_name = artifact.backend.file_name();
                file_io::write_file_in(&dir, Utf8Path::new(file_name), &artifact.contents)?;
                info!(backend = %artifact.backend, "wrote {}", out_path.join(file_name));
            }
            Err(err) => {
                error!(
                    backend = %err.backend,
                    node = %err.node,
                    error = %err.source,
                    "backend failed"
                );
                remove_stale(&dir, &out_path, err.backend)?;
                failed.push(err.backend.to_string());
            }
        }
    }
    if failed.is_empty() {
        Ok(())
    } else {
        Err(RunnerError::BackendsFailed { failed, total }.into())
    }
}

/// Delete the artifact a previous run left for `backend`.
fn remove_stale(dir: &Dir, out_path: &Utf8Path, backend: Backend) -> Result<()> {
    let file_name = backend.file_name();
    if file_io::remove_file_in(dir, Utf8Path::new(file_name))? {
        warn!(%backend, "removed stale {}", out_path.join(file_name));
    }
    Ok(())
}

/// Compile one backend and write it to `file`, or stdout when absent or `-`.
fn handle_emit(
    cli: &Cli,
    backend: Backend,
    file: Option<&Utf8Path>,
    compiler: &Compiler<'_>,
) -> Result<()> {
    let artifact = compiler.compile(backend)?;
    match file {
        Some(path) if !file_io::is_stdout_path(path) => {
            let output_path = resolve_output_path(cli, path);
            file_io::write_file(&output_path, &artifact.contents)
        }
        _ => file_io::write_stdout(&artifact.contents),
    }
}
