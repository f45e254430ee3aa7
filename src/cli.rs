//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Running
//! without a subcommand behaves like `kiln generate`.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

use crate::compile::Backend;
use crate::manifest::DEFAULT_MANIFEST;

/// Compiles a project manifest into a Makefile, Dockerfile, Drone pipeline
/// and conformance policy.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the manifest file.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_MANIFEST)]
    pub file: Utf8PathBuf,

    /// Change to this directory before doing anything.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<Utf8PathBuf>,

    /// Enable verbose logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute; defaults to `generate` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Parse command-line arguments, providing `generate` as the default
    /// command.
    #[must_use]
    pub fn parse_with_default() -> Self {
        Self::parse().with_default_command()
    }

    /// Parse the provided arguments, applying the default command when needed.
    ///
    /// # Errors
    ///
    /// Returns the clap error when the arguments are invalid.
    pub fn try_parse_from_with_default<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args).map(Self::with_default_command)
    }

    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Generate(GenerateArgs::default()));
        }
        self
    }
}

/// Arguments accepted by the `generate` command.
#[derive(Debug, Args, PartialEq, Eq, Clone, Default)]
pub struct GenerateArgs {
    /// Directory receiving the generated files; the working directory when
    /// omitted.
    #[arg(long, value_name = "DIR")]
    pub out: Option<Utf8PathBuf>,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Compile every backend and write the non-empty artifacts (default).
    Generate(GenerateArgs),

    /// Compile a single backend and print or write its artifact.
    Emit {
        /// Backend to compile.
        #[arg(value_enum)]
        backend: Backend,

        /// Output path; standard output when omitted or `-`.
        #[arg(value_name = "FILE")]
        file: Option<Utf8PathBuf>,
    },

    /// Display the project graph in DOT format.
    Graph,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["kiln"], Commands::Generate(GenerateArgs::default()))]
    #[case(
        &["kiln", "generate", "--out", "build"],
        Commands::Generate(GenerateArgs { out: Some("build".into()) })
    )]
    #[case(&["kiln", "emit", "drone"], Commands::Emit { backend: Backend::Drone, file: None })]
    #[case(
        &["kiln", "emit", "makefile", "-"],
        Commands::Emit { backend: Backend::Makefile, file: Some("-".into()) }
    )]
    #[case(&["kiln", "graph"], Commands::Graph)]
    fn parses_subcommands(#[case] args: &[&str], #[case] expected: Commands) {
        let cli = Cli::try_parse_from_with_default(args).expect("parse");
        assert_eq!(cli.command, Some(expected));
        assert_eq!(cli.file, DEFAULT_MANIFEST);
    }

    #[rstest]
    fn global_flags_are_accepted() {
        let cli = Cli::try_parse_from_with_default(["kiln", "-v", "-C", "proj", "-f", "build.yml"])
            .expect("parse");
        assert!(cli.verbose);
        assert_eq!(cli.directory.as_deref().map(camino::Utf8Path::as_str), Some("proj"));
        assert_eq!(cli.file, "build.yml");
    }

    #[rstest]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from_with_default(["kiln", "emit", "ninja"]).is_err());
    }
}
