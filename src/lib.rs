//! Kiln core library.
//!
//! Kiln reads a `Kilnfile` describing a project as a graph of nodes and
//! compiles it into a `Makefile`, a `Dockerfile`, a Drone `.drone.yml` and a
//! `.conform.yaml` policy. Each node kind declares which backends it
//! contributes to; the [`compile`] passes walk the [`graph`] in declaration
//! order and collect the contributions into the [`output`] builders.
//!
//! ```rust
//! use kiln::compile::{Backend, Compiler};
//! use kiln::graph::Graph;
//!
//! let manifest = kiln::manifest::from_str(
//!     "kiln_version: 1.0.0\n\
//!      nodes:\n\
//!      \x20 - alias:\n\
//!      \x20     name: check\n",
//! )
//! .expect("manifest");
//! let graph = Graph::from_manifest(&manifest).expect("graph");
//! let artifact = Compiler::new(&graph, &manifest.project)
//!     .compile(Backend::Makefile)
//!     .expect("makefile");
//! assert!(artifact.contents.contains("check:\n"));
//! ```

pub mod ast;
pub mod cli;
pub mod compile;
pub mod graph;
pub mod manifest;
pub mod node;
pub mod output;
pub mod project;
pub mod runner;
