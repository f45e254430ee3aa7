//! Per-backend output builders.
//!
//! Each builder is a single accumulator for one backend pass. Nodes reach it
//! through a contributor-scoped view, so every entry records who added it and
//! conflicts can name both parties. Builders only append; rendering happens
//! through [`std::fmt::Display`] once the pass is complete.

pub mod conform;
pub mod dockerfile;
pub mod drone;
pub mod makefile;

/// Comment block opening every generated artifact, without comment markers.
pub(crate) const BANNER: [&str; 3] = [
    "THIS FILE WAS AUTOMATICALLY GENERATED, PLEASE DO NOT EDIT.",
    "",
    "Generated by kiln from the project manifest.",
];

/// An entry together with the contributor that added it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Owned<T> {
    pub(crate) value: T,
    pub(crate) contributor: String,
}

impl<T> Owned<T> {
    pub(crate) fn new(value: T, contributor: &str) -> Self {
        Self {
            value,
            contributor: contributor.to_owned(),
        }
    }
}

fn write_banner(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for line in BANNER {
        if line.is_empty() {
            writeln!(f, "#")?;
        } else {
            writeln!(f, "# {line}")?;
        }
    }
    Ok(())
}
