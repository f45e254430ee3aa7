//! Manifest loading.
//!
//! A `Kilnfile` is parsed as YAML into an order-preserving JSON value and
//! then deserialised into [`KilnManifest`]. Going through the intermediate
//! value keeps YAML syntax errors (which carry a source span) apart from
//! schema errors (which do not), so each gets its own diagnostic.
//!
//! ```rust
//! let manifest = kiln::manifest::from_str(
//!     "kiln_version: 1.0.0\nnodes:\n  - custom:\n      name: lint\n",
//! )
//! .expect("manifest");
//! assert_eq!(manifest.nodes.len(), 1);
//! ```

use anyhow::{Context, Result};
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

use crate::ast::KilnManifest;

mod diagnostics;
mod hints;

pub use diagnostics::{ManifestError, ManifestName, ManifestSource, map_data_error, map_yaml_error};

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "Kilnfile";

/// Version requirement a manifest's `kiln_version` must satisfy.
pub const SUPPORTED_VERSION: &str = "^1";

const SUPPORTED_MAJOR: u64 = 1;

/// Parse manifest text, labelling diagnostics with `name`.
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] when the YAML is malformed or does not
/// match the schema, and [`ManifestError::UnsupportedVersion`] when
/// `kiln_version` is outside [`SUPPORTED_VERSION`].
pub fn from_str_named(yaml: &str, name: &ManifestName) -> Result<KilnManifest, ManifestError> {
    let doc: serde_json::Value =
        serde_saphyr::from_str(yaml).map_err(|e| ManifestError::Parse {
            name: name.clone(),
            source: map_yaml_error(e, &ManifestSource::from(yaml), name),
        })?;
    let manifest: KilnManifest =
        serde_json::from_value(doc).map_err(|e| ManifestError::Parse {
            name: name.clone(),
            source: map_data_error(e, name),
        })?;
    check_version(&manifest, name)?;
    tracing::debug!(
        manifest = %name,
        nodes = manifest.nodes.len(),
        "parsed manifest"
    );
    Ok(manifest)
}

/// Parse manifest text labelled as [`DEFAULT_MANIFEST`].
///
/// # Errors
///
/// See [`from_str_named`].
pub fn from_str(yaml: &str) -> Result<KilnManifest, ManifestError> {
    from_str_named(yaml, &ManifestName::new(DEFAULT_MANIFEST))
}

/// Load a [`KilnManifest`] from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to parse.
pub fn from_path(path: &Utf8Path) -> Result<KilnManifest> {
    let (dir_path, file_name) = split_path(path)?;
    let dir = Dir::open_ambient_dir(dir_path, ambient_authority())
        .with_context(|| format!("failed to open directory {dir_path}"))?;
    let data = dir
        .read_to_string(file_name)
        .with_context(|| format!("failed to read manifest {path}"))?;
    Ok(from_str_named(&data, &ManifestName::new(path.as_str()))?)
}

fn split_path(path: &Utf8Path) -> Result<(&Utf8Path, &str)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("manifest path {path} has no file name"))?;
    let dir = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    Ok((dir, file_name))
}

fn check_version(manifest: &KilnManifest, name: &ManifestName) -> Result<(), ManifestError> {
    let version = &manifest.kiln_version;
    if version.major == SUPPORTED_MAJOR {
        Ok(())
    } else {
        Err(ManifestError::UnsupportedVersion {
            name: name.clone(),
            version: version.clone(),
            supported: SUPPORTED_VERSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeSpec;
    use anyhow::{Context, ensure};
    use miette::Diagnostic;
    use rstest::rstest;

    #[rstest]
    fn parses_nodes_in_declaration_order() -> Result<()> {
        let manifest = from_str(
            "kiln_version: 1.2.0\n\
             defaults: [lint]\n\
             nodes:\n\
             \x20 - setup: {}\n\
             \x20 - custom:\n\
             \x20     name: lint\n\
             \x20     inputs: [setup-ci]\n",
        )?;
        let names: Vec<&str> = manifest.nodes.iter().map(NodeSpec::name).collect();
        ensure!(names == ["setup-ci", "lint"], "names: {names:?}");
        ensure!(manifest.defaults == ["lint"]);
        Ok(())
    }

    #[rstest]
    #[case("kiln_version: 2.0.0\n")]
    #[case("kiln_version: 0.9.0\n")]
    fn rejects_other_major_versions(#[case] yaml: &str) -> Result<()> {
        let err = from_str(yaml).expect_err("unsupported version");
        ensure!(
            matches!(err, ManifestError::UnsupportedVersion { .. }),
            "unexpected error: {err:?}"
        );
        let code = err.code().map(|c| c.to_string()).context("code")?;
        ensure!(code == "kiln::manifest::version");
        Ok(())
    }

    #[rstest]
    #[case("kiln_version: [\n", "kiln::manifest::yaml")]
    #[case("kiln_version: 1.0.0\nnodes:\n  - docker: {}\n", "kiln::manifest::structure")]
    #[case("nodes: []\n", "kiln::manifest::structure")]
    fn parse_failures_carry_inner_codes(#[case] yaml: &str, #[case] inner: &str) -> Result<()> {
        let err = from_str(yaml).expect_err("parse failure");
        let ManifestError::Parse { source, .. } = &err else {
            anyhow::bail!("expected parse error, got {err:?}");
        };
        let code = source.code().map(|c| c.to_string()).context("inner code")?;
        ensure!(code == inner, "inner code {code}");
        Ok(())
    }

    #[rstest]
    fn from_path_reads_relative_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("Kilnfile"))
            .map_err(|p| anyhow::anyhow!("non UTF-8 path {}", p.display()))?;
        std::fs::write(&path, "kiln_version: 1.0.0\n")?;
        let manifest = from_path(&path)?;
        ensure!(manifest.nodes.is_empty());
        Ok(())
    }

    #[rstest]
    fn from_path_reports_missing_file() {
        let err = from_path(Utf8Path::new("does/not/exist/Kilnfile")).expect_err("missing");
        assert!(err.to_string().contains("does/not/exist"), "{err:#}");
    }
}
