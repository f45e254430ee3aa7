//! Project-wide options shared by every node.
//!
//! Options live under the optional `project` key of the manifest. Every field
//! has a default, so a manifest only spells out what it changes:
//!
//! ```yaml
//! project:
//!   artifacts_path: dist
//!   ci:
//!     artifact_store:
//!       endpoint: minio.ci.svc
//! ```
//!
//! The artifact store commands are opaque templates rendered with `MiniJinja`.
//! They receive `endpoint`, `key`, `path` and `expiry_days`; the defaults
//! drive `s3cmd` against an in-cluster object store keyed by commit and tag.

use indexmap::IndexMap;
use minijinja::{Environment, UndefinedBehavior, context};
use serde::{Deserialize, Serialize};

/// Options under the manifest `project` key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectOptions {
    /// Directory receiving build artifacts, exposed as `$(ARTIFACTS)`.
    pub artifacts_path: String,
    /// Drone pipeline options.
    pub ci: CiOptions,
    /// Dockerfile options.
    pub dockerfile: DockerfileOptions,
    /// Makefile options.
    pub makefile: MakefileOptions,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            artifacts_path: "_out".to_owned(),
            ci: CiOptions::default(),
            dockerfile: DockerfileOptions::default(),
            makefile: MakefileOptions::default(),
        }
    }
}

/// Drone pipeline options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CiOptions {
    /// Image running `make` steps.
    pub image: String,
    /// Value of the pipeline `type` key.
    pub pipeline_type: String,
    /// Object store sharing artifacts between pipelines.
    pub artifact_store: ArtifactStore,
}

impl Default for CiOptions {
    fn default() -> Self {
        Self {
            image: "autonomy/build-container:latest".to_owned(),
            pipeline_type: "kubernetes".to_owned(),
            artifact_store: ArtifactStore::default(),
        }
    }
}

/// Dockerfile options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DockerfileOptions {
    /// Frontend announced in the `# syntax =` header; omitted when `None`.
    pub syntax: Option<String>,
}

impl Default for DockerfileOptions {
    fn default() -> Self {
        Self {
            syntax: Some("docker/dockerfile-upstream:1.7.0-labs".to_owned()),
        }
    }
}

/// Makefile options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MakefileOptions {
    /// Script generating release notes.
    pub release_script: String,
    /// Default value of the overridable `TAG` variable.
    pub tag: String,
}

impl Default for MakefileOptions {
    fn default() -> Self {
        Self {
            release_script: "./hack/release.sh".to_owned(),
            tag: "$(shell git describe --tag --always --dirty)".to_owned(),
        }
    }
}

/// External object store shared by the default and named pipelines.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactStore {
    /// Store host.
    pub endpoint: String,
    /// Shell expression naming the bucket for the current build.
    pub key: String,
    /// Days before saved artifacts expire.
    pub expiry_days: u32,
    /// Environment variables filled from CI secrets, `NAME: secret`.
    pub credentials: IndexMap<String, String>,
    /// Command templates restoring artifacts into the workspace.
    pub load: Vec<String>,
    /// Command templates persisting artifacts from `path`.
    pub save: Vec<String>,
}

const S3CMD: &str = "s3cmd --host={{ endpoint }} --host-bucket={{ endpoint }} --no-ssl";

impl Default for ArtifactStore {
    fn default() -> Self {
        Self {
            endpoint: "rook-ceph-rgw-ci-store.rook-ceph.svc".to_owned(),
            key: "${CI_COMMIT_SHA}${DRONE_TAG//./-}".to_owned(),
            expiry_days: 3,
            credentials: IndexMap::from([
                ("AWS_ACCESS_KEY_ID".to_owned(), "rook_access_key_id".to_owned()),
                (
                    "AWS_SECRET_ACCESS_KEY".to_owned(),
                    "rook_secret_access_key".to_owned(),
                ),
            ]),
            load: vec![format!("{S3CMD} --stats sync s3://{{{{ key }}}} .")],
            save: vec![
                format!("{S3CMD} mb s3://{{{{ key }}}}"),
                format!("{S3CMD} expire s3://{{{{ key }}}} --expiry-days={{{{ expiry_days }}}}"),
                format!("{S3CMD} --stats sync {{{{ path }}}} s3://{{{{ key }}}}"),
            ],
        }
    }
}

impl ArtifactStore {
    /// Render the commands restoring artifacts into the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse or references an
    /// unknown variable.
    pub fn load_commands(&self, path: &str) -> Result<Vec<String>, minijinja::Error> {
        self.render(&self.load, path)
    }

    /// Render the commands persisting artifacts found under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse or references an
    /// unknown variable.
    pub fn save_commands(&self, path: &str) -> Result<Vec<String>, minijinja::Error> {
        self.render(&self.save, path)
    }

    fn render(&self, templates: &[String], path: &str) -> Result<Vec<String>, minijinja::Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        let ctx = context! {
            endpoint => &self.endpoint,
            key => &self.key,
            path => path,
            expiry_days => self.expiry_days,
        };
        templates
            .iter()
            .map(|template| env.render_str(template, &ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_store_renders_s3cmd_commands() {
        let store = ArtifactStore::default();
        let load = store.load_commands("_out").expect("load commands");
        assert_eq!(
            load,
            ["s3cmd --host=rook-ceph-rgw-ci-store.rook-ceph.svc --host-bucket=rook-ceph-rgw-ci-store.rook-ceph.svc --no-ssl --stats sync s3://${CI_COMMIT_SHA}${DRONE_TAG//./-} ."]
        );
        let save = store.save_commands("_out").expect("save commands");
        assert_eq!(save.len(), 3);
        assert!(save.iter().any(|cmd| cmd.ends_with("expire s3://${CI_COMMIT_SHA}${DRONE_TAG//./-} --expiry-days=3")));
        assert!(save.iter().any(|cmd| cmd.ends_with("--stats sync _out s3://${CI_COMMIT_SHA}${DRONE_TAG//./-}")));
    }

    #[rstest]
    fn custom_templates_receive_store_variables() {
        let store = ArtifactStore {
            endpoint: "minio".into(),
            key: "build-1".into(),
            load: vec!["mc cp --recursive {{ endpoint }}/{{ key }} .".into()],
            ..ArtifactStore::default()
        };
        assert_eq!(
            store.load_commands("dist").expect("render"),
            ["mc cp --recursive minio/build-1 ."]
        );
    }

    #[rstest]
    fn unknown_template_variable_is_an_error() {
        let store = ArtifactStore {
            save: vec!["upload {{ bucket }}".into()],
            ..ArtifactStore::default()
        };
        assert!(store.save_commands("dist").is_err());
    }
}
