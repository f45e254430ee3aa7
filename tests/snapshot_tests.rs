//! Snapshot tests of generated artifacts.
//!
//! The manifest under `tests/data/project.yml` exercises every node kind;
//! its Makefile and Dockerfile are pinned with `insta`.

use anyhow::{Context, Result};
use insta::assert_snapshot;
use kiln::compile::{Backend, Compiler};
use kiln::graph::Graph;
use kiln::manifest;
use rstest::{fixture, rstest};

const PROJECT: &str = include_str!("data/project.yml");

struct Project {
    manifest: kiln::ast::KilnManifest,
    graph: Graph,
}

impl Project {
    fn render(&self, backend: Backend) -> Result<String> {
        let artifact = Compiler::new(&self.graph, &self.manifest.project).compile(backend)?;
        Ok(artifact.contents)
    }
}

#[fixture]
fn project() -> Project {
    let manifest = manifest::from_str(PROJECT).expect("parse project manifest");
    let graph = Graph::from_manifest(&manifest).expect("build project graph");
    Project { manifest, graph }
}

#[rstest]
fn project_makefile(project: Project) -> Result<()> {
    let makefile = project.render(Backend::Makefile).context("makefile")?;
    assert_snapshot!("project_makefile", makefile);
    Ok(())
}

#[rstest]
fn project_dockerfile(project: Project) -> Result<()> {
    let dockerfile = project.render(Backend::Dockerfile).context("dockerfile")?;
    assert_snapshot!("project_dockerfile", dockerfile);
    Ok(())
}

#[rstest]
fn project_drone_pipelines(project: Project) -> Result<()> {
    let drone = project.render(Backend::Drone).context("drone")?;
    let documents: Vec<&str> = drone.split("---\n").filter(|d| !d.is_empty()).collect();
    anyhow::ensure!(documents.len() == 2, "documents: {}", documents.len());
    anyhow::ensure!(drone.starts_with("---\nkind: pipeline\ntype: kubernetes\nname: default\n"));
    anyhow::ensure!(drone.contains("\nname: nightly\n"));
    anyhow::ensure!(drone.contains(
        "  - name: load-artifacts\n\
         \x20   image: autonomy/build-container:latest\n\
         \x20   commands:\n\
         \x20     - s3cmd --host=rook-ceph-rgw-ci-store.rook-ceph.svc \
         --host-bucket=rook-ceph-rgw-ci-store.rook-ceph.svc --no-ssl --stats sync \
         s3://${CI_COMMIT_SHA}${DRONE_TAG//./-} .\n\
         \x20   environment:\n\
         \x20     AWS_ACCESS_KEY_ID:\n\
         \x20       from_secret: rook_access_key_id\n"
    ));
    anyhow::ensure!(drone.contains(
        "  - name: release\n\
         \x20   image: plugins/github-release\n\
         \x20   settings:\n"
    ));
    Ok(())
}

#[rstest]
fn project_conform_policy(project: Project) -> Result<()> {
    let policy = project.render(Backend::Conform).context("conform")?;
    anyhow::ensure!(policy.starts_with("policies:\n- type: commit\n"));
    anyhow::ensure!(policy.contains("// This Source Code Form is subject to the terms"));
    Ok(())
}
