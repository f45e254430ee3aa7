//! End-to-end compilation of manifests into backend artifacts.
//!
//! Each test parses a manifest from YAML, builds the project graph and runs
//! the backend passes through the public API.

use anyhow::{Context, Result, ensure};
use kiln::ast::KilnManifest;
use kiln::compile::{Backend, CompileError, Compiler, ContributionError};
use kiln::graph::Graph;
use kiln::manifest;
use kiln::output::drone;
use rstest::rstest;

fn load(yaml: &str) -> Result<(KilnManifest, Graph)> {
    let manifest = manifest::from_str(yaml).context("parse manifest")?;
    let graph = Graph::from_manifest(&manifest).context("build graph")?;
    Ok((manifest, graph))
}

fn drone_output(manifest: &KilnManifest, graph: &Graph) -> Result<drone::Output> {
    Ok(Compiler::new(graph, &manifest.project).drone()?)
}

fn step_names(pipeline: &drone::Pipeline) -> Vec<&str> {
    pipeline.steps().map(drone::Step::name).collect()
}

#[rstest]
fn makefile_prerequisites_follow_inputs_and_drone_skips_make_only_nodes() -> Result<()> {
    let (manifest, graph) = load(
        r"
kiln_version: 1.0.0
nodes:
  - custom:
      name: a
      makefile: { enabled: true, script: ['@echo a'] }
      drone: { enabled: true }
  - custom:
      name: b
      inputs: [a]
      makefile: { enabled: true, script: ['@echo b'] }
",
    )?;
    let compiler = Compiler::new(&graph, &manifest.project);
    let makefile = compiler.compile(Backend::Makefile)?.contents;
    ensure!(makefile.contains("\na:\n\t@echo a\n"), "makefile:\n{makefile}");
    ensure!(makefile.contains("\nb: a\n\t@echo b\n"), "makefile:\n{makefile}");

    let drone = compiler.drone()?;
    ensure!(step_names(drone.default_pipeline()) == ["a"]);
    ensure!(drone.pipeline("nightly").is_none());
    Ok(())
}

const NAMED_PIPELINES: &str = r"
kiln_version: 1.0.0
nodes:
  - setup:
      commands: [make tools]
  - custom:
      name: integration
      inputs: [setup-ci]
      drone:
        enabled: true
        environment: { MODE: fast }
        pipelines:
          - name: nightly
            crons: [nightly]
            environment_override: { MODE: full }
          - name: release
            triggers: [release]
";

#[rstest]
fn named_pipelines_replay_base_steps_and_restore_artifacts() -> Result<()> {
    let (manifest, graph) = load(NAMED_PIPELINES)?;
    let drone = drone_output(&manifest, &graph)?;

    let default = drone.default_pipeline();
    ensure!(
        step_names(default) == ["setup-ci", "integration", "save-artifacts"],
        "default steps: {:?}",
        step_names(default)
    );
    let save = default.step("save-artifacts").context("save step")?;
    ensure!(save.dependencies() == ["integration"]);

    for name in ["nightly", "release"] {
        let pipeline = drone.pipeline(name).context("named pipeline")?;
        ensure!(
            step_names(pipeline) == ["setup-ci", "load-artifacts", "integration"],
            "{name} steps: {:?}",
            step_names(pipeline)
        );
        let load_step = pipeline.step("load-artifacts").context("load step")?;
        ensure!(load_step.dependencies() == ["setup-ci"]);
        let own = pipeline.step("integration").context("own step")?;
        ensure!(own.dependencies() == ["load-artifacts"]);
    }

    let nightly = drone.pipeline("nightly").context("nightly")?;
    let mode = nightly
        .step("integration")
        .and_then(|step| step.env("MODE"))
        .context("MODE")?;
    ensure!(*mode == drone::EnvValue::Plain("full".into()));
    let release_mode = drone
        .pipeline("release")
        .and_then(|pipeline| pipeline.step("integration"))
        .and_then(|step| step.env("MODE"))
        .context("release MODE")?;
    ensure!(*release_mode == drone::EnvValue::Plain("fast".into()));

    let text = drone.to_string();
    ensure!(text.contains("trigger:\n  cron:\n    include:\n      - nightly\n"), "{text}");
    ensure!(text.contains("trigger:\n  target:\n    include:\n      - release\n"), "{text}");
    Ok(())
}

#[rstest]
fn conflicting_variable_defaults_name_both_nodes() -> Result<()> {
    let (manifest, graph) = load(
        r"
kiln_version: 1.0.0
nodes:
  - custom:
      name: fmt
      makefile:
        enabled: true
        variables: [{ name: RUST_VERSION, default_value: '1.89' }]
  - custom:
      name: clippy
      makefile:
        enabled: true
        variables: [{ name: RUST_VERSION, default_value: '1.88' }]
",
    )?;
    let err = Compiler::new(&graph, &manifest.project)
        .compile(Backend::Makefile)
        .expect_err("variable conflict");
    ensure!(err.node == "clippy");
    let ContributionError::VariableConflict { name, first, second, .. } = &err.source else {
        anyhow::bail!("unexpected error: {err:?}");
    };
    ensure!(name == "RUST_VERSION");
    ensure!(first == "fmt" && second == "clippy");
    Ok(())
}

#[rstest]
fn identical_variable_declarations_are_merged() -> Result<()> {
    let (manifest, graph) = load(
        r"
kiln_version: 1.0.0
nodes:
  - custom:
      name: fmt
      makefile:
        enabled: true
        variables: [{ name: RUST_VERSION, default_value: '1.89' }]
  - custom:
      name: clippy
      makefile:
        enabled: true
        variables: [{ name: RUST_VERSION, default_value: '1.89' }]
",
    )?;
    let text = Compiler::new(&graph, &manifest.project)
        .compile(Backend::Makefile)?
        .contents;
    ensure!(text.matches("RUST_VERSION ?= 1.89").count() == 1, "{text}");
    Ok(())
}

#[rstest]
fn stages_default_to_scratch_and_copy_from_context() -> Result<()> {
    let (manifest, graph) = load(
        r"
kiln_version: 1.0.0
nodes:
  - custom:
      name: image
      docker:
        enabled: true
        stages:
          - name: sources
            steps:
              - copy: { src: ./src, dst: /src }
",
    )?;
    let text = Compiler::new(&graph, &manifest.project)
        .compile(Backend::Dockerfile)?
        .contents;
    ensure!(
        text.ends_with("\nFROM scratch AS sources\nCOPY ./src /src\n"),
        "dockerfile:\n{text}"
    );
    Ok(())
}

#[rstest]
fn release_steps_are_tag_gated_without_extra_prerequisites() -> Result<()> {
    let (manifest, graph) = load(
        r"
kiln_version: 1.0.0
nodes:
  - custom:
      name: build
      drone: { enabled: true }
  - release:
      inputs: [build]
      artifacts: ['kiln-*']
",
    )?;
    let compiler = Compiler::new(&graph, &manifest.project);
    let drone = compiler.drone()?;
    let default = drone.default_pipeline();
    let notes = default.step("release-notes").context("notes step")?;
    let publish = default.step("release").context("publish step")?;
    ensure!(notes.is_tag_only() && publish.is_tag_only());
    ensure!(notes.dependencies() == ["build"]);
    ensure!(publish.dependencies() == ["release-notes"]);
    ensure!(!default.step("build").context("build step")?.is_tag_only());

    let makefile = compiler.compile(Backend::Makefile)?.contents;
    ensure!(makefile.contains("\n.PHONY: release-notes\nrelease-notes:\n"), "{makefile}");
    ensure!(!makefile.contains("\nall:"), "no defaults were declared:\n{makefile}");
    ensure!(drone.to_string().contains("      - _out/kiln-*\n"));
    Ok(())
}

#[rstest]
fn a_failing_backend_leaves_the_others_intact() -> Result<()> {
    let (manifest, graph) = load(
        r"
kiln_version: 1.0.0
nodes:
  - custom:
      name: image
      makefile: { enabled: true }
      drone: { enabled: true }
      docker:
        enabled: true
        stages:
          - name: out
            steps:
              - copy: { from: out, src: /a, dst: /b }
",
    )?;
    let results = Compiler::new(&graph, &manifest.project).compile_all();
    ensure!(results.len() == Backend::ALL.len());
    let failures: Vec<&CompileError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    ensure!(failures.len() == 1, "failures: {failures:?}");
    let failure = failures.first().context("one failure")?;
    ensure!(failure.backend == Backend::Dockerfile);
    ensure!(matches!(
        &failure.source,
        ContributionError::InvalidConfig { field, .. } if field == "docker.stages[0].steps[0].copy.from"
    ));
    for artifact in results.iter().filter_map(|r| r.as_ref().ok()) {
        match artifact.backend {
            Backend::Makefile | Backend::Drone => ensure!(!artifact.empty),
            Backend::Conform => ensure!(artifact.empty),
            Backend::Dockerfile => anyhow::bail!("dockerfile should have failed"),
        }
    }
    Ok(())
}

#[rstest]
fn a_shared_pipeline_is_reused_but_artifact_loading_collides() -> Result<()> {
    let (manifest, graph) = load(
        r"
kiln_version: 1.0.0
nodes:
  - setup: {}
  - custom:
      name: unit
      inputs: [setup-ci]
      drone:
        enabled: true
        pipelines: [{ name: nightly, crons: [nightly] }]
  - custom:
      name: e2e
      inputs: [setup-ci]
      drone:
        enabled: true
        pipelines: [{ name: nightly, crons: [nightly] }]
",
    )?;
    let err = drone_output(&manifest, &graph).expect_err("collision");
    let err = err
        .downcast::<CompileError>()
        .map_err(|e| anyhow::anyhow!("unexpected error: {e}"))?;
    ensure!(err.node == "e2e");
    ensure!(
        err.source.to_string() == "step `load-artifacts` is declared by both `unit` and `e2e`",
        "message: {}",
        err.source
    );
    Ok(())
}

#[rstest]
fn pipeline_trigger_mismatch_is_reported() -> Result<()> {
    let (manifest, graph) = load(
        r"
kiln_version: 1.0.0
nodes:
  - custom:
      name: unit
      drone:
        enabled: true
        pipelines: [{ name: nightly, crons: [nightly] }]
  - custom:
      name: e2e
      drone:
        enabled: true
        pipelines: [{ name: nightly, crons: [weekly] }]
",
    )?;
    let err = Compiler::new(&graph, &manifest.project)
        .drone()
        .expect_err("mismatch");
    ensure!(matches!(err.source, ContributionError::PipelineMismatch { .. }));
    Ok(())
}

#[rstest]
fn compilation_is_deterministic() -> Result<()> {
    let render = || -> Result<Vec<String>> {
        let (manifest, graph) = load(NAMED_PIPELINES)?;
        let contents = Compiler::new(&graph, &manifest.project)
            .compile_all()
            .into_iter()
            .map(|result| result.map(|artifact| artifact.contents))
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(contents)
    };
    ensure!(render()? == render()?);
    Ok(())
}

#[rstest]
#[case("kiln_version: 1.0.0\nnodes: [{ alias: { name: all } }]\n")]
#[case("kiln_version: 1.0.0\nnodes: [{ custom: { name: default, drone: { enabled: true, pipelines: [{ name: default }] } } }]\n")]
fn reserved_names_are_rejected(#[case] yaml: &str) -> Result<()> {
    let (manifest, graph) = load(yaml)?;
    let failures: Vec<CompileError> = Compiler::new(&graph, &manifest.project)
        .compile_all()
        .into_iter()
        .filter_map(Result::err)
        .collect();
    ensure!(
        failures
            .iter()
            .all(|err| matches!(err.source, ContributionError::ReservedName { .. })),
        "failures: {failures:?}"
    );
    ensure!(failures.len() == 1);
    Ok(())
}

#[rstest]
#[case::setup("defaults: [setup-ci]\nnodes: [{ setup: {} }]\n")]
#[case::conform("defaults: [conform]\nnodes: [{ conform: {} }]\n")]
#[case::makefile_disabled(
    "defaults: [image]\nnodes: [{ custom: { name: image, drone: { enabled: true } } }]\n"
)]
#[case::target_named_differently("defaults: [release]\nnodes: [{ release: {} }]\n")]
fn defaults_without_a_makefile_target_are_rejected(#[case] body: &str) -> Result<()> {
    let (manifest, graph) = load(&format!("kiln_version: 1.0.0\n{body}"))?;
    let err = Compiler::new(&graph, &manifest.project)
        .compile(Backend::Makefile)
        .expect_err("default without a target");
    ensure!(err.node == "project", "node: {}", err.node);
    ensure!(
        matches!(
            &err.source,
            ContributionError::InvalidConfig { field, .. } if field == "defaults[0]"
        ),
        "unexpected error: {err:?}"
    );
    Ok(())
}
