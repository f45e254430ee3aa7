//! Release node.
//!
//! Adds a phony `release-notes` Makefile target and two tag-only Drone steps:
//! one generating the notes after every upstream step with Drone output, one
//! publishing the notes and the configured artifacts as a GitHub release.

use camino::Utf8Path;

use super::{DroneCompiler, MakefileCompiler};
use crate::ast::ReleaseSpec;
use crate::compile::{ContributionError, NodeContext};
use crate::graph::BaseNode;
use crate::graph::predicate::has_drone_output;
use crate::output::drone::{self, Step};
use crate::output::makefile::{self, Target};

/// Name of the release notes target and step.
pub const RELEASE_NOTES: &str = "release-notes";

/// Image publishing GitHub releases.
pub const PUBLISH_IMAGE: &str = "plugins/github-release";

const NOTES_FILE: &str = "RELEASE_NOTES.md";

/// Release notes generation and publishing.
#[derive(Debug, Clone)]
pub struct Release {
    pub(super) base: BaseNode,
    spec: ReleaseSpec,
}

impl Release {
    pub(super) const fn new(base: BaseNode, spec: ReleaseSpec) -> Self {
        Self { base, spec }
    }

    /// Declared configuration.
    #[must_use]
    pub const fn spec(&self) -> &ReleaseSpec {
        &self.spec
    }

    fn artifact_paths(&self, artifacts_path: &str) -> Result<Vec<String>, ContributionError> {
        let root = Utf8Path::new(artifacts_path);
        self.spec
            .artifacts
            .iter()
            .enumerate()
            .map(|(index, pattern)| {
                glob::Pattern::new(pattern).map_err(|err| ContributionError::InvalidConfig {
                    field: format!("artifacts[{index}]"),
                    reason: err.to_string(),
                })?;
                Ok(root.join(pattern).into_string())
            })
            .collect()
    }
}

impl MakefileCompiler for Release {
    fn compile_makefile(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut makefile::Scope<'_>,
    ) -> Result<(), ContributionError> {
        let script = &ctx.project().makefile.release_script;
        output.target(
            Target::new(RELEASE_NOTES)
                .script([
                    "mkdir -p $(ARTIFACTS)".to_owned(),
                    format!(
                        "@ARTIFACTS=$(ARTIFACTS) {script} $@ $(ARTIFACTS)/{NOTES_FILE} $(TAG)"
                    ),
                ])
                .phony(),
        )
    }
}

impl DroneCompiler for Release {
    fn compile_drone(
        &self,
        ctx: &NodeContext<'_>,
        output: &mut drone::Scope<'_>,
    ) -> Result<(), ContributionError> {
        let project = ctx.project();
        let files = self.artifact_paths(&project.artifacts_path)?;
        let note = Utf8Path::new(&project.artifacts_path)
            .join(NOTES_FILE)
            .into_string();

        output.step(
            Step::make(RELEASE_NOTES, &project.ci.image)
                .only_on_tag()
                .depends_on(ctx.direct_matching_input_names(has_drone_output())),
        )?;
        output.step(
            Step::custom(self.base.name(), PUBLISH_IMAGE, Vec::<String>::new())
                .publish_artifacts(note, files)
                .only_on_tag()
                .depends_on([RELEASE_NOTES]),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{
        AliasSpec, CustomSpec, DroneBlock, MakefileBlock, NodeSpec, ReleaseSpec,
    };
    use crate::compile::{Compiler, ContributionError};
    use crate::graph::Graph;
    use crate::project::ProjectOptions;
    use rstest::rstest;

    fn graph(artifacts: Vec<String>) -> Graph {
        let specs = vec![
            NodeSpec::Custom(CustomSpec {
                name: "build".into(),
                drone: DroneBlock {
                    enabled: true,
                    ..DroneBlock::default()
                },
                makefile: MakefileBlock {
                    enabled: true,
                    ..MakefileBlock::default()
                },
                ..CustomSpec::default()
            }),
            NodeSpec::Alias(AliasSpec {
                name: "docs".into(),
                ..AliasSpec::default()
            }),
            NodeSpec::Release(ReleaseSpec {
                inputs: vec!["build".into(), "docs".into()],
                artifacts,
                ..ReleaseSpec::default()
            }),
        ];
        Graph::from_nodes(&specs, &[]).expect("graph")
    }

    #[rstest]
    fn release_steps_are_tag_gated() {
        let graph = graph(vec!["kiln-*".into()]);
        let project = ProjectOptions::default();
        let output = Compiler::new(&graph, &project).drone().expect("drone");
        let pipeline = output.default_pipeline();

        let notes = pipeline.step("release-notes").expect("notes step");
        assert!(notes.is_tag_only());
        assert_eq!(notes.dependencies(), ["build"]);

        let publish = pipeline.step("release").expect("publish step");
        assert!(publish.is_tag_only());
        assert_eq!(publish.dependencies(), ["release-notes"]);
        let text = output.to_string();
        assert!(text.contains("      note: _out/RELEASE_NOTES.md\n"));
        assert!(text.contains("      files:\n        - _out/kiln-*\n"));
    }

    #[rstest]
    fn makefile_target_runs_release_script() {
        let graph = graph(vec!["*".into()]);
        let project = ProjectOptions::default();
        let output = Compiler::new(&graph, &project).makefile().expect("makefile");
        let text = output.to_string();
        assert!(text.contains(concat!(
            ".PHONY: release-notes\n",
            "release-notes:\n",
            "\tmkdir -p $(ARTIFACTS)\n",
            "\t@ARTIFACTS=$(ARTIFACTS) ./hack/release.sh $@ $(ARTIFACTS)/RELEASE_NOTES.md $(TAG)\n",
        )));
    }

    #[rstest]
    fn invalid_artifact_glob_is_a_configuration_error() {
        let graph = graph(vec!["*".into(), "[".into()]);
        let project = ProjectOptions::default();
        let err = Compiler::new(&graph, &project)
            .drone()
            .expect_err("invalid glob");
        assert_eq!(err.node, "release");
        assert!(matches!(
            err.source,
            ContributionError::InvalidConfig { ref field, .. } if field == "artifacts[1]"
        ));
    }
}
