//! Pipeline document validation
//!
//! Records carrying a discriminator (`type` on build outputs and test
//! artifacts, `artifact` on deploy) are checked by one generic routine driven
//! by a [`Rule`] table per record. Supporting a new kind means adding the enum
//! variant and one table row.

use crate::schema::{
    ArtifactKind, BuildOutput, BuildSpec, DeploySpec, PipelineDocument, ReportKind, TestArtifact,
    TestSpec,
};
use types::ValidationReport;

/// A closed set of values a discriminator field may take
pub trait DiscriminatorValue: Copy + 'static {
    fn as_str(&self) -> &'static str;
}

impl DiscriminatorValue for ArtifactKind {
    fn as_str(&self) -> &'static str {
        ArtifactKind::as_str(self)
    }
}

impl DiscriminatorValue for ReportKind {
    fn as_str(&self) -> &'static str {
        ReportKind::as_str(self)
    }
}

/// Sibling fields that become mandatory for one discriminator value
#[derive(Debug)]
pub struct Rule<K: 'static> {
    pub kind: K,
    pub requires: &'static [&'static str],
}

pub const BUILD_OUTPUT_RULES: &[Rule<ArtifactKind>] = &[
    Rule { kind: ArtifactKind::Binary, requires: &["path"] },
    Rule { kind: ArtifactKind::OciImage, requires: &["ref"] },
    Rule { kind: ArtifactKind::HelmChart, requires: &["path"] },
];

pub const TEST_ARTIFACT_RULES: &[Rule<ReportKind>] = &[
    Rule { kind: ReportKind::Coverage, requires: &[] },
    Rule { kind: ReportKind::TestReport, requires: &[] },
];

pub const DEPLOY_ARTIFACT_RULES: &[Rule<ArtifactKind>] = &[
    Rule { kind: ArtifactKind::Binary, requires: &[] },
    Rule { kind: ArtifactKind::OciImage, requires: &[] },
    Rule { kind: ArtifactKind::HelmChart, requires: &[] },
];

/// A record whose tag field decides which sibling fields apply
pub trait Discriminated {
    type Kind: DiscriminatorValue;

    /// Name of the tag field as written in the document
    const TAG: &'static str;
    const RULES: &'static [Rule<Self::Kind>];
    /// Fields required whatever the tag says
    const REQUIRED: &'static [&'static str];
    /// Fields whose required-ness depends on the tag
    const SIBLINGS: &'static [&'static str];

    /// Raw tag value
    fn tag(&self) -> &str;

    fn field(&self, name: &str) -> Option<&str>;

    fn rule(&self) -> Option<&'static Rule<Self::Kind>> {
        Self::RULES
            .iter()
            .find(|rule| rule.kind.as_str() == self.tag())
    }

    /// Typed tag, `None` when the value is outside the enumeration
    fn typed_kind(&self) -> Option<Self::Kind> {
        self.rule().map(|rule| rule.kind)
    }
}

impl Discriminated for BuildOutput {
    type Kind = ArtifactKind;

    const TAG: &'static str = "type";
    const RULES: &'static [Rule<ArtifactKind>] = BUILD_OUTPUT_RULES;
    const REQUIRED: &'static [&'static str] = &[];
    const SIBLINGS: &'static [&'static str] = &["path", "ref"];

    fn tag(&self) -> &str {
        &self.kind
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "path" => self.path.as_deref(),
            "ref" => self.reference.as_deref(),
            _ => None,
        }
    }
}

impl Discriminated for TestArtifact {
    type Kind = ReportKind;

    const TAG: &'static str = "type";
    const RULES: &'static [Rule<ReportKind>] = TEST_ARTIFACT_RULES;
    const REQUIRED: &'static [&'static str] = &["path"];
    const SIBLINGS: &'static [&'static str] = &[];

    fn tag(&self) -> &str {
        &self.kind
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "path" => Some(&self.path),
            _ => None,
        }
    }
}

impl Discriminated for DeploySpec {
    type Kind = ArtifactKind;

    const TAG: &'static str = "artifact";
    const RULES: &'static [Rule<ArtifactKind>] = DEPLOY_ARTIFACT_RULES;
    const REQUIRED: &'static [&'static str] = &["target", "namespace"];
    const SIBLINGS: &'static [&'static str] = &[];

    fn tag(&self) -> &str {
        &self.artifact
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "target" => Some(&self.target),
            "namespace" => Some(&self.namespace),
            _ => None,
        }
    }
}

/// Pipeline document validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a parsed document, collecting every issue with its field path
    pub fn validate(doc: &PipelineDocument) -> ValidationReport {
        let mut report = ValidationReport::new();

        if doc.build.is_none() && doc.test.is_none() && doc.deploy.is_none() {
            report.add_error(
                "pipeline",
                "must define at least one of: build, test, deploy",
            );
            return report;
        }

        if let Some(build) = &doc.build {
            Self::validate_build(build, &mut report);
        }

        if let Some(test) = &doc.test {
            Self::validate_test(test, &mut report);
        }

        if let Some(deploy) = &doc.deploy {
            check_discriminated(deploy, "deploy", &mut report);
        }

        report
    }

    fn validate_build(build: &BuildSpec, report: &mut ValidationReport) {
        if build.steps.is_empty() {
            report.add_error("build.steps", "must contain at least one step");
        }

        for (i, step) in build.steps.iter().enumerate() {
            let path = format!("build.steps[{}]", i);
            require_non_empty(&step.name, &format!("{}.name", path), report);
            require_non_empty(&step.run, &format!("{}.run", path), report);

            for (j, output) in step.outputs.iter().enumerate() {
                check_discriminated(output, &format!("{}.outputs[{}]", path, j), report);
            }
        }
    }

    fn validate_test(test: &TestSpec, report: &mut ValidationReport) {
        if test.steps.is_empty() {
            report.add_error("test.steps", "must contain at least one step");
        }

        for (i, step) in test.steps.iter().enumerate() {
            let path = format!("test.steps[{}]", i);
            require_non_empty(&step.name, &format!("{}.name", path), report);
            require_non_empty(&step.run, &format!("{}.run", path), report);

            for (j, artifact) in step.artifacts.iter().enumerate() {
                check_discriminated(artifact, &format!("{}.artifacts[{}]", path, j), report);
            }
        }
    }
}

fn require_non_empty(value: &str, field: &str, report: &mut ValidationReport) {
    if value.is_empty() {
        report.add_error(field, "is required");
    }
}

fn check_discriminated<T: Discriminated>(item: &T, path: &str, report: &mut ValidationReport) {
    for field in T::REQUIRED {
        require_non_empty(
            item.field(field).unwrap_or_default(),
            &format!("{}.{}", path, field),
            report,
        );
    }

    let tag_path = format!("{}.{}", path, T::TAG);
    if item.tag().is_empty() {
        report.add_error(&tag_path, "is required");
        return;
    }

    // Sibling rules only make sense once the tag is known.
    let Some(rule) = item.rule() else {
        let allowed: Vec<&str> = T::RULES.iter().map(|rule| rule.kind.as_str()).collect();
        report.add_error(
            &tag_path,
            &format!("must be one of {} (got \"{}\")", allowed.join(", "), item.tag()),
        );
        return;
    };

    for field in T::SIBLINGS {
        let present = item.field(field).is_some_and(|value| !value.is_empty());
        let field_path = format!("{}.{}", path, field);

        if rule.requires.contains(field) {
            if !present {
                report.add_error(
                    &field_path,
                    &format!("is required when {} is {}", T::TAG, rule.kind.as_str()),
                );
            }
        } else if present {
            report.add_warning(
                &field_path,
                &format!("is ignored when {} is {}", T::TAG, rule.kind.as_str()),
            );
        }
    }
}
