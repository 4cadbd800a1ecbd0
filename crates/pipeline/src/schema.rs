//! Pipeline document schema definitions
//!
//! Every struct rejects unknown fields. Required strings default to empty so a
//! missing value surfaces as a validation issue with its field path rather
//! than as a parse error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root of a pipeline document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDocument {
    /// Build stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    /// Test stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<TestSpec>,
    /// Deploy stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeploySpec>,
}

/// Ordered build steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSpec {
    #[serde(default)]
    pub steps: Vec<BuildStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildStep {
    #[serde(default)]
    pub name: String,
    /// Shell command for the step
    #[serde(default)]
    pub run: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<BuildOutput>,
}

/// Something a build step produces, tagged by `type`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildOutput {
    /// One of `binary`, `oci_image`, `helm_chart`
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Filesystem path, for binaries and helm charts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Image reference, for OCI images
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Ordered test steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSpec {
    #[serde(default)]
    pub steps: Vec<TestStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestStep {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub run: String,
    /// Hint for an executor; not enforced here
    #[serde(default)]
    pub parallel: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<TestArtifact>,
}

/// A report file produced by a test step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestArtifact {
    /// One of `coverage`, `test_report`
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub path: String,
}

/// Where and what to deploy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploySpec {
    /// Which build output kind this deploy consumes
    #[serde(default)]
    pub artifact: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub namespace: String,
}

/// Kinds of build output, also used to select a deploy artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Binary,
    OciImage,
    HelmChart,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Binary => "binary",
            ArtifactKind::OciImage => "oci_image",
            ArtifactKind::HelmChart => "helm_chart",
        }
    }
}

/// Kinds of test artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Coverage,
    TestReport,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Coverage => "coverage",
            ReportKind::TestReport => "test_report",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PipelineDocument {
    /// Names of the stages this document defines, in execution order
    pub fn stages(&self) -> Vec<&'static str> {
        let mut stages = Vec::new();
        if self.build.is_some() {
            stages.push("build");
        }
        if self.test.is_some() {
            stages.push("test");
        }
        if self.deploy.is_some() {
            stages.push("deploy");
        }
        stages
    }
}
