//! Pipeline document loader implementation

use crate::schema::PipelineDocument;
use crate::validation::PipelineValidator;
use serde_yaml::Value;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};
use types::PipelineError;

/// Conventional pipeline file name at a repository root
pub const PIPELINE_FILE_NAME: &str = ".shipinator.yaml";

/// Loader that parses and validates pipeline documents
pub struct PipelineLoader;

impl PipelineLoader {
    /// Read a document from `reader`, then parse and validate it
    pub fn load<R: Read>(mut reader: R) -> Result<PipelineDocument, PipelineError> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| PipelineError::Source {
                source_name: "reader".to_string(),
                message: e.to_string(),
            })?;

        Self::load_from_str(&content)
    }

    /// Read and load the pipeline file at `path`
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<PipelineDocument, PipelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Source {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;

        debug!(path = %path.display(), "Loaded pipeline file");
        Self::load_from_str(&content)
    }

    /// Parse and validate a document held in memory
    pub fn load_from_str(content: &str) -> Result<PipelineDocument, PipelineError> {
        let doc = Self::parse(content)?;

        let report = PipelineValidator::validate(&doc);
        for issue in &report.warnings {
            warn!(field = %issue.field, "Pipeline field {}", issue.message);
        }

        if report.has_errors() {
            return Err(PipelineError::Validation {
                issues: report.errors,
            });
        }

        Ok(doc)
    }

    /// Deserialize a document without validating it.
    ///
    /// Rejects empty input, non-mapping documents, unknown fields and values
    /// of the wrong type.
    pub fn parse(content: &str) -> Result<PipelineDocument, PipelineError> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| PipelineError::Parse(e.to_string()))?;

        match value {
            Value::Mapping(_) => {}
            Value::Null => return Err(PipelineError::Parse("document is empty".to_string())),
            _ => {
                return Err(PipelineError::Parse(
                    "expected a mapping at the top level".to_string(),
                ))
            }
        }

        // Deserialize from the text again so errors keep their line and column.
        serde_yaml::from_str(content).map_err(|e| PipelineError::Parse(e.to_string()))
    }
}
