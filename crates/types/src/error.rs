//! Error types for the Shipinator system

use crate::validation::{join_issues, ValidationIssue};
use thiserror::Error;

/// Runtime configuration resolution errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// A configuration source exists but could not be read
    #[error("Failed to read configuration source {source_name}: {message}")]
    Source { source_name: String, message: String },

    /// Malformed content or a value of the wrong type
    #[error("Configuration parse error: {0}")]
    Parse(String),

    /// A merged value is present but not acceptable
    #[error("Configuration validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// A required key is still empty after all layers were merged
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },
}

/// Pipeline document loading errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input is not a well-formed pipeline document, or has unknown fields
    #[error("Pipeline parse error: {0}")]
    Parse(String),

    /// Input is well-formed but breaks one or more structural rules
    #[error("Pipeline validation failed: {}", join_issues(.issues))]
    Validation { issues: Vec<ValidationIssue> },

    /// The pipeline source could not be read
    #[error("Failed to read pipeline source {source_name}: {message}")]
    Source { source_name: String, message: String },
}
