//! Shared types for the Shipinator system
//!
//! This crate contains the error taxonomy and validation report types shared by
//! the pipeline schema, the runtime configuration resolver and the server.

pub mod error;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use error::{ConfigError, PipelineError};
pub use validation::{ValidationIssue, ValidationReport};
