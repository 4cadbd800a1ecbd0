//! Pipeline definition schema for Shipinator
//!
//! Parses `.shipinator.yaml` build/test/deploy documents and enforces the
//! structural and discriminator-dependent rules before any consumer sees them.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{PipelineLoader, PIPELINE_FILE_NAME};
pub use schema::*;
pub use validation::{Discriminated, DiscriminatorValue, PipelineValidator, Rule};
