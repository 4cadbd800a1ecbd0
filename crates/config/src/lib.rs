//! Runtime configuration for the Shipinator service
//!
//! Resolves a single [`RuntimeConfig`] from built-in defaults, an optional
//! YAML file and `SHIPINATOR_*` environment variables, in that order of
//! precedence.

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::{EnvOverrides, ENV_BINDINGS, ENV_PREFIX};
pub use loader::ConfigLoader;
pub use schema::*;
pub use validation::*;
