//! Patch set configuration: TOML schema, validation and loading.

mod loader;
mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError, Origin};
pub use schema::{
    JobSpec, MatcherSpec, Metadata, PatchSet, RuleSpec, ValidationError, ValidationIssue,
};
