use crate::config::schema::{PatchSet, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a patch set came from, for error messages.
#[derive(Debug, Clone)]
pub enum Origin {
    /// Parsed from an in-memory string
    Inline,
    /// Loaded from a file on disk
    File(PathBuf),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Inline => write!(f, "inline patch set"),
            Origin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read patch set from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: Origin,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid patch set ({origin}): {source}")]
    Invalid {
        origin: Origin,
        #[source]
        source: ValidationError,
    },
}

fn parse(input: &str, origin: Origin) -> Result<PatchSet, ConfigError> {
    let set: PatchSet = toml_edit::de::from_str(input).map_err(|source| ConfigError::Parse {
        origin: origin.clone(),
        source,
    })?;
    set.validate()
        .map_err(|source| ConfigError::Invalid { origin, source })?;
    Ok(set)
}

pub fn load_from_str(input: &str) -> Result<PatchSet, ConfigError> {
    parse(input, Origin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchSet, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, Origin::File(path.to_path_buf()))
}
