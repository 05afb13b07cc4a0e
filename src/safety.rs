use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Confines job targets to a root directory.
///
/// Patch sets name their targets relative to a project root; the guard
/// resolves those paths and rejects anything that escapes the root through
/// `..` components or symlinks. All paths are explicit inputs; the guard
/// never consults the process working directory.
#[derive(Debug, Clone)]
pub struct RootGuard {
    /// Canonical root directory
    root: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("path escapes root: {path} (root: {root})")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl RootGuard {
    /// Create a guard for the given root, canonicalized so symlinked roots
    /// compare correctly.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    /// Resolve a job target against the root and verify it stays inside.
    ///
    /// Relative paths are joined onto the root. Existing paths are
    /// canonicalized, which catches symlink escapes; a missing target is
    /// normalized lexically instead, since absence is a routine reported
    /// condition and must not turn into an error here.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let resolved = if absolute.exists() {
            absolute.canonicalize()?
        } else {
            normalize(&absolute)
        };

        if !resolved.starts_with(&self.root) {
            return Err(SafetyError::OutsideRoot {
                path: resolved,
                root: self.root.clone(),
            });
        }

        Ok(resolved)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Lexical normalization: drop `.`, resolve `..` against preceding
/// components. Only used for paths that do not exist on disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}
