use crate::rule::{apply_rules, PatchRule, RuleError};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// One target file plus the ordered rule chain to fold over its content.
///
/// A job is constructed once, applied exactly once, and owns its target for
/// the duration of the pass; no two jobs in a batch mutate the same file.
#[derive(Debug, Clone)]
#[must_use = "PatchJob does nothing until apply() is called"]
pub struct PatchJob {
    /// Target file (explicit path, no implicit working-directory state)
    pub path: PathBuf,
    /// Rules applied in declared order; each sees the previous rule's output
    pub rules: Vec<PatchRule>,
    /// Re-run the chain over the patched content and reject rule sets that
    /// re-trigger on their own output. On by default.
    pub verify_idempotent: bool,
}

impl PatchJob {
    pub fn new(path: impl Into<PathBuf>, rules: Vec<PatchRule>) -> Self {
        Self {
            path: path.into(),
            rules,
            verify_idempotent: true,
        }
    }

    /// Skip the second-pass idempotence check. Intended for rule sets that
    /// are known-stable but expensive to re-run over very large files.
    pub fn without_idempotence_check(mut self) -> Self {
        self.verify_idempotent = false;
        self
    }
}

/// Outcome of applying a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for changed/unchanged/missing"]
pub enum PatchResult {
    /// Final content differed byte-for-byte from the original; the file was
    /// atomically rewritten. Hashes are xxh3 fingerprints of the before and
    /// after content, for audit output.
    Changed {
        path: PathBuf,
        old_hash: u64,
        new_hash: u64,
    },
    /// No rule had any effect; the filesystem was not touched.
    Unchanged { path: PathBuf },
    /// Target path does not exist; reported before any rule ran. Routine in
    /// batch runs over optional targets, never fatal.
    NotFound { path: PathBuf },
}

impl PatchResult {
    pub fn path(&self) -> &Path {
        match self {
            PatchResult::Changed { path, .. }
            | PatchResult::Unchanged { path }
            | PatchResult::NotFound { path } => path,
        }
    }
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Changed { path, .. } => {
                write!(f, "Changed {}", path.display())
            }
            PatchResult::Unchanged { path } => {
                write!(f, "Unchanged {}", path.display())
            }
            PatchResult::NotFound { path } => {
                write!(f, "Not found: {}", path.display())
            }
        }
    }
}

/// Per-job failures. All of these are non-fatal to a batch.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("rule '{rule}' re-triggers on its own output for {path}; file left untouched")]
    NotIdempotent { path: PathBuf, rule: String },
}

enum Evaluation {
    NotFound,
    Unchanged,
    Changed { original: String, patched: String },
}

/// Run the rule chain over the job's current content without writing.
fn evaluate(job: &PatchJob) -> Result<Evaluation, JobError> {
    if !job.path.exists() {
        return Ok(Evaluation::NotFound);
    }

    let original = fs::read_to_string(&job.path).map_err(|source| JobError::Read {
        path: job.path.clone(),
        source,
    })?;

    let patched = apply_rules(&job.rules, &original)?;

    if patched == original {
        return Ok(Evaluation::Unchanged);
    }

    if job.verify_idempotent {
        verify_idempotent(job, &patched)?;
    }

    Ok(Evaluation::Changed { original, patched })
}

/// Second pass over the already-patched content: every rule must now be a
/// no-op. A rule whose replacement still matches its own pattern would grow
/// the file on every run; reject it before anything is written.
///
/// The check is per rule, deliberately stricter than whole-chain
/// convergence: a chain whose later rule happens to undo an earlier rule's
/// second-pass match is still rejected, since each rule is required not to
/// re-trigger on its own output. The first rule that fires again is the one
/// named in the error.
fn verify_idempotent(job: &PatchJob, patched: &str) -> Result<(), JobError> {
    let mut current = patched.to_string();
    for rule in &job.rules {
        let next = rule.apply(&current)?;
        if next != current {
            return Err(JobError::NotIdempotent {
                path: job.path.clone(),
                rule: rule.name.clone(),
            });
        }
        current = next.into_owned();
    }
    Ok(())
}

/// Apply a job: read, fold rules in order, rewrite the file only if the
/// content actually changed.
///
/// At most one filesystem write happens per job, and only on change, so an
/// unchanged file keeps its mtime and permissions untouched. A missing
/// target is a reported [`PatchResult::NotFound`], not an error.
pub fn apply(job: &PatchJob) -> Result<PatchResult, JobError> {
    match evaluate(job)? {
        Evaluation::NotFound => Ok(PatchResult::NotFound {
            path: job.path.clone(),
        }),
        Evaluation::Unchanged => Ok(PatchResult::Unchanged {
            path: job.path.clone(),
        }),
        Evaluation::Changed { original, patched } => {
            atomic_write(&job.path, patched.as_bytes()).map_err(|source| JobError::Write {
                path: job.path.clone(),
                source,
            })?;

            // Touch mtime so downstream incremental builds pick up the change
            let now = filetime::FileTime::now();
            filetime::set_file_mtime(&job.path, now).map_err(|source| JobError::Write {
                path: job.path.clone(),
                source,
            })?;

            Ok(PatchResult::Changed {
                path: job.path.clone(),
                old_hash: xxh3_64(original.as_bytes()),
                new_hash: xxh3_64(patched.as_bytes()),
            })
        }
    }
}

/// Evaluate a job read-only: identical result semantics to [`apply`]
/// (`Changed` means "would change"), but the filesystem is never written.
pub fn check(job: &PatchJob) -> Result<PatchResult, JobError> {
    match evaluate(job)? {
        Evaluation::NotFound => Ok(PatchResult::NotFound {
            path: job.path.clone(),
        }),
        Evaluation::Unchanged => Ok(PatchResult::Unchanged {
            path: job.path.clone(),
        }),
        Evaluation::Changed { original, patched } => Ok(PatchResult::Changed {
            path: job.path.clone(),
            old_hash: xxh3_64(original.as_bytes()),
            new_hash: xxh3_64(patched.as_bytes()),
        }),
    }
}

/// Atomic whole-file replace: tempfile in the same directory + fsync + rename.
///
/// Either the full write succeeds or the original file is left intact.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
