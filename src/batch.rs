//! Batch orchestration: apply an ordered list of independent jobs and
//! collect one outcome per job.
//!
//! Jobs share no state and no transaction spans files; a failure on one job
//! never aborts the rest. The report preserves job order so callers can
//! assert outcomes positionally.

use crate::engine::{self, JobError, PatchJob, PatchResult};
use std::path::PathBuf;

/// Ordered per-job outcomes plus summary accessors.
#[derive(Debug)]
#[must_use = "BatchReport should be checked for failures"]
pub struct BatchReport {
    outcomes: Vec<(PathBuf, Result<PatchResult, JobError>)>,
}

impl BatchReport {
    /// Per-job outcomes, in the order the jobs were declared.
    pub fn outcomes(&self) -> &[(PathBuf, Result<PatchResult, JobError>)] {
        &self.outcomes
    }

    pub fn changed(&self) -> usize {
        self.count(|r| matches!(r, Ok(PatchResult::Changed { .. })))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|r| matches!(r, Ok(PatchResult::Unchanged { .. })))
    }

    pub fn missing(&self) -> usize {
        self.count(|r| matches!(r, Ok(PatchResult::NotFound { .. })))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| r.is_err())
    }

    /// True iff every job completed without error. A missing target is a
    /// routine reported condition, not a failure.
    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&Result<PatchResult, JobError>) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, r)| pred(r)).count()
    }
}

/// Apply every job in order, collecting a result per job.
pub fn run_jobs(jobs: &[PatchJob]) -> BatchReport {
    BatchReport {
        outcomes: jobs
            .iter()
            .map(|job| (job.path.clone(), engine::apply(job)))
            .collect(),
    }
}

/// Evaluate every job read-only; same report shape as [`run_jobs`] with
/// `Changed` meaning "would change".
pub fn check_jobs(jobs: &[PatchJob]) -> BatchReport {
    BatchReport {
        outcomes: jobs
            .iter()
            .map(|job| (job.path.clone(), engine::check(job)))
            .collect(),
    }
}
