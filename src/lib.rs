//! Repatch: deterministic, idempotent batch text patching
//!
//! Applies ordered chains of text-transformation rules to files. Each
//! [`PatchJob`] pairs a target path with a rule sequence; the engine folds
//! the rules over the file content in declared order and rewrites the file
//! only when the content actually changed.
//!
//! # Guarantees
//!
//! - At most one filesystem write per job, performed only on change
//! - Atomic file writes (tempfile + fsync + rename)
//! - Rule chains that re-trigger on their own output are rejected before
//!   anything is written, so a second run over patched content is a no-op
//! - A missing target is a reported result, never a batch-halting error
//!
//! # Example
//!
//! ```no_run
//! use repatch::{engine, PatchJob, PatchRule};
//!
//! let job = PatchJob::new(
//!     "src/model.go",
//!     vec![PatchRule::regex(
//!         "uuid-stringify",
//!         r"(?m)^(\s*ID:\s*uuid\.New\(\))$",
//!         "${1}.String()",
//!     )],
//! );
//!
//! match engine::apply(&job) {
//!     Ok(result) => println!("{result}"),
//!     Err(e) => eprintln!("patch failed: {e}"),
//! }
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod rule;
pub mod safety;

// Re-exports
pub use batch::{check_jobs, run_jobs, BatchReport};
pub use config::{load_from_path, load_from_str, ConfigError, PatchSet};
pub use engine::{JobError, PatchJob, PatchResult};
pub use rule::{apply_rules, Matcher, PatchRule, RuleError};
pub use safety::{RootGuard, SafetyError};
