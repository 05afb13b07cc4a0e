use crate::engine::PatchJob;
use crate::rule::{Matcher, PatchRule};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// A patch set: metadata plus the ordered jobs it applies.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Resolve job paths against the runner's root directory
    #[serde(default)]
    pub root_relative: bool,
    /// Reject rule chains that re-trigger on their own output
    #[serde(default = "default_true")]
    pub verify_idempotent: bool,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            root_relative: false,
            verify_idempotent: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// One target file plus its ordered rules, as declared in TOML.
#[derive(Debug, Deserialize, Clone)]
pub struct JobSpec {
    pub file: String,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleSpec {
    pub name: String,
    pub matcher: MatcherSpec,
    pub replace: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MatcherSpec {
    /// Exact substring match
    Literal { search: String },
    /// Regular expression; compiled at load time so malformed patterns are
    /// rejected before any file is touched
    Regex { pattern: String },
}

impl PatchSet {
    /// Validate the declared shape, collecting every issue rather than
    /// stopping at the first.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.jobs.is_empty() {
            issues.push(ValidationIssue::EmptyJobList);
        }

        for job in &self.jobs {
            if job.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    context: None,
                    field: "file",
                });
            }

            for rule in &job.rules {
                if rule.name.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        context: Some(job.file.clone()),
                        field: "rules.name",
                    });
                }

                match &rule.matcher {
                    MatcherSpec::Literal { search } => {
                        if search.is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                context: Some(rule.name.clone()),
                                field: "matcher.search",
                            });
                        }
                    }
                    MatcherSpec::Regex { pattern } => {
                        if pattern.is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                context: Some(rule.name.clone()),
                                field: "matcher.pattern",
                            });
                        } else if let Err(e) = rule.to_rule().compile() {
                            issues.push(ValidationIssue::InvalidRule {
                                rule: rule.name.clone(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Convert declared jobs into engine jobs, resolving paths against
    /// `root` when the set is root-relative.
    pub fn to_jobs(&self, root: &Path) -> Vec<PatchJob> {
        self.jobs
            .iter()
            .map(|spec| {
                let path = if self.meta.root_relative {
                    root.join(&spec.file)
                } else {
                    Path::new(&spec.file).to_path_buf()
                };
                let rules = spec.rules.iter().map(RuleSpec::to_rule).collect();
                let mut job = PatchJob::new(path, rules);
                job.verify_idempotent = self.meta.verify_idempotent;
                job
            })
            .collect()
    }
}

impl RuleSpec {
    pub fn to_rule(&self) -> PatchRule {
        let matcher = match &self.matcher {
            MatcherSpec::Literal { search } => Matcher::Literal(search.clone()),
            MatcherSpec::Regex { pattern } => Matcher::Regex(pattern.clone()),
        };
        PatchRule {
            name: self.name.clone(),
            matcher,
            replacement: self.replace.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyJobList,
    MissingField {
        context: Option<String>,
        field: &'static str,
    },
    InvalidRule {
        rule: String,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyJobList => write!(f, "patch set contains no jobs"),
            ValidationIssue::MissingField { context, field } => match context {
                Some(ctx) => write!(f, "'{ctx}' missing required field '{field}'"),
                None => write!(f, "job missing required field '{field}'"),
            },
            ValidationIssue::InvalidRule { rule, message } => {
                write!(f, "rule '{rule}' is invalid: {message}")
            }
        }
    }
}
