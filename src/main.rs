use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use repatch::config::{load_from_path, MatcherSpec, PatchSet};
use repatch::{apply_rules, check_jobs, run_jobs, BatchReport, PatchJob, PatchResult, RootGuard};
use similar::{ChangeTag, TextDiff};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "repatch")]
#[command(about = "Deterministic, idempotent batch text patching", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patch sets to their target files
    Apply {
        /// Patch set files, or directories scanned for .toml patch sets
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Root directory for root-relative patch sets (defaults to cwd)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Dry run - report what would change without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Evaluate patch sets read-only and report per-file status
    Check {
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Root directory for root-relative patch sets (defaults to cwd)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// List patch sets, their jobs and rule names
    List {
        #[arg(required = true)]
        configs: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            configs,
            root,
            dry_run,
            diff,
        } => cmd_apply(configs, root, dry_run, diff),

        Commands::Check { configs, root } => cmd_check(configs, root),

        Commands::List { configs } => cmd_list(configs),
    }
}

/// Expand config arguments: files are taken as-is, directories are scanned
/// (depth 1) for .toml patch sets, sorted for a stable run order.
fn collect_patch_files(args: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for arg in args {
        if arg.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(arg).max_depth(1) {
                let entry = entry?;
                if entry.file_type().is_file()
                    && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
                {
                    found.push(entry.path().to_path_buf());
                }
            }
            found.sort();
            if found.is_empty() {
                anyhow::bail!("no .toml patch sets found in {}", arg.display());
            }
            files.extend(found);
        } else if arg.is_file() {
            files.push(arg.clone());
        } else {
            anyhow::bail!("patch set not found: {}", arg.display());
        }
    }

    Ok(files)
}

fn resolve_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    match cli_root {
        Some(path) => Ok(path.canonicalize()?),
        None => Ok(env::current_dir()?),
    }
}

/// Convert a patch set's declared jobs into engine jobs, confining
/// root-relative targets to the root directory.
fn prepare_jobs(set: &PatchSet, guard: &RootGuard) -> Result<Vec<PatchJob>> {
    let mut jobs = set.to_jobs(guard.root());
    if set.meta.root_relative {
        for job in &mut jobs {
            job.path = guard.resolve(&job.path)?;
        }
    }
    Ok(jobs)
}

/// Totals accumulated across every patch set in a run.
#[derive(Default)]
struct Totals {
    changed: usize,
    unchanged: usize,
    missing: usize,
    failed: usize,
}

impl Totals {
    fn absorb(&mut self, report: &BatchReport) {
        self.changed += report.changed();
        self.unchanged += report.unchanged();
        self.missing += report.missing();
        self.failed += report.failed();
    }

    fn print(&self) {
        println!("{}", "Summary:".bold());
        println!("  {} changed", format!("{}", self.changed).green());
        println!("  {} unchanged", format!("{}", self.unchanged).yellow());
        println!("  {} missing", format!("{}", self.missing).cyan());
        println!("  {} failed", format!("{}", self.failed).red());
    }
}

fn print_report(report: &BatchReport, dry_run: bool) {
    for (path, outcome) in report.outcomes() {
        match outcome {
            Ok(PatchResult::Changed {
                old_hash, new_hash, ..
            }) => {
                let verb = if dry_run { "Would change" } else { "Changed" };
                println!(
                    "{} {}: {} ({:016x} -> {:016x})",
                    "✓".green(),
                    path.display(),
                    verb,
                    old_hash,
                    new_hash
                );
            }
            Ok(PatchResult::Unchanged { .. }) => {
                println!("{} {}: Unchanged", "⊙".yellow(), path.display());
            }
            Ok(PatchResult::NotFound { .. }) => {
                println!("{} {}: Not found", "⊘".cyan(), path.display());
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
            }
        }
    }
}

/// Show unified diff between original and patched content.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    configs: Vec<PathBuf>,
    root: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let root = resolve_root(root)?;
    let guard = RootGuard::new(&root)?;
    let patch_files = collect_patch_files(&configs)?;

    println!("Root: {}", root.display());
    println!();

    let mut totals = Totals::default();

    for patch_file in patch_files {
        println!("Loading patch set {}...", patch_file.display());

        let set = match load_from_path(&patch_file) {
            Ok(set) => set,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                totals.failed += 1;
                continue;
            }
        };

        let jobs = match prepare_jobs(&set, &guard) {
            Ok(jobs) => jobs,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), patch_file.display(), e);
                totals.failed += 1;
                continue;
            }
        };

        // Capture target contents up front so --diff can show what changed.
        let mut contents_before: HashMap<PathBuf, String> = HashMap::new();
        if show_diff && !dry_run {
            for job in &jobs {
                if job.path.exists() {
                    if let Ok(content) = fs::read_to_string(&job.path) {
                        contents_before.insert(job.path.clone(), content);
                    }
                }
            }
        }

        let report = if dry_run {
            println!("{}", "  [DRY RUN - no files will be modified]".cyan());
            check_jobs(&jobs)
        } else {
            run_jobs(&jobs)
        };

        print_report(&report, dry_run);

        if show_diff {
            for (job, (path, outcome)) in jobs.iter().zip(report.outcomes()) {
                if !matches!(outcome, Ok(PatchResult::Changed { .. })) {
                    continue;
                }
                if dry_run {
                    // Targets are untouched; recompute the would-be content
                    if let Ok(before) = fs::read_to_string(path) {
                        if let Ok(after) = apply_rules(&job.rules, &before) {
                            display_diff(path, &before, &after);
                        }
                    }
                } else if let (Some(before), Ok(after)) =
                    (contents_before.get(path), fs::read_to_string(path))
                {
                    display_diff(path, before, &after);
                }
            }
        }

        totals.absorb(&report);
        println!();
    }

    totals.print();

    if totals.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(configs: Vec<PathBuf>, root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;
    let guard = RootGuard::new(&root)?;
    let patch_files = collect_patch_files(&configs)?;

    println!("{}", "Patch status report".bold());
    println!("Root: {}", root.display());
    println!();

    let mut totals = Totals::default();

    for patch_file in patch_files {
        let set = match load_from_path(&patch_file) {
            Ok(set) => set,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                totals.failed += 1;
                continue;
            }
        };

        let jobs = match prepare_jobs(&set, &guard) {
            Ok(jobs) => jobs,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), patch_file.display(), e);
                totals.failed += 1;
                continue;
            }
        };

        let report = check_jobs(&jobs);
        print_report(&report, true);
        totals.absorb(&report);
        println!();
    }

    totals.print();

    if totals.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(configs: Vec<PathBuf>) -> Result<()> {
    let patch_files = collect_patch_files(&configs)?;

    for patch_file in patch_files {
        let set = load_from_path(&patch_file)?;

        let name = if set.meta.name.is_empty() {
            patch_file.display().to_string()
        } else {
            set.meta.name.clone()
        };
        println!("{}", name.bold());
        if let Some(description) = &set.meta.description {
            println!("  {}", description.dimmed());
        }

        for job in &set.jobs {
            println!("  {}", job.file);
            for rule in &job.rules {
                let kind = match &rule.matcher {
                    MatcherSpec::Literal { .. } => "literal",
                    MatcherSpec::Regex { .. } => "regex",
                };
                println!("    - {} ({})", rule.name, kind);
            }
        }
        println!();
    }

    Ok(())
}
