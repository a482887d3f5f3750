//! Commit message validation across a branch range.
//!
//! Commits are enumerated with `git rev-list --no-merges base..head` and each
//! one is handed to an external convention checker (Commitizen by default).
//! Validation never stops at the first bad commit: the report lists every
//! offender so they can all be fixed in one pass.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ExitError;
use crate::subprocess::{CommandRunner, Tool};

/// Placeholder replaced by the single-commit revision (`<sha>^!`).
pub const REV_PLACEHOLDER: &str = "{rev}";
/// Placeholder replaced by the bare commit id.
pub const COMMIT_PLACEHOLDER: &str = "{commit}";

/// External command that judges one commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionChecker {
    program: String,
    args: Vec<String>,
}

impl Default for ConventionChecker {
    /// `cz check --rev-range <sha>^!`
    fn default() -> Self {
        Self {
            program: "cz".into(),
            args: vec!["check".into(), "--rev-range".into(), REV_PLACEHOLDER.into()],
        }
    }
}

impl ConventionChecker {
    /// Build from a command line such as `["cz", "check", "--rev-range", "{rev}"]`.
    /// Without a placeholder, `{rev}` is appended.
    pub fn from_command(parts: &[String]) -> anyhow::Result<Self> {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| ExitError::Config("commit checker command is empty".into()))?;
        let mut args = args.to_vec();
        if !args
            .iter()
            .any(|a| a.contains(REV_PLACEHOLDER) || a.contains(COMMIT_PLACEHOLDER))
        {
            args.push(REV_PLACEHOLDER.into());
        }
        Ok(Self {
            program: program.clone(),
            args,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn tool_for(&self, commit: &str) -> Tool {
        let rev = format!("{commit}^!");
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(REV_PLACEHOLDER, &rev).replace(COMMIT_PLACEHOLDER, commit))
            .collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Tool::new(&self.program).args(&args)
    }
}

/// Non-merge commits reachable from `head` but not from `base`, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    base: String,
    head: String,
    commits: Vec<String>,
}

impl CommitRange {
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn commits(&self) -> &[String] {
        &self.commits
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

/// Verdict for one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCheck {
    pub commit: String,
    pub passed: bool,
    pub message: Option<String>,
}

/// Per-commit verdicts, in range order.
#[derive(Debug, Clone)]
pub struct RangeReport {
    pub range: CommitRange,
    pub checks: Vec<CommitCheck>,
}

impl RangeReport {
    /// True only if every commit passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CommitCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn failing_commits(&self) -> Vec<&str> {
        self.failures().map(|c| c.commit.as_str()).collect()
    }
}

pub struct CommitRangeValidator<'a> {
    runner: &'a dyn CommandRunner,
    checker: ConventionChecker,
    jobs: usize,
    repo_dir: Option<PathBuf>,
}

impl<'a> CommitRangeValidator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, checker: ConventionChecker) -> Self {
        Self {
            runner,
            checker,
            jobs: 1,
            repo_dir: None,
        }
    }

    /// Validate up to `jobs` commits at once. Report order is unaffected.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Run git and the checker inside `dir`.
    #[must_use]
    pub fn in_repo(mut self, dir: &Path) -> Self {
        self.repo_dir = Some(dir.to_path_buf());
        self
    }

    fn git(&self, args: &[&str]) -> Tool {
        let tool = Tool::new("git").args(args);
        match &self.repo_dir {
            Some(dir) => tool.current_dir(dir),
            None => tool,
        }
    }

    fn resolve(&self, reference: &str) -> anyhow::Result<String> {
        let spec = format!("{reference}^{{commit}}");
        let output = self
            .git(&["rev-parse", "--verify", "--quiet", &spec])
            .run(self.runner)?;
        if output.success() && !output.stdout.trim().is_empty() {
            Ok(output.stdout.trim().to_string())
        } else {
            tracing::error!("Could not resolve reference '{reference}'");
            Err(ExitError::not_found(format!("reference {reference}")).into())
        }
    }

    /// List the non-merge commits on `head` that are not on `base`.
    ///
    /// An unresolvable reference is reported as not-found rather than as an
    /// empty range.
    pub fn enumerate_commits(&self, base: &str, head: &str) -> anyhow::Result<CommitRange> {
        tracing::info!("Enumerating commits in {base}..{head}...");
        self.resolve(base)?;
        self.resolve(head)?;

        let range = format!("{base}..{head}");
        let output = self
            .git(&["rev-list", "--no-merges", &range])
            .run_ok(self.runner)
            .inspect_err(|e| tracing::error!("Failed to list commits: {e}"))?;

        let commits: Vec<String> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        tracing::debug!("...found {} commits", commits.len());

        Ok(CommitRange {
            base: base.to_string(),
            head: head.to_string(),
            commits,
        })
    }

    /// Check a single commit. Any checker failure, including failing to
    /// launch it, fails this commit only.
    pub fn validate_one(&self, commit: &str) -> CommitCheck {
        let tool = self.checker.tool_for(commit);
        let tool = match &self.repo_dir {
            Some(dir) => tool.current_dir(dir),
            None => tool,
        };

        match tool.run(self.runner) {
            Ok(output) if output.success() => {
                tracing::debug!("Commit {commit} is valid");
                CommitCheck {
                    commit: commit.to_string(),
                    passed: true,
                    message: None,
                }
            }
            Ok(output) => {
                let diagnostic = output.diagnostic();
                tracing::debug!(
                    exit_code = output.exit_code,
                    "Commit {commit} rejected: {diagnostic}"
                );
                CommitCheck {
                    commit: commit.to_string(),
                    passed: false,
                    message: Some(if diagnostic.is_empty() {
                        format!("{} exited with {}", self.checker.program(), output.exit_code)
                    } else {
                        diagnostic
                    }),
                }
            }
            Err(e) => {
                tracing::debug!("Checker failed for {commit}: {e:#}");
                CommitCheck {
                    commit: commit.to_string(),
                    passed: false,
                    message: Some(format!("{e:#}")),
                }
            }
        }
    }

    /// Validate every commit in `base..head` and report all failures.
    pub fn validate_range(&self, base: &str, head: &str) -> anyhow::Result<RangeReport> {
        let range = self.enumerate_commits(base, head)?;
        let checks = if self.jobs <= 1 || range.len() <= 1 {
            range.commits().iter().map(|c| self.validate_one(c)).collect()
        } else {
            self.validate_parallel(range.commits())?
        };

        let report = RangeReport { range, checks };
        for failure in report.failures() {
            tracing::error!(
                "Commit {} failed validation: {}",
                failure.commit,
                failure.message.as_deref().unwrap_or("no diagnostic")
            );
        }
        if report.passed() {
            tracing::info!("All {} commit messages are valid.", report.checks.len());
        } else {
            tracing::error!(
                "{} of {} commits failed validation: {}",
                report.failing_commits().len(),
                report.checks.len(),
                report.failing_commits().join(", ")
            );
        }
        Ok(report)
    }

    fn validate_parallel(&self, commits: &[String]) -> anyhow::Result<Vec<CommitCheck>> {
        let next = &AtomicUsize::new(0);
        let workers = self.jobs.min(commits.len());

        let mut indexed: Vec<(usize, CommitCheck)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some(commit) = commits.get(i) else {
                                break;
                            };
                            done.push((i, self.validate_one(commit)));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .map_err(|_| anyhow::anyhow!("commit validation worker panicked"))
                })
                .collect::<anyhow::Result<Vec<_>>>()
        })?
        .into_iter()
        .flatten()
        .collect();

        indexed.sort_by_key(|(i, _)| *i);
        Ok(indexed.into_iter().map(|(_, check)| check).collect())
    }
}
