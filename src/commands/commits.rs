use std::path::PathBuf;

use clap::Subcommand;

use super::Context;
use crate::commits::{CommitRangeValidator, RangeReport};
use crate::error::ExitError;

#[derive(Debug, Subcommand)]
pub enum CommitsCommand {
    /// Check every non-merge commit in BASE..HEAD against the commit convention
    Validate {
        /// Base reference, typically the target branch [default: commits.base]
        base: Option<String>,
        /// Head reference, typically the branch under review
        #[arg(long, default_value = "HEAD")]
        head: String,
        /// Number of commits checked concurrently [default: commits.jobs]
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Repository to run in
        #[arg(long)]
        repo_dir: Option<PathBuf>,
    },
}

impl CommitsCommand {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        match self {
            Self::Validate {
                base,
                head,
                jobs,
                repo_dir,
            } => {
                let settings = &ctx.config.commits;
                let base = base.as_deref().unwrap_or(&settings.base);
                let mut validator = CommitRangeValidator::new(ctx.runner(), settings.checker()?)
                    .with_jobs(jobs.unwrap_or(settings.jobs));
                if let Some(dir) = repo_dir {
                    validator = validator.in_repo(dir);
                }

                let report = validator.validate_range(base, head)?;
                print_report(&report);
                if report.passed() {
                    Ok(())
                } else {
                    Err(ExitError::CheckFailed(format!(
                        "{} of {} commits in {}..{} do not follow the commit convention",
                        report.failing_commits().len(),
                        report.checks.len(),
                        report.range.base(),
                        report.range.head()
                    ))
                    .into())
                }
            }
        }
    }
}

fn print_report(report: &RangeReport) {
    for check in &report.checks {
        if check.passed {
            println!("ok    {}", check.commit);
        } else {
            println!("FAIL  {}", check.commit);
            if let Some(message) = &check.message {
                for line in message.lines() {
                    println!("      {line}");
                }
            }
        }
    }
}
