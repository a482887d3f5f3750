use clap::Subcommand;

use super::Context;
use crate::github::CacheManager;

#[derive(Debug, Subcommand)]
pub enum CachesCommand {
    /// List GitHub Actions caches
    List {
        /// Repository as owner/name, or a name under github.owner
        #[arg(short, long)]
        repo: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete one cache by id
    Delete {
        #[arg(short, long)]
        repo: String,
        id: u64,
    },
    /// Delete caches not accessed recently
    Prune {
        #[arg(short, long)]
        repo: String,
        /// Age threshold in days [default: caches.max_age_days]
        #[arg(long)]
        max_age_days: Option<u32>,
        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
}

impl CachesCommand {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let caches = CacheManager::new(ctx.runner()).with_limit(ctx.config.caches.limit);
        match self {
            Self::List { repo, json } => {
                let found = caches.list(&ctx.repo(repo)?)?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&found)?);
                } else {
                    for cache in found {
                        println!(
                            "{:>12}  {}  {}",
                            cache.id,
                            cache.last_accessed_at.format("%Y-%m-%d %H:%M"),
                            cache.key
                        );
                    }
                }
                Ok(())
            }
            Self::Delete { repo, id } => caches.delete(&ctx.repo(repo)?, *id),
            Self::Prune {
                repo,
                max_age_days,
                dry_run,
            } => {
                let days = max_age_days.unwrap_or(ctx.config.caches.max_age_days);
                let deleted = caches.prune(
                    &ctx.repo(repo)?,
                    chrono::Duration::days(i64::from(days)),
                    chrono::Utc::now(),
                    *dry_run,
                )?;
                let verb = if *dry_run { "would delete" } else { "deleted" };
                println!("{verb} {} caches", deleted.len());
                Ok(())
            }
        }
    }
}
