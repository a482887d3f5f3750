use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Repo;
use crate::subprocess::{CommandRunner, Tool};

/// Fields requested from `gh cache list --json`.
const CACHE_FIELDS: &str = "id,key,lastAccessedAt";
const SORT_FIELD: &str = "last_accessed_at";

/// Listing order by last access time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    NewestFirst,
    OldestFirst,
}

impl Order {
    const fn flag(self) -> &'static str {
        match self {
            Self::NewestFirst => "desc",
            Self::OldestFirst => "asc",
        }
    }
}

/// One GitHub Actions cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cache {
    pub id: u64,
    pub key: String,
    pub last_accessed_at: DateTime<Utc>,
}

/// Caches split around an age cutoff.
#[derive(Debug, Clone, Default)]
pub struct PrunePlan {
    pub stale: Vec<Cache>,
    pub kept: usize,
}

impl PrunePlan {
    /// Every cache last accessed strictly before `now - max_age` is stale.
    pub fn build(caches: Vec<Cache>, now: DateTime<Utc>, max_age: Duration) -> Self {
        let cutoff = now - max_age;
        let (stale, kept): (Vec<_>, Vec<_>) = caches
            .into_iter()
            .partition(|c| c.last_accessed_at < cutoff);
        Self {
            stale,
            kept: kept.len(),
        }
    }
}

/// Listing and deletion over `gh cache`.
pub struct CacheManager<'a> {
    runner: &'a dyn CommandRunner,
    limit: u32,
}

impl<'a> CacheManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner, limit: 100 }
    }

    /// Maximum number of caches fetched per listing.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Most recently used caches first, at most `limit` of them.
    pub fn list(&self, repo: &Repo) -> anyhow::Result<Vec<Cache>> {
        self.list_ordered(repo, Order::NewestFirst)
    }

    fn list_ordered(&self, repo: &Repo, order: Order) -> anyhow::Result<Vec<Cache>> {
        tracing::info!("Retrieving caches from '{repo}'...");

        let repo_arg = repo.to_string();
        let limit = self.limit.to_string();
        let output = Tool::new("gh")
            .args(&["cache", "list", "--repo", &repo_arg, "--json", CACHE_FIELDS])
            .args(&["--sort", SORT_FIELD, "--order", order.flag()])
            .args(&["--limit", &limit])
            .run_ok(self.runner)
            .inspect_err(|e| tracing::error!("error listing caches: {e}"))?;

        let caches: Vec<Cache> = output
            .parse_json("gh cache list")
            .inspect_err(|e| tracing::error!("error parsing JSON output: {e}"))?;

        tracing::info!("Retrieved {} caches from '{repo}'.", caches.len());
        Ok(caches)
    }

    pub fn delete(&self, repo: &Repo, cache_id: u64) -> anyhow::Result<()> {
        let repo_arg = repo.to_string();
        let id = cache_id.to_string();
        Tool::new("gh")
            .args(&["cache", "delete", &id, "--repo", &repo_arg])
            .run_ok(self.runner)
            .inspect_err(|e| tracing::error!("Error deleting cache {cache_id}: {e}"))?;

        tracing::info!("Deleted cache {cache_id}");
        Ok(())
    }

    /// Delete caches not accessed within `max_age`. Returns the ids deleted
    /// (or that would be deleted, on a dry run).
    ///
    /// Caches are listed oldest first, one `limit`-sized page at a time, until
    /// a page holds a cache that is still fresh. A dry run deletes nothing, so
    /// it only sees the first page.
    pub fn prune(
        &self,
        repo: &Repo,
        max_age: Duration,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> anyhow::Result<Vec<u64>> {
        let mut deleted: Vec<u64> = Vec::new();
        loop {
            let page = self.list_ordered(repo, Order::OldestFirst)?;
            let full_page = page.len() >= self.limit as usize;
            let plan = PrunePlan::build(page, now, max_age);
            tracing::info!(
                stale = plan.stale.len(),
                kept = plan.kept,
                "caches older than {} days",
                max_age.num_days()
            );

            // A page of ids already handled means gh is not making progress.
            if plan.stale.iter().all(|c| deleted.contains(&c.id)) {
                break;
            }

            for cache in &plan.stale {
                if dry_run {
                    tracing::info!(
                        "Would delete cache {} ({}), last accessed at {}",
                        cache.id,
                        cache.key,
                        cache.last_accessed_at
                    );
                } else {
                    tracing::debug!(
                        "Cache {} last accessed at {} is older than the cutoff.",
                        cache.id,
                        cache.last_accessed_at
                    );
                    self.delete(repo, cache.id)?;
                }
                deleted.push(cache.id);
            }

            if !full_page || plan.kept > 0 {
                break;
            }
            if dry_run {
                tracing::warn!(
                    "Listing limit of {} reached; more stale caches may exist.",
                    self.limit
                );
                break;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, failure_kind};
    use crate::fakes::{FakeGitHub, ScriptedRunner};
    use crate::subprocess::RunOutput;

    fn repo() -> Repo {
        Repo::resolve("octo/widgets", None).unwrap()
    }

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    fn cache(id: u64, key: &str, last_accessed_at: DateTime<Utc>) -> Cache {
        Cache {
            id,
            key: key.into(),
            last_accessed_at,
        }
    }

    /// `fresh` caches touched an hour ago and `stale` ones a month ago.
    fn crowded(fresh: u64, stale: u64, now: DateTime<Utc>) -> FakeGitHub {
        let recent = (0..fresh).fold(FakeGitHub::new(), |gh, i| {
            gh.with_cache(i, &format!("fresh-{i}"), now - Duration::hours(1))
        });
        (0..stale).fold(recent, |gh, i| {
            let touched = now - Duration::days(30) + Duration::minutes(i.try_into().unwrap());
            gh.with_cache(1000 + i, &format!("stale-{i}"), touched)
        })
    }

    #[test]
    fn parses_gh_cache_json() {
        let json = r#"[{"id":42,"key":"cargo-linux-abc","lastAccessedAt":"2024-03-01T10:00:00Z"}]"#;
        let runner = ScriptedRunner::new().on(&["gh", "cache", "list"], RunOutput::ok(json));
        let caches = CacheManager::new(&runner).list(&repo()).unwrap();
        assert_eq!(caches.len(), 1);
        assert_eq!(caches[0].id, 42);
        assert_eq!(caches[0].last_accessed_at, at("2024-03-01T10:00:00Z"));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let runner = ScriptedRunner::new().on(&["gh", "cache", "list"], RunOutput::ok("nope"));
        let err = CacheManager::new(&runner).list(&repo()).unwrap_err();
        assert_eq!(failure_kind(&err), Some(FailureKind::Parse));
    }

    #[test]
    fn list_failure_is_tool_error() {
        let runner = ScriptedRunner::new()
            .on(&["gh", "cache", "list"], RunOutput::failed(1, "HTTP 404"));
        let err = CacheManager::new(&runner).list(&repo()).unwrap_err();
        assert_eq!(failure_kind(&err), Some(FailureKind::ToolInvocation));
    }

    #[test]
    fn plan_splits_on_cutoff() {
        let now = at("2024-03-10T00:00:00Z");
        let caches = vec![
            cache(1, "old", at("2024-03-01T00:00:00Z")),
            cache(2, "new", at("2024-03-09T00:00:00Z")),
            cache(3, "edge", at("2024-03-03T00:00:00Z")),
        ];
        let plan = PrunePlan::build(caches, now, Duration::days(7));
        assert_eq!(plan.stale.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(plan.kept, 2);
    }

    #[test]
    fn prune_deletes_only_stale_caches() {
        let gh = FakeGitHub::new()
            .with_cache(1, "old", at("2024-01-01T00:00:00Z"))
            .with_cache(2, "fresh", at("2024-03-09T12:00:00Z"));
        let manager = CacheManager::new(&gh);
        let now = at("2024-03-10T00:00:00Z");

        let deleted = manager.prune(&repo(), Duration::days(7), now, false).unwrap();
        assert_eq!(deleted, vec![1]);

        let remaining = manager.list(&repo()).unwrap();
        assert_eq!(remaining.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn dry_run_deletes_nothing() {
        let gh = FakeGitHub::new().with_cache(1, "old", at("2024-01-01T00:00:00Z"));
        let manager = CacheManager::new(&gh);
        let now = at("2024-03-10T00:00:00Z");

        let would_delete = manager.prune(&repo(), Duration::days(7), now, true).unwrap();
        assert_eq!(would_delete, vec![1]);
        assert_eq!(manager.list(&repo()).unwrap().len(), 1);
    }

    #[test]
    fn delete_failure_aborts() {
        let runner = ScriptedRunner::new()
            .on(&["gh", "cache", "delete"], RunOutput::failed(1, "not found"));
        let err = CacheManager::new(&runner).delete(&repo(), 9).unwrap_err();
        assert_eq!(failure_kind(&err), Some(FailureKind::ToolInvocation));
    }

    #[test]
    fn listing_asks_gh_for_newest_first() {
        let runner = ScriptedRunner::new().on(&["gh", "cache", "list"], RunOutput::ok("[]"));
        CacheManager::new(&runner).with_limit(25).list(&repo()).unwrap();
        assert!(runner.called_with(&[
            "gh", "cache", "list", "--repo", "octo/widgets", "--json", CACHE_FIELDS,
            "--sort", "last_accessed_at", "--order", "desc", "--limit", "25",
        ]));
    }

    #[test]
    fn prune_reaches_stale_caches_beyond_the_listing_limit() {
        let now = at("2024-03-10T00:00:00Z");
        let gh = crowded(150, 20, now);
        let manager = CacheManager::new(&gh);

        let deleted = manager.prune(&repo(), Duration::days(7), now, false).unwrap();
        assert_eq!(deleted.len(), 20);
        assert!(deleted.iter().all(|id| *id >= 1000));

        let newest = manager.with_limit(200).list(&repo()).unwrap();
        assert_eq!(newest.len(), 150);
        assert!(newest.iter().all(|c| c.key.starts_with("fresh-")));
    }

    #[test]
    fn prune_pages_until_a_fresh_cache_shows_up() {
        let now = at("2024-03-10T00:00:00Z");
        let gh = crowded(3, 12, now);
        let manager = CacheManager::new(&gh).with_limit(5);

        let deleted = manager.prune(&repo(), Duration::days(7), now, false).unwrap();
        assert_eq!(deleted, (1000..1012).collect::<Vec<_>>());
        assert_eq!(manager.list(&repo()).unwrap().len(), 3);
    }

    #[test]
    fn dry_run_stops_after_one_full_page() {
        let now = at("2024-03-10T00:00:00Z");
        let gh = crowded(3, 12, now);
        let manager = CacheManager::new(&gh).with_limit(5);

        let would_delete = manager.prune(&repo(), Duration::days(7), now, true).unwrap();
        assert_eq!(would_delete, (1000..1005).collect::<Vec<_>>());
        assert_eq!(manager.with_limit(100).list(&repo()).unwrap().len(), 15);
    }
}
