pub mod caches;
pub mod commits;
pub mod labels;
pub mod release;
pub mod schema;
pub mod setup;
pub mod toolchain;

use crate::config::Config;
use crate::github::Repo;
use crate::subprocess::CommandRunner;

/// What every command gets to work with.
pub struct Context {
    pub config: Config,
    pub runner: Box<dyn CommandRunner>,
}

impl Context {
    pub fn new(config: Config, runner: Box<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Resolve a repository argument against `github.owner`.
    pub fn repo(&self, input: &str) -> anyhow::Result<Repo> {
        Repo::resolve(input, self.config.github.owner.as_deref())
    }
}
