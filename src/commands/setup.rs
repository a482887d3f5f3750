use std::path::PathBuf;

use clap::Args;

use super::Context;
use crate::precommit::{Launcher, install_pre_commit_hooks};

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Launch pre-commit through `poetry run`
    #[arg(long)]
    pub poetry: bool,
    /// Repository to set up
    #[arg(long)]
    pub repo_dir: Option<PathBuf>,
}

impl SetupArgs {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        tracing::info!("Setting up repository...");
        let launcher = if self.poetry {
            Launcher::Poetry
        } else {
            Launcher::Direct
        };
        install_pre_commit_hooks(ctx.runner(), launcher, self.repo_dir.as_deref())?;
        tracing::info!("Setup complete.");
        Ok(())
    }
}
