use std::path::Path;

use crate::subprocess::{CommandRunner, Tool};

/// How `pre-commit` is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Launcher {
    /// `pre-commit` from PATH
    #[default]
    Direct,
    /// `poetry run pre-commit`, for projects that pin it in their venv
    Poetry,
}

impl Launcher {
    fn tool(self, args: &[&str]) -> Tool {
        match self {
            Self::Direct => Tool::new("pre-commit").args(args),
            Self::Poetry => Tool::new("poetry").args(&["run", "pre-commit"]).args(args),
        }
    }
}

/// Install the hooks listed in `.pre-commit-config.yaml`.
pub fn install_pre_commit_hooks(
    runner: &dyn CommandRunner,
    launcher: Launcher,
    repo_dir: Option<&Path>,
) -> anyhow::Result<()> {
    tracing::info!("Setting up pre-commit hooks...");

    let tool = launcher.tool(&["install"]);
    let tool = match repo_dir {
        Some(dir) => tool.current_dir(dir),
        None => tool,
    };
    let output = tool
        .run_ok(runner)
        .inspect_err(|e| tracing::error!("Failed to set up hooks, error: {e}"))?;

    tracing::debug!("Successfully set up hooks: {}", output.stdout.trim());
    Ok(())
}
