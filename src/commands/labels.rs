use std::io::IsTerminal;

use anyhow::Context as _;
use clap::Subcommand;

use super::Context;
use crate::github::{Label, LabelCategory, LabelManager, random_color};

#[derive(Debug, Subcommand)]
pub enum LabelsCommand {
    /// List the labels of a repository
    List {
        /// Repository as owner/name, or a name under github.owner
        repo: String,
        /// Print JSON instead of names
        #[arg(long)]
        json: bool,
    },
    /// Add one label
    Add {
        repo: String,
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Hex color without '#'; random when omitted
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Remove one label
    Remove { repo: String, name: String },
    /// Remove every label from a repository
    Clear {
        repo: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Install the default label catalog
    Setup {
        repo: String,
        /// Only these categories (repeatable)
        #[arg(long, value_enum)]
        category: Vec<LabelCategory>,
    },
    /// Print the default label catalog
    Catalog {
        #[arg(long, value_enum)]
        category: Vec<LabelCategory>,
    },
}

impl LabelsCommand {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let labels = LabelManager::new(ctx.runner());
        match self {
            Self::List { repo, json } => {
                let found = labels.list(&ctx.repo(repo)?)?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&found)?);
                } else {
                    for label in found {
                        println!("{label}");
                    }
                }
                Ok(())
            }
            Self::Add {
                repo,
                name,
                description,
                color,
            } => {
                let color = color.clone().unwrap_or_else(random_color);
                labels.add(&ctx.repo(repo)?, &Label::new(name, description, &color))
            }
            Self::Remove { repo, name } => labels.remove(&ctx.repo(repo)?, name),
            Self::Clear { repo, yes } => {
                let repo = ctx.repo(repo)?;
                if !yes && !confirm_clear(&repo.to_string())? {
                    tracing::warn!("Aborted, no labels removed from '{repo}'.");
                    return Ok(());
                }
                labels.clear(&repo).map(|_| ())
            }
            Self::Setup { repo, category } => {
                tracing::info!("Starting label setup...");
                labels
                    .setup(&ctx.repo(repo)?, &LabelCategory::catalog(category))
                    .map(|_| ())
            }
            Self::Catalog { category } => {
                for label in LabelCategory::catalog(category) {
                    println!(
                        "#{}  {:<30} {}",
                        label.color,
                        label.name,
                        label.description.as_deref().unwrap_or("")
                    );
                }
                Ok(())
            }
        }
    }
}

fn confirm_clear(repo: &str) -> anyhow::Result<bool> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("refusing to remove all labels from {repo} without --yes");
    }
    dialoguer::Confirm::new()
        .with_prompt(format!("Remove ALL labels from {repo}?"))
        .default(false)
        .interact()
        .context("reading confirmation")
}
