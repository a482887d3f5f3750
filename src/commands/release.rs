use std::path::PathBuf;

use anyhow::Context as _;
use clap::Subcommand;

use super::Context;
use crate::error::ExitError;
use crate::jira::{JiraApi, JiraCredentials, ReleaseManager};

#[derive(Debug, Subcommand)]
pub enum ReleaseCommand {
    /// Create a Jira release; fails if the name is taken
    Create {
        name: String,
        /// Jira project key [default: jira.project]
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Delete a Jira release by name
    Delete {
        name: String,
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Show a Jira release by name
    Show {
        name: String,
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Create a Jira release from a GitHub release event
    FromGithubEvent {
        /// Event JSON; read from --event-path when omitted
        payload: Option<String>,
        #[arg(long, env = "GITHUB_EVENT_PATH")]
        event_path: Option<PathBuf>,
        #[arg(short, long)]
        project: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum IssueCommand {
    /// Show a Jira issue, e.g. SQLC-123
    Show { key: String },
}

fn connect(ctx: &Context) -> anyhow::Result<JiraApi> {
    let server = ctx.config.jira_server()?;
    let credentials = JiraCredentials::from_env()?;
    Ok(JiraApi::new(&server, &credentials))
}

impl ReleaseCommand {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let project = |explicit: &Option<String>| ctx.config.jira_project(explicit.as_deref());
        match self {
            Self::Create { name, project: p } => {
                let project = project(p)?;
                let api = connect(ctx)?;
                let version = ReleaseManager::new(&api).create_release(name, &project)?;
                println!("created release {} (id {}) in {project}", version.name, version.id);
                Ok(())
            }
            Self::Delete { name, project: p } => {
                let project = project(p)?;
                let api = connect(ctx)?;
                ReleaseManager::new(&api).delete_release(name, &project)?;
                println!("deleted release {name} from {project}");
                Ok(())
            }
            Self::Show { name, project: p } => {
                let project = project(p)?;
                let api = connect(ctx)?;
                let version = ReleaseManager::new(&api).get_release_by_name(name, &project)?;
                println!("{}", serde_json::to_string_pretty(&version)?);
                Ok(())
            }
            Self::FromGithubEvent {
                payload,
                event_path,
                project: p,
            } => {
                let project = project(p)?;
                let payload = match (payload, event_path) {
                    (Some(json), _) => json.clone(),
                    (None, Some(path)) => std::fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?,
                    (None, None) => {
                        return Err(ExitError::Config(
                            "no release payload given and GITHUB_EVENT_PATH is unset".into(),
                        )
                        .into());
                    }
                };
                let api = connect(ctx)?;
                let version =
                    ReleaseManager::new(&api).create_from_github_event(&payload, &project)?;
                println!("created release {} (id {}) in {project}", version.name, version.id);
                Ok(())
            }
        }
    }
}

impl IssueCommand {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        match self {
            Self::Show { key } => {
                let api = connect(ctx)?;
                let issue = ReleaseManager::new(&api).get_issue(key)?;
                println!("{}  [{}]  {}", issue.key, issue.status_name(), issue.fields.summary);
                Ok(())
            }
        }
    }
}
