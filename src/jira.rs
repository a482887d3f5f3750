//! Jira releases (project versions) and issues over the REST API.
//!
//! [`ReleaseTracker`] is the raw client seam; [`ReleaseManager`] adds the
//! name-based lookups and logging the CLI works with.

use anyhow::Context;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ExitError;

pub const EMAIL_VAR: &str = "JIRA_EMAIL";
pub const TOKEN_VAR: &str = "JIRA_TOKEN";
pub const SERVER_VAR: &str = "JIRA_SERVER";

/// A Jira project version, which is what Jira calls a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub key: String,
    pub fields: IssueFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: Option<IssueStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatus {
    pub name: String,
}

impl Issue {
    pub fn status_name(&self) -> &str {
        self.fields.status.as_ref().map_or("unknown", |s| s.name.as_str())
    }
}

/// Raw release-tracker operations.
pub trait ReleaseTracker {
    fn create_version(&self, name: &str, project: &str) -> anyhow::Result<Version>;
    fn project_versions(&self, project: &str) -> anyhow::Result<Vec<Version>>;
    fn delete_version(&self, id: &str) -> anyhow::Result<()>;
    fn issue(&self, key: &str) -> anyhow::Result<Issue>;
}

/// Credentials for Jira basic auth.
#[derive(Clone)]
pub struct JiraCredentials {
    pub email: String,
    pub token: String,
}

impl std::fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl JiraCredentials {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials through `lookup`; a missing or empty value is a
    /// configuration error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| -> anyhow::Result<String> {
            tracing::info!("Getting {key}...");
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(value) => {
                    tracing::debug!("...{key} found successfully");
                    Ok(value)
                }
                None => {
                    tracing::error!("{key} not found");
                    Err(ExitError::MissingSetting { key: key.to_string() }.into())
                }
            }
        };
        Ok(Self {
            email: get(EMAIL_VAR)?,
            token: get(TOKEN_VAR)?,
        })
    }

    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.email, self.token);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

/// Blocking Jira REST v2 client.
pub struct JiraApi {
    agent: ureq::Agent,
    server: String,
    auth: String,
}

impl JiraApi {
    pub fn new(server: &str, credentials: &JiraCredentials) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
            server: server.trim_end_matches('/').to_string(),
            auth: credentials.basic_auth(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{path}", self.server)
    }

    fn get(&self, path: &str, what: &str) -> anyhow::Result<String> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth)
            .header("Accept", "application/json")
            .call()
            .with_context(|| format!("requesting {url}"))?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().context("reading Jira response")?;
        check_status(status, body, what)
    }
}

impl ReleaseTracker for JiraApi {
    fn create_version(&self, name: &str, project: &str) -> anyhow::Result<Version> {
        let url = self.url("version");
        let payload = serde_json::json!({ "name": name, "project": project }).to_string();
        tracing::debug!(%url, "POST");
        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .send(payload)
            .with_context(|| format!("requesting {url}"))?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().context("reading Jira response")?;
        let body = check_status(status, body, &format!("project {project}"))?;
        parse_body(&body, "Jira version")
    }

    fn project_versions(&self, project: &str) -> anyhow::Result<Vec<Version>> {
        let path = format!("project/{project}/versions");
        let body = self.get(&path, &format!("project {project}"))?;
        parse_body(&body, "Jira project versions")
    }

    fn delete_version(&self, id: &str) -> anyhow::Result<()> {
        let url = self.url(&format!("version/{id}"));
        tracing::debug!(%url, "DELETE");
        let mut response = self
            .agent
            .delete(&url)
            .header("Authorization", &self.auth)
            .call()
            .with_context(|| format!("requesting {url}"))?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().unwrap_or_default();
        check_status(status, body, &format!("version {id}"))?;
        Ok(())
    }

    fn issue(&self, key: &str) -> anyhow::Result<Issue> {
        let body = self.get(&format!("issue/{key}"), &format!("issue {key}"))?;
        parse_body(&body, "Jira issue")
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str, source: &str) -> anyhow::Result<T> {
    serde_json::from_str(body).map_err(|e| ExitError::parse(source, e).into())
}

/// Map a Jira HTTP status to success or a typed failure.
fn check_status(status: u16, body: String, what: &str) -> anyhow::Result<String> {
    match status {
        200..=299 => Ok(body),
        404 => Err(ExitError::not_found(what).into()),
        _ => Err(ExitError::Http {
            service: "jira".into(),
            status,
            message: error_message(&body),
        }
        .into()),
    }
}

/// Flatten Jira's `{"errorMessages": [...], "errors": {...}}` error body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct JiraErrors {
        #[serde(default)]
        error_messages: Vec<String>,
        #[serde(default)]
        errors: serde_json::Map<String, serde_json::Value>,
    }

    let Ok(parsed) = serde_json::from_str::<JiraErrors>(body) else {
        return body.trim().to_string();
    };
    let mut messages = parsed.error_messages;
    messages.extend(parsed.errors.into_iter().map(|(field, value)| match value {
        serde_json::Value::String(s) => format!("{field}: {s}"),
        other => format!("{field}: {other}"),
    }));
    if messages.is_empty() {
        body.trim().to_string()
    } else {
        messages.join("; ")
    }
}

/// The subset of a GitHub release object that maps onto a Jira release.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl GithubRelease {
    /// Parse either a full `release` event payload or the bare release object.
    pub fn from_payload(payload: &str) -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Payload {
            Event { release: GithubRelease },
            Release(GithubRelease),
        }

        match serde_json::from_str::<Payload>(payload) {
            Ok(Payload::Event { release } | Payload::Release(release)) => Ok(release),
            Err(e) => Err(ExitError::parse("GitHub release payload", e).into()),
        }
    }

    /// Release title, falling back to the tag.
    pub fn release_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.tag_name)
    }
}

/// Release CRUD by name on top of a [`ReleaseTracker`].
pub struct ReleaseManager<'a> {
    tracker: &'a dyn ReleaseTracker,
}

impl<'a> ReleaseManager<'a> {
    pub fn new(tracker: &'a dyn ReleaseTracker) -> Self {
        Self { tracker }
    }

    /// Create a release. An existing release with the same name is an error;
    /// releases are never updated implicitly.
    pub fn create_release(&self, name: &str, project: &str) -> anyhow::Result<Version> {
        tracing::info!("Creating release {name}...");
        let version = self
            .tracker
            .create_version(name, project)
            .inspect_err(|e| tracing::error!("Failed to create release {name}: {e}"))?;
        tracing::debug!("...release created successfully");
        Ok(version)
    }

    pub fn get_release_by_name(&self, name: &str, project: &str) -> anyhow::Result<Version> {
        tracing::info!("Getting release by name {name}...");
        let version = self
            .tracker
            .project_versions(project)?
            .into_iter()
            .find(|v| v.name == name)
            .ok_or_else(|| ExitError::not_found(format!("release {name} in project {project}")))
            .inspect_err(|e| tracing::error!("{e}"))?;
        tracing::debug!("...release found successfully");
        Ok(version)
    }

    pub fn delete_release(&self, name: &str, project: &str) -> anyhow::Result<()> {
        tracing::info!("Deleting release {name}...");
        let version = self.get_release_by_name(name, project)?;
        self.tracker
            .delete_version(&version.id)
            .inspect_err(|e| tracing::error!("Failed to delete release {name}: {e}"))?;
        tracing::debug!("...release deleted successfully");
        Ok(())
    }

    pub fn get_issue(&self, key: &str) -> anyhow::Result<Issue> {
        tracing::info!("Getting issue {key}...");
        let issue = self
            .tracker
            .issue(key)
            .inspect_err(|e| tracing::error!("Failed to get issue {key}: {e}"))?;
        tracing::debug!("...issue found successfully");
        Ok(issue)
    }

    /// Mirror a GitHub release event into a Jira release.
    pub fn create_from_github_event(
        &self,
        payload: &str,
        project: &str,
    ) -> anyhow::Result<Version> {
        tracing::info!("Creating release in Jira from GitHub event...");
        let release = GithubRelease::from_payload(payload)
            .inspect_err(|e| tracing::error!("{e}"))?;
        tracing::debug!(
            tag = %release.tag_name,
            prerelease = release.prerelease,
            url = release.html_url.as_deref().unwrap_or(""),
            "parsed GitHub release"
        );
        self.create_release(release.release_name(), project)
    }
}
