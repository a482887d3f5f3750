//! In-memory stand-ins for external tools (testing only)
//!
//! `ScriptedRunner` answers commands from a rule table, `FakeGitHub` keeps
//! label and cache state behind the `gh` command lines the wrappers emit, and
//! `MemoryReleaseTracker` plays the Jira side.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::ExitError;
use crate::github::{Cache, Label, encode_path_segment};
use crate::jira::{Issue, IssueFields, IssueStatus, ReleaseTracker, Version};
use crate::subprocess::{CommandRunner, RunOutput, Tool};

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Reply {
    Output(RunOutput),
    NotFound,
}

/// Answers each command with the first rule whose argv prefix matches.
///
/// Unmatched commands exit 127. Every call is recorded.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<(Vec<String>, Reply)>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to any command starting with `prefix`
    /// (program first).
    #[must_use]
    pub fn on(mut self, prefix: &[&str], output: RunOutput) -> Self {
        self.rules.push((to_owned(prefix), Reply::Output(output)));
        self
    }

    /// Behave as if the program for `prefix` is not installed.
    #[must_use]
    pub fn unavailable(mut self, prefix: &[&str]) -> Self {
        self.rules.push((to_owned(prefix), Reply::NotFound));
        self
    }

    /// Recorded argv of every call, program first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn called_with(&self, prefix: &[&str]) -> bool {
        self.calls().iter().any(|argv| starts_with(argv, prefix))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, tool: &Tool) -> anyhow::Result<RunOutput> {
        let argv = argv(tool);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(argv.clone());
        }

        let prefix_matches = |prefix: &[String]| {
            argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| a == p)
        };
        match self.rules.iter().find(|(prefix, _)| prefix_matches(prefix)) {
            Some((_, Reply::Output(output))) => Ok(output.clone()),
            Some((_, Reply::NotFound)) => Err(ExitError::ToolNotFound {
                tool: tool.program().to_string(),
            }
            .into()),
            None => Ok(RunOutput::failed(
                127,
                format!("no scripted reply for {}", tool.display()),
            )),
        }
    }
}

fn to_owned(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

fn argv(tool: &Tool) -> Vec<String> {
    std::iter::once(tool.program().to_string())
        .chain(tool.arguments().iter().cloned())
        .collect()
}

fn starts_with(argv: &[String], prefix: &[&str]) -> bool {
    argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| a == p)
}

// ---------------------------------------------------------------------------
// FakeGitHub
// ---------------------------------------------------------------------------

/// Stateful `gh` emulation covering `gh api .../labels` and `gh cache`.
#[derive(Debug, Default)]
pub struct FakeGitHub {
    labels: Mutex<HashMap<String, Vec<Label>>>,
    caches: Mutex<Vec<Cache>>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cache(self, id: u64, key: &str, last_accessed_at: DateTime<Utc>) -> Self {
        if let Ok(mut caches) = self.caches.lock() {
            caches.push(Cache {
                id,
                key: key.to_string(),
                last_accessed_at,
            });
        }
        self
    }

    fn api(&self, args: &[String]) -> anyhow::Result<RunOutput> {
        let method = flag_value(args, "--method").unwrap_or("GET");
        let Some(path) = args.iter().find(|a| a.starts_with("repos/")) else {
            return Ok(RunOutput::failed(1, "gh: missing API path"));
        };
        let segments: Vec<&str> = path.split('/').collect();
        let (repo, rest) = match segments.as_slice() {
            ["repos", owner, name, rest @ ..] => (format!("{owner}/{name}"), rest),
            _ => return Ok(RunOutput::failed(1, "gh: Not Found (HTTP 404)")),
        };

        let mut store = self
            .labels
            .lock()
            .map_err(|_| anyhow::anyhow!("label store poisoned"))?;
        let labels = store.entry(repo).or_default();

        match (method, rest) {
            ("GET", ["labels"]) => Ok(RunOutput::ok(serde_json::to_string(labels)?)),
            ("POST", ["labels"]) => {
                let fields = form_fields(args);
                let Some(name) = fields.get("name") else {
                    return Ok(RunOutput::failed(1, "gh: Validation Failed (HTTP 422)"));
                };
                if labels.iter().any(|l| &l.name == name) {
                    return Ok(RunOutput::failed(
                        1,
                        "gh: Validation Failed (HTTP 422)\nalready_exists",
                    ));
                }
                let label = Label::new(
                    name,
                    fields.get("description").map_or("", String::as_str),
                    fields.get("color").map_or("EDEDED", String::as_str),
                );
                let body = serde_json::to_string(&label)?;
                labels.push(label);
                Ok(RunOutput::ok(body))
            }
            ("DELETE", ["labels", encoded]) => {
                let before = labels.len();
                labels.retain(|l| encode_path_segment(&l.name) != *encoded);
                if labels.len() == before {
                    Ok(RunOutput::failed(1, "gh: Not Found (HTTP 404)"))
                } else {
                    Ok(RunOutput::ok(""))
                }
            }
            _ => Ok(RunOutput::failed(1, "gh: Not Found (HTTP 404)")),
        }
    }

    fn cache(&self, args: &[String]) -> anyhow::Result<RunOutput> {
        let mut caches = self
            .caches
            .lock()
            .map_err(|_| anyhow::anyhow!("cache store poisoned"))?;
        match args.first().map(String::as_str) {
            Some("list") => {
                // gh defaults: most recently accessed first, 30 entries.
                let mut listed = caches.clone();
                listed.sort_by_key(|c| (c.last_accessed_at, c.id));
                if flag_value(args, "--order") != Some("asc") {
                    listed.reverse();
                }
                let limit = flag_value(args, "--limit")
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(30);
                listed.truncate(limit);
                Ok(RunOutput::ok(serde_json::to_string(&listed)?))
            }
            Some("delete") => {
                let id = args.get(1).and_then(|s| s.parse::<u64>().ok());
                let before = caches.len();
                caches.retain(|c| Some(c.id) != id);
                if caches.len() == before {
                    Ok(RunOutput::failed(1, "X Could not find a cache matching the id"))
                } else {
                    Ok(RunOutput::ok(""))
                }
            }
            _ => Ok(RunOutput::failed(1, "unknown cache command")),
        }
    }
}

impl CommandRunner for FakeGitHub {
    fn run(&self, tool: &Tool) -> anyhow::Result<RunOutput> {
        if tool.program() != "gh" {
            return Err(ExitError::ToolNotFound {
                tool: tool.program().to_string(),
            }
            .into());
        }
        let args = tool.arguments();
        match args.first().map(String::as_str) {
            Some("api") => self.api(&args[1..]),
            Some("cache") => self.cache(&args[1..]),
            _ => Ok(RunOutput::failed(1, "unknown command")),
        }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn form_fields(args: &[String]) -> HashMap<String, String> {
    args.windows(2)
        .filter(|w| w[0] == "-f")
        .filter_map(|w| w[1].split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// MemoryReleaseTracker
// ---------------------------------------------------------------------------

/// In-memory Jira: versions per project plus a fixed set of issues.
#[derive(Debug, Default)]
pub struct MemoryReleaseTracker {
    versions: Mutex<Vec<(String, Version)>>,
    issues: HashMap<String, Issue>,
    next_id: Mutex<u64>,
}

impl MemoryReleaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_issue(mut self, key: &str, summary: &str, status: &str) -> Self {
        let id = (self.issues.len() + 10_000).to_string();
        self.issues.insert(
            key.to_string(),
            Issue {
                id,
                key: key.to_string(),
                fields: IssueFields {
                    summary: summary.to_string(),
                    status: Some(IssueStatus {
                        name: status.to_string(),
                    }),
                },
            },
        );
        self
    }

    /// Snapshot of the versions in `project`.
    pub fn versions(&self, project: &str) -> Vec<Version> {
        self.versions
            .lock()
            .map(|v| {
                v.iter()
                    .filter(|(p, _)| p == project)
                    .map(|(_, version)| version.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ReleaseTracker for MemoryReleaseTracker {
    fn create_version(&self, name: &str, project: &str) -> anyhow::Result<Version> {
        let mut versions = self
            .versions
            .lock()
            .map_err(|_| anyhow::anyhow!("version store poisoned"))?;
        if versions.iter().any(|(p, v)| p == project && v.name == name) {
            return Err(ExitError::Http {
                service: "jira".into(),
                status: 400,
                message: "name: A version with this name already exists in this project.".into(),
            }
            .into());
        }
        let mut next_id = self
            .next_id
            .lock()
            .map_err(|_| anyhow::anyhow!("id counter poisoned"))?;
        *next_id += 1;
        let version = Version {
            id: (10_000 + *next_id).to_string(),
            name: name.to_string(),
            project_id: None,
            released: false,
            archived: false,
        };
        versions.push((project.to_string(), version.clone()));
        Ok(version)
    }

    fn project_versions(&self, project: &str) -> anyhow::Result<Vec<Version>> {
        Ok(self.versions(project))
    }

    fn delete_version(&self, id: &str) -> anyhow::Result<()> {
        let mut versions = self
            .versions
            .lock()
            .map_err(|_| anyhow::anyhow!("version store poisoned"))?;
        let before = versions.len();
        versions.retain(|(_, v)| v.id != id);
        if versions.len() == before {
            return Err(ExitError::not_found(format!("version {id}")).into());
        }
        Ok(())
    }

    fn issue(&self, key: &str) -> anyhow::Result<Issue> {
        self.issues
            .get(key)
            .cloned()
            .ok_or_else(|| ExitError::not_found(format!("issue {key}")).into())
    }
}
