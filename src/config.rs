use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::commits::ConventionChecker;
use crate::error::ExitError;
use crate::jira;

pub const CONFIG_TOML: &str = ".repokeeper.toml";
pub const CONFIG_JSON: &str = ".repokeeper.json";

/// Project config in `dir`; the TOML file wins when both exist.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    [CONFIG_TOML, CONFIG_JSON]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Per-user config, `<config dir>/repokeeper/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("repokeeper").join("config.toml"))
}

/// Top-level `.repokeeper.toml` config. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub commits: CommitsConfig,
    #[serde(default)]
    pub caches: CachesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GithubConfig {
    /// Owner used to qualify bare repository names.
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://example.atlassian.net`. `JIRA_SERVER` overrides.
    #[serde(default)]
    pub server: Option<String>,
    /// Default project key for releases.
    #[serde(default)]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommitsConfig {
    /// Checker command; `{rev}` becomes `<sha>^!`, `{commit}` the bare sha.
    #[serde(default = "default_checker")]
    pub checker: Vec<String>,
    /// Base reference used when none is given on the command line.
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for CommitsConfig {
    fn default() -> Self {
        Self {
            checker: default_checker(),
            base: default_base(),
            jobs: default_jobs(),
        }
    }
}

impl CommitsConfig {
    pub fn checker(&self) -> anyhow::Result<ConventionChecker> {
        ConventionChecker::from_command(&self.checker)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachesConfig {
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    /// Maximum caches fetched per listing.
    #[serde(default = "default_cache_limit")]
    pub limit: u32,
}

impl Default for CachesConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            limit: default_cache_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoggingConfig {
    /// Append-only log file; relative paths resolve against the working directory.
    /// An empty path disables file logging.
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    /// Default filter when `RUST_LOG` is unset (e.g. `info`, `repokeeper=debug`).
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_level(),
        }
    }
}

fn default_checker() -> Vec<String> {
    vec!["cz".into(), "check".into(), "--rev-range".into(), "{rev}".into()]
}
fn default_base() -> String { "main".into() }
fn default_jobs() -> usize { 1 }
fn default_max_age_days() -> u32 { 7 }
fn default_cache_limit() -> u32 { 100 }
fn default_log_file() -> Option<PathBuf> { Some(PathBuf::from("repokeeper.log")) }
fn default_level() -> String { "info".into() }

impl Config {
    /// Read `path`; `.json` files are JSON, anything else is TOML.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::parse_json(&contents)
        } else {
            Self::parse_toml(&contents)
        }
    }

    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_TOML}: {e}")).into())
    }

    /// Parse config from a JSON string.
    pub fn parse_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_JSON}: {e}")).into())
    }

    /// Resolve the config to use.
    ///
    /// An explicit path must exist. Otherwise the project file in `dir`, then
    /// the per-user file, then built-in defaults.
    pub fn discover(
        explicit: Option<&Path>,
        dir: &Path,
    ) -> anyhow::Result<(Option<PathBuf>, Self)> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(
                    ExitError::Config(format!("config file {} does not exist", path.display()))
                        .into(),
                );
            }
            return Ok((Some(path.to_path_buf()), Self::load(path)?));
        }

        let candidate = find_config(dir).or_else(|| user_config_path().filter(|p| p.exists()));
        match candidate {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok((Some(path), config))
            }
            None => Ok((None, Self::default())),
        }
    }

    /// Jira base URL: `JIRA_SERVER`, then `jira.server`.
    pub fn jira_server(&self) -> anyhow::Result<String> {
        self.jira_server_with(|k| std::env::var(k).ok())
    }

    pub fn jira_server_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<String> {
        lookup(jira::SERVER_VAR)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.jira.server.clone())
            .ok_or_else(|| {
                ExitError::MissingSetting {
                    key: format!("{} (or jira.server)", jira::SERVER_VAR),
                }
                .into()
            })
    }

    /// Jira project key: the explicit one, then `jira.project`.
    pub fn jira_project(&self, explicit: Option<&str>) -> anyhow::Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.jira.project.clone())
            .ok_or_else(|| {
                ExitError::MissingSetting {
                    key: "jira.project (or --project)".into(),
                }
                .into()
            })
    }
}
