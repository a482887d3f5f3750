use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ACCEPT_JSON, Repo, encode_path_segment};
use crate::error::ExitError;
use crate::subprocess::{CommandRunner, Tool};

/// A repository label as GitHub stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Six hex digits, no leading `#`.
    pub color: String,
}

impl Label {
    pub fn new(name: &str, description: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            color: color.trim_start_matches('#').to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Generate a random six-digit hex color, e.g. `3FA2C1`.
pub fn random_color() -> String {
    let value: u32 = rand::rng().random_range(0..=0x00FF_FFFF);
    format!("{value:06X}")
}

/// Groups of the default label catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LabelCategory {
    Env,
    Type,
    Workflow,
}

// (name, description, color)
type Entry = (&'static str, &'static str, &'static str);

const ENV_LABELS: &[Entry] = &[
    ("env: cross-platform", "Affects multiple operating systems.", "FE6F5E"),
    ("env: linux", "Pertaining to Linux-based systems.", "00FA9A"),
    ("env: macos", "Exclusively for macOS-related topics.", "6A5ACD"),
    ("env: windows", "Windows-specific issues or improvements.", "FFD700"),
];

const TYPE_LABELS: &[Entry] = &[
    ("type: build", "Changes to the code building process.", "8B0000"),
    ("type: chore", "Routine tasks and project maintenance.", "FF4500"),
    ("type: ci", "Adjustments in CI processes and tools.", "00CED1"),
    ("type: docs", "Exclusively for documentation updates.", "9370DB"),
    ("type: feat", "For new functionalities or significant enhancements.", "228B22"),
    ("type: fix", "Used to correct and address software defects.", "FF1493"),
    ("type: perf", "Enhances efficiency and speed of existing features.", "4682B4"),
    ("type: refactor", "Internal code improvements without behavior change.", "D2691E"),
    ("type: revert", "Undoing previous code changes.", "A52A2A"),
    ("type: style", "For non-functional code style improvements.", "FF6347"),
    ("type: test", "Related to adding or improving test cases.", "2E8B57"),
];

const WORKFLOW_LABELS: &[Entry] = &[
    ("workflow: critical", "High-priority, severe impact issues.", "B22222"),
    ("workflow: discussion-needed", "Requires collective decision-making.", "6495ED"),
    ("workflow: good-first-issue", "Suitable for new contributors.", "FF69B4"),
    ("workflow: help-wanted", "Open call for community contributors.", "DA70D6"),
    ("workflow: needs-triage", "New, unaddressed issues for review.", "40E0D0"),
    ("workflow: up-for-grabs", "Ready for immediate work, not urgent.", "FF8C00"),
];

impl LabelCategory {
    pub const ALL: [Self; 3] = [Self::Env, Self::Type, Self::Workflow];

    /// Default labels in this category.
    pub fn labels(self) -> Vec<Label> {
        let entries = match self {
            Self::Env => ENV_LABELS,
            Self::Type => TYPE_LABELS,
            Self::Workflow => WORKFLOW_LABELS,
        };
        entries
            .iter()
            .map(|(name, description, color)| Label::new(name, description, color))
            .collect()
    }

    /// Full default catalog, or just the given categories.
    pub fn catalog(only: &[Self]) -> Vec<Label> {
        let categories: &[Self] = if only.is_empty() { &Self::ALL } else { only };
        categories.iter().flat_map(|c| c.labels()).collect()
    }
}

/// Label CRUD over `gh api`.
pub struct LabelManager<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> LabelManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// All labels defined in the repository.
    pub fn list(&self, repo: &Repo) -> anyhow::Result<Vec<Label>> {
        tracing::info!("Retrieving labels from '{repo}'...");

        let output = Tool::new("gh")
            .args(&["api", "--method", "GET", "-H", ACCEPT_JSON, "--paginate"])
            .arg(&format!("{}/labels", repo.api_path()))
            .run_ok(self.runner)
            .inspect_err(|e| tracing::error!("Failed to retrieve labels: {e}"))?;

        let labels = parse_label_pages(&output.stdout)
            .inspect_err(|e| tracing::error!("Failed to parse labels: {e}"))?;
        for label in &labels {
            tracing::debug!("Label '{}' retrieved successfully.", label.name);
        }
        Ok(labels)
    }

    pub fn list_names(&self, repo: &Repo) -> anyhow::Result<Vec<String>> {
        Ok(self.list(repo)?.into_iter().map(|l| l.name).collect())
    }

    pub fn add(&self, repo: &Repo, label: &Label) -> anyhow::Result<()> {
        let name_field = format!("name={}", label.name);
        let description_field = format!(
            "description={}",
            label.description.as_deref().unwrap_or("")
        );
        let color_field = format!("color={}", label.color);

        Tool::new("gh")
            .args(&["api", "--method", "POST", "-H", ACCEPT_JSON])
            .arg(&format!("{}/labels", repo.api_path()))
            .args(&["-f", &name_field, "-f", &description_field, "-f", &color_field])
            .run_ok(self.runner)
            .inspect_err(|e| tracing::error!("Failed to add label '{}': {e}", label.name))?;

        tracing::debug!("Label '{}' added successfully.", label.name);
        Ok(())
    }

    pub fn remove(&self, repo: &Repo, name: &str) -> anyhow::Result<()> {
        Tool::new("gh")
            .args(&["api", "--method", "DELETE", "-H", ACCEPT_JSON])
            .arg(&format!("{}/labels/{}", repo.api_path(), encode_path_segment(name)))
            .run_ok(self.runner)
            .inspect_err(|e| tracing::error!("Failed to remove label '{name}': {e}"))?;

        tracing::debug!("Label '{name}' removed successfully.");
        Ok(())
    }

    /// Remove every label in the repository. Stops at the first failure.
    pub fn clear(&self, repo: &Repo) -> anyhow::Result<Vec<String>> {
        let names = self.list_names(repo)?;
        for name in &names {
            self.remove(repo, name)?;
        }
        tracing::info!("Removed {} labels from '{repo}'.", names.len());
        Ok(names)
    }

    /// Add each label in order. Stops at the first failure.
    pub fn setup(&self, repo: &Repo, labels: &[Label]) -> anyhow::Result<usize> {
        for label in labels {
            self.add(repo, label)?;
        }
        tracing::info!("All {} labels added successfully.", labels.len());
        Ok(labels.len())
    }
}

/// `gh api --paginate` prints one JSON array per page, back to back.
fn parse_label_pages(stdout: &str) -> anyhow::Result<Vec<Label>> {
    let mut labels = Vec::new();
    for page in serde_json::Deserializer::from_str(stdout).into_iter::<Vec<Label>>() {
        labels.extend(page.map_err(|e| ExitError::parse("gh api labels", e))?);
    }
    Ok(labels)
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

    #[test]
    fn catalog_has_all_default_labels() {
        let catalog = LabelCategory::catalog(&[]);
        assert_eq!(catalog.len(), 21);
        assert!(catalog.iter().any(|l| l.name == "type: feat" && l.color == "228B22"));
        assert!(catalog.iter().all(|l| l.color.len() == 6));
    }

    #[test]
    fn catalog_filters_by_category() {
        let env = LabelCategory::catalog(&[LabelCategory::Env]);
        assert_eq!(env.len(), 4);
        assert!(env.iter().all(|l| l.name.starts_with("env: ")));
    }

    #[test]
    fn random_color_is_six_hex_digits() {
        for _ in 0..32 {
            let color = random_color();
            assert_eq!(color.len(), 6);
            assert!(color.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn label_new_normalizes_color() {
        let label = Label::new("x", "", "#a1b2c3");
        assert_eq!(label.color, "A1B2C3");
        assert_eq!(label.description, None);
    }

    #[test]
    fn add_then_list_then_remove_round_trip() {
        let gh = FakeGitHub::new();
        let labels = LabelManager::new(&gh);
        let repo = repo();

        labels.add(&repo, &Label::new("type: fix", "Bugs", "FF1493")).unwrap();
        assert!(labels.list_names(&repo).unwrap().contains(&"type: fix".to_string()));

        labels.remove(&repo, "type: fix").unwrap();
        assert!(!labels.list_names(&repo).unwrap().contains(&"type: fix".to_string()));
    }

    #[test]
    fn adding_duplicate_label_fails() {
        let gh = FakeGitHub::new();
        let labels = LabelManager::new(&gh);
        let label = Label::new("env: linux", "", "00FA9A");
        labels.add(&repo(), &label).unwrap();
        let err = labels.add(&repo(), &label).unwrap_err();
        assert_eq!(failure_kind(&err), Some(FailureKind::ToolInvocation));
    }

    #[test]
    fn removing_missing_label_fails() {
        let gh = FakeGitHub::new();
        let err = LabelManager::new(&gh).remove(&repo(), "nope").unwrap_err();
        assert_eq!(failure_kind(&err), Some(FailureKind::ToolInvocation));
    }

    #[test]
    fn setup_then_clear() {
        let gh = FakeGitHub::new();
        let labels = LabelManager::new(&gh);
        let catalog = LabelCategory::catalog(&[LabelCategory::Workflow]);

        assert_eq!(labels.setup(&repo(), &catalog).unwrap(), 6);
        assert_eq!(labels.list(&repo()).unwrap().len(), 6);

        let removed = labels.clear(&repo()).unwrap();
        assert_eq!(removed.len(), 6);
        assert!(labels.list(&repo()).unwrap().is_empty());
    }

    #[test]
    fn remove_encodes_label_name() {
        let runner = ScriptedRunner::new().on(&["gh", "api"], RunOutput::ok(""));
        LabelManager::new(&runner).remove(&repo(), "type: fix").unwrap();
        let calls = runner.calls();
        assert_eq!(
            calls[0].last().map(String::as_str),
            Some("repos/octo/widgets/labels/type%3A%20fix")
        );
    }

    #[test]
    fn list_merges_paginated_output() {
        let pages = r#"[{"name":"a","description":null,"color":"000000"}]
[{"name":"b","description":"B","color":"FFFFFF"}]"#;
        let runner = ScriptedRunner::new().on(&["gh", "api"], RunOutput::ok(pages));
        let names = LabelManager::new(&runner).list_names(&repo()).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn list_reports_malformed_json() {
        let runner = ScriptedRunner::new().on(&["gh", "api"], RunOutput::ok("[{oops"));
        let err = LabelManager::new(&runner).list(&repo()).unwrap_err();
        assert_eq!(failure_kind(&err), Some(FailureKind::Parse));
    }
}
