//! Wrappers over the GitHub CLI (`gh`).
//!
//! Labels go through `gh api` (REST paths), caches through `gh cache`.

mod caches;
mod labels;

use std::fmt;

pub use caches::{Cache, CacheManager, PrunePlan};
pub use labels::{Label, LabelCategory, LabelManager, random_color};

use crate::error::ExitError;

/// Accept header sent with every `gh api` call.
pub const ACCEPT_JSON: &str = "Accept: application/vnd.github+json";

/// A fully-qualified `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl Repo {
    /// Resolve `owner/name`, or a bare `name` qualified with `default_owner`.
    pub fn resolve(input: &str, default_owner: Option<&str>) -> anyhow::Result<Self> {
        let input = input.trim();
        if let Some((owner, name)) = input.split_once('/') {
            if owner.is_empty() || name.is_empty() || name.contains('/') {
                return Err(ExitError::Config(format!(
                    "invalid repository {input:?}: expected owner/name"
                ))
                .into());
            }
            return Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            });
        }
        if input.is_empty() {
            return Err(ExitError::Config("repository name is empty".into()).into());
        }
        match default_owner {
            Some(owner) if !owner.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: input.to_string(),
            }),
            _ => Err(ExitError::MissingSetting {
                key: "github.owner (or pass the repository as owner/name)".into(),
            }
            .into()),
        }
    }

    /// REST path prefix, `repos/{owner}/{name}`.
    pub fn api_path(&self) -> String {
        format!("repos/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Percent-encode one URL path segment (RFC 3986 unreserved set kept as-is).
pub fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
