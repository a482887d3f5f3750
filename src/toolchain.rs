//! Rust toolchain channel extraction from `rust-toolchain.toml`.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;

use crate::error::ExitError;

pub const DEFAULT_TOOLCHAIN_FILE: &str = "rust-toolchain.toml";

fn re_channel() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r#"channel\s*=\s*"([0-9.]+)""#).expect("channel pattern is valid")
    })
}

/// Pull the numeric channel (e.g. `1.75.0`) out of toolchain file contents.
pub fn parse_channel(contents: &str) -> Option<&str> {
    re_channel()
        .captures(contents)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Read `path` and return its pinned channel version.
pub fn extract_channel(path: &Path) -> anyhow::Result<String> {
    tracing::info!("Extracting Rust version...");

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))
        .inspect_err(|e| tracing::error!("...error extracting Rust channel: {e:#}"))?;

    let version = parse_channel(&contents)
        .map(str::to_string)
        .ok_or_else(|| {
            ExitError::parse(
                path.display().to_string(),
                "no numeric `channel = \"...\"` entry",
            )
        })
        .inspect_err(|e| tracing::error!("...error extracting Rust channel: {e}"))?;

    tracing::debug!("...{version}...");
    tracing::debug!("...Rust version extracted successfully.");
    Ok(version)
}
