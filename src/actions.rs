//! GitHub Actions step outputs.

use std::io::Write;
use std::path::Path;

use anyhow::Context;

pub const OUTPUT_VAR: &str = "GITHUB_OUTPUT";

/// Append `name=value` to the file named by `GITHUB_OUTPUT`.
///
/// Returns `false` (after a warning) when not running on CI.
pub fn set_output(name: &str, value: &str) -> anyhow::Result<bool> {
    let target = std::env::var_os(OUTPUT_VAR).filter(|v| !v.is_empty());
    set_output_in(target.as_deref().map(Path::new), name, value)
}

/// Like [`set_output`], with the output file given explicitly.
pub fn set_output_in(target: Option<&Path>, name: &str, value: &str) -> anyhow::Result<bool> {
    tracing::info!("Setting output variable '{name}' to '{value}'...");

    let Some(path) = target else {
        tracing::warn!("...not running on CI, skipping output variable set.");
        return Ok(false);
    };

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(file, "{name}={value}").with_context(|| format!("writing {}", path.display()))?;

    tracing::debug!("...output variable set successfully.");
    Ok(true)
}
