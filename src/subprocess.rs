use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ExitError;

/// Captured outcome of one external command.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl RunOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Deserialize stdout; `source` names the command in the parse error.
    pub fn parse_json<T: serde::de::DeserializeOwned>(&self, source: &str) -> anyhow::Result<T> {
        serde_json::from_str(&self.stdout).map_err(|e| ExitError::parse(source, e).into())
    }

    /// Combined stderr and stdout, trimmed, for diagnostics.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        match (stderr.is_empty(), stdout.is_empty()) {
            (false, false) => format!("{stderr}\n{stdout}"),
            (false, true) => stderr.to_string(),
            (true, _) => stdout.to_string(),
        }
    }
}

/// Executes a [`Tool`] invocation and captures its output.
///
/// Every external call goes through this seam so that tests can swap the
/// real process launcher for a scripted one.
pub trait CommandRunner: Send + Sync {
    fn run(&self, tool: &Tool) -> anyhow::Result<RunOutput>;
}

/// Runs tools as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, tool: &Tool) -> anyhow::Result<RunOutput> {
        let mut cmd = Command::new(&tool.program);
        cmd.args(&tool.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &tool.cwd {
            cmd.current_dir(dir);
        }

        tracing::trace!(command = %tool.display(), "spawning");
        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::Error::from(ExitError::ToolNotFound {
                    tool: tool.program.clone(),
                })
            } else {
                anyhow::Error::new(e).context(format!("running {}", tool.program))
            }
        })?;

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Builder describing one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl Tool {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| (*s).to_string()));
        self
    }

    /// Run inside the given directory instead of the current one.
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|a| {
            if a.is_empty() || a.contains(char::is_whitespace) {
                format!("{a:?}")
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }

    pub fn run(&self, runner: &dyn CommandRunner) -> anyhow::Result<RunOutput> {
        runner.run(self)
    }

    /// Like [`Tool::run`], but a non-zero exit becomes [`ExitError::ToolFailed`].
    pub fn run_ok(&self, runner: &dyn CommandRunner) -> anyhow::Result<RunOutput> {
        let output = self.run(runner)?;
        if output.success() {
            Ok(output)
        } else {
            Err(ExitError::ToolFailed {
                tool: self.program.clone(),
                code: output.exit_code,
                message: output.diagnostic(),
            }
            .into())
        }
    }
}
