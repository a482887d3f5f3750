use std::fmt;

/// Broad classification of a failure, independent of the tool that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    ToolInvocation,
    Parse,
    NotFound,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration error",
            Self::ToolInvocation => "tool invocation error",
            Self::Parse => "parse error",
            Self::NotFound => "not found",
        };
        f.write_str(name)
    }
}

/// Errors that cause repokeeper to exit with a failure status.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("missing required setting {key}")]
    MissingSetting { key: String },

    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed (exit {code}): {message}")]
    ToolFailed {
        tool: String,
        code: i32,
        message: String,
    },

    #[error("{service} returned HTTP {status}: {message}")]
    Http {
        service: String,
        status: u16,
        message: String,
    },

    #[error("failed to parse {source_name}: {detail}")]
    Parse { source_name: String, detail: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{0}")]
    CheckFailed(String),
}

impl ExitError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Config(_) | Self::MissingSetting { .. } => FailureKind::Configuration,
            Self::ToolNotFound { .. }
            | Self::ToolFailed { .. }
            | Self::Http { .. }
            | Self::CheckFailed(_) => FailureKind::ToolInvocation,
            Self::Parse { .. } => FailureKind::Parse,
            Self::NotFound { .. } => FailureKind::NotFound,
        }
    }

    pub fn parse(source_name: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            detail: detail.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

/// Classify an arbitrary error chain, if it carries an [`ExitError`].
pub fn failure_kind(err: &anyhow::Error) -> Option<FailureKind> {
    err.downcast_ref::<ExitError>().map(ExitError::kind)
}
