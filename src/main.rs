use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use repokeeper::commands::caches::CachesCommand;
use repokeeper::commands::commits::CommitsCommand;
use repokeeper::commands::labels::LabelsCommand;
use repokeeper::commands::release::{IssueCommand, ReleaseCommand};
use repokeeper::commands::setup::SetupArgs;
use repokeeper::commands::toolchain::ToolchainCommand;
use repokeeper::commands::{self, Context};
use repokeeper::config::Config;
use repokeeper::error::failure_kind;
use repokeeper::subprocess::SystemRunner;
use repokeeper::telemetry::TelemetryConfig;

#[derive(Debug, Parser)]
#[command(
    name = "repokeeper",
    version,
    about = "Repository housekeeping: commit validation, labels, caches, and Jira releases"
)]
struct Cli {
    /// Config file [default: .repokeeper.toml or .repokeeper.json, then the user config]
    #[arg(long, global = true, env = "REPOKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log file [default: logging.file]
    #[arg(long, global = true, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Log to stderr only
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate commit messages against the commit convention
    Commits {
        #[command(subcommand)]
        command: CommitsCommand,
    },
    /// Manage GitHub repository labels
    Labels {
        #[command(subcommand)]
        command: LabelsCommand,
    },
    /// Inspect and prune GitHub Actions caches
    Caches {
        #[command(subcommand)]
        command: CachesCommand,
    },
    /// Manage Jira releases
    Release {
        #[command(subcommand)]
        command: ReleaseCommand,
    },
    /// Look up Jira issues
    Issue {
        #[command(subcommand)]
        command: IssueCommand,
    },
    /// Read the pinned Rust toolchain
    Toolchain {
        #[command(subcommand)]
        command: ToolchainCommand,
    },
    /// Install pre-commit hooks in a repository
    Setup(SetupArgs),
    /// Print the JSON Schema for .repokeeper.toml
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Commits { .. } => "commits",
            Self::Labels { .. } => "labels",
            Self::Caches { .. } => "caches",
            Self::Release { .. } => "release",
            Self::Issue { .. } => "issue",
            Self::Toolchain { .. } => "toolchain",
            Self::Setup(_) => "setup",
            Self::Schema => "schema",
        }
    }
}

fn telemetry_config(cli: &Cli, config: &Config) -> TelemetryConfig {
    let log_file = if cli.no_log_file {
        None
    } else {
        cli.log_file
            .clone()
            .or_else(|| config.logging.file.clone())
            .filter(|p| !p.as_os_str().is_empty())
    };
    TelemetryConfig {
        level: config.logging.level.clone(),
        verbosity: cli.verbose,
        log_file,
        ansi: std::io::stderr().is_terminal(),
    }
}

/// Stderr-only logging for failures that happen before the config is known.
/// Returns whether a subscriber is now installed.
fn fallback_telemetry(cli: &Cli) -> bool {
    TelemetryConfig {
        verbosity: cli.verbose,
        ansi: std::io::stderr().is_terminal(),
        ..TelemetryConfig::default()
    }
    .init()
    .is_ok()
}

fn run(cli: Cli, logging: &mut bool) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (config_path, config) = match Config::discover(cli.config.as_deref(), &cwd) {
        Ok(found) => found,
        Err(e) => {
            *logging = fallback_telemetry(&cli);
            return Err(e);
        }
    };
    if let Err(e) = telemetry_config(&cli, &config).init() {
        *logging = fallback_telemetry(&cli);
        return Err(e);
    }
    *logging = true;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();
    match &config_path {
        Some(path) => tracing::debug!("loaded config from {}", path.display()),
        None => tracing::debug!("no config file found, using defaults"),
    }

    let ctx = Context::new(config, Box::new(SystemRunner));
    match cli.command {
        Commands::Commits { command } => command.execute(&ctx),
        Commands::Labels { command } => command.execute(&ctx),
        Commands::Caches { command } => command.execute(&ctx),
        Commands::Release { command } => command.execute(&ctx),
        Commands::Issue { command } => command.execute(&ctx),
        Commands::Toolchain { command } => command.execute(),
        Commands::Setup(args) => args.execute(&ctx),
        Commands::Schema => commands::schema::run_schema(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging = false;
    match run(cli, &mut logging) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if !logging => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
        Err(e) => {
            match failure_kind(&e) {
                Some(kind) => tracing::error!(%kind, "{e:#}"),
                None => tracing::error!("{e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
