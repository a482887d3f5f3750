use std::path::PathBuf;

use clap::Subcommand;

use crate::actions;
use crate::toolchain::{DEFAULT_TOOLCHAIN_FILE, extract_channel};

#[derive(Debug, Subcommand)]
pub enum ToolchainCommand {
    /// Print the pinned Rust channel and export it as the `version` output
    Channel {
        /// Path to the toolchain file
        #[arg(default_value = DEFAULT_TOOLCHAIN_FILE)]
        file: PathBuf,
    },
}

impl ToolchainCommand {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Self::Channel { file } => {
                let version = extract_channel(file)?;
                actions::set_output("version", &version)?;
                println!("{version}");
                Ok(())
            }
        }
    }
}
