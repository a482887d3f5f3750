//! Repokeeper - repository housekeeping for CI and maintainers

pub mod actions;
pub mod commands;
pub mod commits;
pub mod config;
pub mod error;
pub mod fakes;
pub mod github;
pub mod jira;
pub mod precommit;
pub mod subprocess;
pub mod telemetry;
pub mod toolchain;
