//! CLI module for forest-inventory
//!
//! - Argument parsing with clap
//! - Configuration merging (CLI args + config files + environment)
//! - Command dispatch

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, LogLevel};

use anyhow::Context;

use crate::config::Settings;
use crate::logger::init_logger;

/// Load configuration, initialize logging and run the selected command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let merger = ConfigurationMerger::from_cli(&cli).context("Failed to load configuration")?;
    let settings = merger
        .merge_cli_args(&cli)
        .context("Invalid configuration")?;

    init_logger_from_settings(&settings)?;

    execute_command(&cli, settings, merger.environment()).await
}

/// Initialize the global tracing subscriber from `settings.logger`.
pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<()> {
    let logger_config = settings
        .logger
        .clone()
        .into_logger_config()
        .context("Invalid logger configuration")?;

    init_logger(logger_config).context("Failed to initialize logger")
}
