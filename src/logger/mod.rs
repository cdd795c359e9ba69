//! Logger Module
//!
//! A logging system based on `tracing-subscriber` with support for:
//! - Console output with color control
//! - File output in Full, Compact or JSON format, falling back to stderr on write errors

pub mod config;
pub mod error;
pub(crate) mod writer;

pub use config::*;
pub use error::LoggerError;

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use writer::LogFileWriter;

/// Install the global tracing subscriber described by `config`.
pub fn init_logger(config: LoggerConfig) -> Result<(), LoggerError> {
    config.validate()?;

    let filter = EnvFilter::try_new(&config.level).map_err(|e| {
        LoggerError::config(format!("Invalid log filter '{}': {}", config.level, e))
    })?;

    match (config.console.enabled, config.file.enabled) {
        (true, true) => init_both(&config, filter),
        (true, false) => init_console_only(&config.console, filter),
        (false, true) => init_file_only(&config.file, filter),
        (false, false) => Err(LoggerError::config(
            "At least one output (console or file) must be enabled",
        )),
    }
}

fn use_ansi(config: &ConsoleConfig) -> bool {
    config.colored && std::io::stdout().is_terminal()
}

fn init_error(e: impl std::fmt::Display) -> LoggerError {
    LoggerError::Init {
        message: e.to_string(),
    }
}

/// Console layer, built fresh for each subscriber stack it joins.
fn console_layer<S>(config: &ConsoleConfig) -> fmt::Layer<S> {
    fmt::layer()
        .with_ansi(use_ansi(config))
        .with_target(true)
        .with_level(true)
}

fn init_console_only(config: &ConsoleConfig, filter: EnvFilter) -> Result<(), LoggerError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(config))
        .try_init()
        .map_err(init_error)
}

fn init_file_only(config: &FileConfig, filter: EnvFilter) -> Result<(), LoggerError> {
    let writer = LogFileWriter::new(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Full => registry
            .with(fmt::layer().with_ansi(false).with_target(true).with_writer(writer))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .compact()
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().with_ansi(false).json().with_writer(writer))
            .try_init(),
    }
    .map_err(init_error)
}

fn init_both(config: &LoggerConfig, filter: EnvFilter) -> Result<(), LoggerError> {
    let writer = LogFileWriter::new(&config.file)?;

    // The file layer goes first; otherwise span fields formatted by the console layer
    // carry ANSI codes into the file (tokio-rs/tracing#1817).
    let registry = tracing_subscriber::registry().with(filter);
    match config.file.format {
        LogFormat::Full => registry
            .with(fmt::layer().with_ansi(false).with_target(true).with_writer(writer))
            .with(console_layer(&config.console))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .compact()
                    .with_writer(writer),
            )
            .with(console_layer(&config.console))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().with_ansi(false).json().with_writer(writer))
            .with(console_layer(&config.console))
            .try_init(),
    }
    .map_err(init_error)
}
