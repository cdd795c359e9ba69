//! Configuration merger for CLI arguments and config files
//!
//! Precedence, highest first: `serve` flags, global flags, `FOREST_*` environment
//! variables, configuration files.

use super::parser::{Cli, Commands};
use crate::config::{ConfigError, ConfigLoader, Environment, Settings};

/// Loads file-based configuration and applies CLI overrides on top of it.
pub struct ConfigurationMerger {
    base_config: Settings,
    environment: Environment,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings, environment: Environment) -> Self {
        Self {
            base_config,
            environment,
        }
    }

    /// Load configuration the way `cli` asks for.
    ///
    /// `--config` selects a single file and `--env` overrides `FOREST_APP_ENV`.
    ///
    /// # Errors
    /// Returns ConfigError if configuration loading or validation fails
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;

        if let Some(path) = &cli.config {
            loader = loader.with_config_file(path);
        }
        if let Some(env) = cli.env {
            loader = loader.with_environment(env.into());
        }

        tracing::debug!(
            config_dir = %loader.config_dir().display(),
            config_file = ?loader.config_file(),
            environment = %loader.environment(),
            "Loading configuration"
        );

        let settings = loader.load()?;
        Ok(Self::new(settings, loader.environment()))
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Apply CLI overrides to the loaded configuration and validate the result.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        let Commands::Serve {
            host,
            port,
            log_level,
            ..
        } = cli.resolved_command();

        if let Some(host) = host {
            config.server.host = host;
        }
        if let Some(port) = port {
            config.server.port = port;
        }
        if let Some(level) = log_level {
            config.logger.level = level.as_str().to_string();
        }

        config.validate()?;
        Ok(config)
    }
}
