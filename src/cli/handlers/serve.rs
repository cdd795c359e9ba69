//! Serve command handler

use crate::config::{Environment, Settings};
use crate::server::Server;

/// Handler for the serve command
pub struct ServeCommandHandler {
    config: Settings,
    environment: Environment,
}

impl ServeCommandHandler {
    pub fn new(config: Settings, environment: Environment) -> Self {
        Self {
            config,
            environment,
        }
    }

    /// Start the server, or with `dry_run` only report the effective configuration.
    pub async fn execute(self, dry_run: bool) -> anyhow::Result<()> {
        if dry_run {
            self.validate_only()?;
            return Ok(());
        }

        Server::new(self.config, self.environment).run().await
    }

    /// Validate configuration without starting the server
    pub fn validate_only(&self) -> anyhow::Result<()> {
        self.config.validate()?;

        let cache = &self.config.cache;
        println!("✓ Configuration is valid ({})", self.environment);
        println!("✓ Server would bind to: {}", self.config.server.address());
        println!(
            "✓ Database pool: {}-{} connections",
            self.config.database.min_connections, self.config.database.max_connections
        );
        if cache.redis.enabled {
            println!(
                "✓ Cache: local ({} entries) + redis (prefix '{}')",
                cache.local.max_capacity, cache.redis.key_prefix
            );
        } else {
            println!("✓ Cache: local only ({} entries)", cache.local.max_capacity);
        }
        println!("Dry run completed successfully");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
