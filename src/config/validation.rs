//! Configuration validation logic
//!
//! Validation runs once at load time; every check reports the dotted path of the
//! offending setting.

use crate::config::error::ConfigError;
use crate::config::settings::{
    CacheConfig, DatabaseConfig, FileSettings, LoggerSettings, RedisCacheConfig, ServerConfig,
    Settings,
};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

const VALID_DATABASE_SCHEMES: &[&str] = &["postgres://", "postgresql://"];

const VALID_REDIS_SCHEMES: &[&str] = &["redis://", "rediss://", "redis+unix://", "unix://"];

impl ServerConfig {
    /// Validate server configuration
    ///
    /// # Validation Rules
    /// - Port must be between 1 and 65535
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// Validate database configuration
    ///
    /// # Validation Rules
    /// - URL must be a PostgreSQL connection string
    /// - Max connections must be greater than 0
    /// - Min connections must not exceed max connections
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required. Please specify a valid database connection string.",
            ));
        }

        if !VALID_DATABASE_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::validation(
                "database.min_connections",
                format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            ));
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "database.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.file.format",
                format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// A bare level must be one of trace, debug, info, warn, error. Filter directive
    /// lists such as `forest_inventory=debug,info` are checked when the logger starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let is_directive_list = self.level.contains('=') || self.level.contains(',');
        if !is_directive_list && !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl RedisCacheConfig {
    /// Validate Redis settings. Skipped entirely when the tier is disabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        if !VALID_REDIS_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::validation(
                "cache.redis.url",
                format!(
                    "Invalid Redis URL '{}'. Expected one of the schemes: {}",
                    self.url,
                    VALID_REDIS_SCHEMES.join(", ")
                ),
            ));
        }

        if self.pool_size == 0 {
            return Err(ConfigError::validation(
                "cache.redis.pool_size",
                "Pool size must be greater than 0.",
            ));
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "cache.redis.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        if self.command_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "cache.redis.command_timeout_ms",
                "Command timeout must be greater than 0 milliseconds.",
            ));
        }

        if self.key_prefix.is_empty() || self.key_prefix.contains(['*', '?', '[', ']']) {
            return Err(ConfigError::validation(
                "cache.redis.key_prefix",
                "Key prefix must be non-empty and must not contain glob characters (*, ?, [, ]).",
            ));
        }

        Ok(())
    }
}

impl CacheConfig {
    /// Validate cache settings
    ///
    /// TTLs are not range-checked: zero is meaningful and disables the tier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local.max_capacity == 0 {
            return Err(ConfigError::validation(
                "cache.local.max_capacity",
                "Local cache capacity must be greater than 0.",
            ));
        }

        self.redis.validate()
    }
}

impl Settings {
    /// Validate all sections, returning the first error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logger.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.url = "postgres://localhost/forest".to_string();
        settings
    }

    #[test]
    fn test_default_settings_with_database_url_are_valid() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_server_config_invalid_values() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "server.port");
    }

    #[test]
    fn test_database_config_rejects_non_postgres_url() {
        let config = DatabaseConfig {
            url: "mysql://localhost/forest".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "database.url");
    }

    #[test]
    fn test_database_config_min_exceeds_max() {
        let config = DatabaseConfig {
            url: "postgresql://localhost/forest".to_string(),
            max_connections: 2,
            min_connections: 5,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "database.min_connections");
    }

    #[test]
    fn test_logger_level_rules() {
        let mut settings = LoggerSettings::default();
        settings.level = "loud".to_string();
        assert_eq!(field_of(settings.validate()), "logger.level");

        settings.level = "forest_inventory=debug,tower_http=warn".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_logger_file_format_rule() {
        let mut settings = LoggerSettings::default();
        settings.file.format = "xml".to_string();
        assert_eq!(field_of(settings.validate()), "logger.file.format");
    }

    #[test]
    fn test_redis_rules_apply_only_when_enabled() {
        let mut config = RedisCacheConfig {
            url: "http://localhost".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "cache.redis.url");

        config.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redis_key_prefix_rules() {
        let config = RedisCacheConfig {
            key_prefix: "forest*".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "cache.redis.key_prefix");

        let config = RedisCacheConfig {
            key_prefix: String::new(),
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "cache.redis.key_prefix");
    }

    #[test]
    fn test_cache_zero_ttls_are_allowed() {
        let mut settings = valid_settings();
        settings.cache.default_ttl.local_seconds = 0;
        settings.cache.stands.nearby.distributed_seconds = 0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_cache_zero_capacity_is_rejected() {
        let mut settings = valid_settings();
        settings.cache.local.max_capacity = 0;
        assert_eq!(field_of(settings.validate()), "cache.local.max_capacity");
    }
}
