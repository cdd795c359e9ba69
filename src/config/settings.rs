//! Configuration settings structures for forest-inventory
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::cache::TtlPair;
use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "forest-inventory".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/forest-inventory.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Axum HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// PostGIS database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level or filter directives, e.g. "info" or "forest_inventory=debug,info"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert the file representation into the runtime [`LoggerConfig`].
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console_config = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file_config = self.file.into_file_config()?;

        LoggerConfig::new(console_config, file_config, self.level).map_err(|e| {
            ConfigError::ValidationError {
                field: "logger".to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl FileSettings {
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: e.to_string(),
            })?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format).map_err(
            |e| ConfigError::ValidationError {
                field: "logger.file".to_string(),
                message: e.to_string(),
            },
        )
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

fn default_local_max_capacity() -> u64 {
    10_000
}

fn default_local_time_to_idle() -> u64 {
    300
}

fn default_redis_enabled() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_pool_size() -> u32 {
    4
}

fn default_redis_connection_timeout() -> u64 {
    5
}

fn default_redis_command_timeout_ms() -> u64 {
    500
}

fn default_redis_key_prefix() -> String {
    "forest".to_string()
}

fn default_ttl() -> TtlConfig {
    TtlConfig::new(600, 1800)
}

fn default_nearby_ttl() -> TtlConfig {
    TtlConfig::new(300, 300)
}

fn default_high_value_ttl() -> TtlConfig {
    TtlConfig::new(1800, 1800)
}

fn default_statistics_ttl() -> TtlConfig {
    TtlConfig::new(3600, 7200)
}

/// Local (in-process) tier configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCacheConfig {
    /// Maximum number of entries
    #[serde(default = "default_local_max_capacity")]
    pub max_capacity: u64,

    /// Entries not read for this many seconds are evicted; 0 disables idle eviction
    #[serde(default = "default_local_time_to_idle")]
    pub time_to_idle_seconds: u64,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_local_max_capacity(),
            time_to_idle_seconds: default_local_time_to_idle(),
        }
    }
}

/// Redis (distributed) tier configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// When false the distributed tier is a no-op and only the local tier is used
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    /// Pool checkout timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,

    /// Per-command timeout in milliseconds
    #[serde(default = "default_redis_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Namespace prepended to every key as `{key_prefix}:`
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            connection_timeout: default_redis_connection_timeout(),
            command_timeout_ms: default_redis_command_timeout_ms(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

/// A local/distributed TTL pair in seconds. Zero skips that tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlConfig {
    pub local_seconds: u64,
    pub distributed_seconds: u64,
}

impl TtlConfig {
    pub const fn new(local_seconds: u64, distributed_seconds: u64) -> Self {
        Self {
            local_seconds,
            distributed_seconds,
        }
    }

    pub fn ttl_pair(&self) -> TtlPair {
        TtlPair::from_secs(self.local_seconds, self.distributed_seconds)
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        default_ttl()
    }
}

/// A TTL section as written in configuration, where either field may be left out.
#[derive(Deserialize)]
struct PartialTtl {
    local_seconds: Option<u64>,
    distributed_seconds: Option<u64>,
}

impl PartialTtl {
    fn or(self, fallback: TtlConfig) -> TtlConfig {
        TtlConfig::new(
            self.local_seconds.unwrap_or(fallback.local_seconds),
            self.distributed_seconds.unwrap_or(fallback.distributed_seconds),
        )
    }
}

fn ttl_or<'de, D: Deserializer<'de>>(
    deserializer: D,
    fallback: fn() -> TtlConfig,
) -> Result<TtlConfig, D::Error> {
    PartialTtl::deserialize(deserializer).map(|partial| partial.or(fallback()))
}

fn deserialize_default_ttl<'de, D: Deserializer<'de>>(d: D) -> Result<TtlConfig, D::Error> {
    ttl_or(d, default_ttl)
}

fn deserialize_nearby_ttl<'de, D: Deserializer<'de>>(d: D) -> Result<TtlConfig, D::Error> {
    ttl_or(d, default_nearby_ttl)
}

fn deserialize_high_value_ttl<'de, D: Deserializer<'de>>(d: D) -> Result<TtlConfig, D::Error> {
    ttl_or(d, default_high_value_ttl)
}

fn deserialize_statistics_ttl<'de, D: Deserializer<'de>>(d: D) -> Result<TtlConfig, D::Error> {
    ttl_or(d, default_statistics_ttl)
}

/// Per-query TTLs of the stand cache policy.
///
/// Lookups by id and the full listing use [`CacheConfig::default_ttl`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandCacheConfig {
    #[serde(
        default = "default_nearby_ttl",
        deserialize_with = "deserialize_nearby_ttl"
    )]
    pub nearby: TtlConfig,

    #[serde(
        default = "default_high_value_ttl",
        deserialize_with = "deserialize_high_value_ttl"
    )]
    pub high_value: TtlConfig,

    #[serde(
        default = "default_statistics_ttl",
        deserialize_with = "deserialize_statistics_ttl"
    )]
    pub statistics: TtlConfig,
}

impl Default for StandCacheConfig {
    fn default() -> Self {
        Self {
            nearby: default_nearby_ttl(),
            high_value: default_high_value_ttl(),
            statistics: default_statistics_ttl(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Local tier settings
    #[serde(default)]
    pub local: LocalCacheConfig,

    /// Redis tier settings
    #[serde(default)]
    pub redis: RedisCacheConfig,

    /// TTLs used by `get_or_load` and when promoting distributed hits
    #[serde(default = "default_ttl", deserialize_with = "deserialize_default_ttl")]
    pub default_ttl: TtlConfig,

    /// Stand query TTLs
    #[serde(default)]
    pub stands: StandCacheConfig,
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}
