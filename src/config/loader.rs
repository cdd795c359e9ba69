//! Configuration loader for forest-inventory
//!
//! This module provides the `ConfigLoader` struct that handles loading
//! configuration from multiple sources with proper precedence.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "FOREST_CONFIG_DIR";

/// Environment variable for specific configuration file
const CONFIG_FILE_ENV: &str = "FOREST_CONFIG_FILE";

const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "FOREST";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

/// Configuration loader that handles layered configuration loading
///
/// Sources, lowest priority first:
/// 1. `default.toml` (required)
/// 2. `{environment}.toml` (optional)
/// 3. `local.toml` (optional)
/// 4. `FOREST_*` environment variables, e.g. `FOREST_CACHE__REDIS__URL`
///
/// When a single configuration file is given, it replaces steps 1-3.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a loader from `FOREST_CONFIG_DIR`, `FOREST_CONFIG_FILE` and
    /// `FOREST_APP_ENV`.
    ///
    /// # Errors
    ///
    /// Returns an error if both `FOREST_CONFIG_DIR` and `FOREST_CONFIG_FILE` are set.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from);
        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if config_dir.is_some() && config_file.is_some() {
            return Err(ConfigError::mutual_exclusivity(
                "FOREST_CONFIG_DIR and FOREST_CONFIG_FILE cannot both be set. \
                 Use FOREST_CONFIG_DIR for layered configuration or \
                 FOREST_CONFIG_FILE for a single configuration file.",
            ));
        }

        Ok(Self {
            config_dir: config_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    /// Layered loading from `config_dir`.
    pub fn with_config_dir(mut self, config_dir: impl Into<PathBuf>) -> Self {
        self.config_dir = config_dir.into();
        self.config_file = None;
        self
    }

    /// Load only `config_file` (plus environment variable overrides).
    pub fn with_config_file(mut self, config_file: impl Into<PathBuf>) -> Self {
        self.config_file = Some(config_file.into());
        self
    }

    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Load and validate the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a required file is missing, a source cannot be parsed, or
    /// the merged settings fail validation.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        settings.validate()?;

        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = Config::builder();

        let builder = match self.config_file {
            Some(ref config_file) => Self::add_file_source(builder, config_file, true)?,
            None => self.build_layered_config(builder)?,
        };

        Self::add_env_source(builder)
            .build()
            .map_err(ConfigError::from)
    }

    fn build_layered_config(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let default_path = self.config_dir.join("default.toml");
        let builder = Self::add_file_source(builder, &default_path, true)?;

        let env_path = self
            .config_dir
            .join(format!("{}.toml", self.environment.as_str()));
        let builder = Self::add_file_source(builder, &env_path, false)?;

        let local_path = self.config_dir.join("local.toml");
        Self::add_file_source(builder, &local_path, false)
    }

    fn add_file_source(
        builder: ConfigBuilder<DefaultState>,
        path: &Path,
        required: bool,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        if required && !path.is_file() {
            return Err(ConfigError::file_not_found(format!(
                "Required configuration file not found: {}",
                path.display()
            )));
        }

        let name = path.to_str().ok_or_else(|| {
            ConfigError::ParseError(format!("Non UTF-8 configuration path: {}", path.display()))
        })?;

        Ok(builder.add_source(File::new(name, FileFormat::Toml).required(required)))
    }

    /// `FOREST_SERVER__PORT` → `server.port`, `FOREST_CACHE__REDIS__ENABLED` →
    /// `cache.redis.enabled`.
    fn add_env_source(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
        builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        )
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            environment: AppEnvironment::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests touching FOREST_* variables must not interleave.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    /// Serializes tests that touch process env; a failed test doesn't block the rest.
    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    const DEFAULT_TOML: &str = r#"
        [database]
        url = "postgres://localhost/forest"

        [server]
        port = 8080

        [cache.redis]
        enabled = false
    "#;

    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            fs::write(temp_dir.path().join(name), content).expect("Failed to write config file");
        }
        temp_dir
    }

    /// Sets environment variables for one test and restores them on drop
    struct EnvGuard {
        vars_to_restore: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self {
                vars_to_restore: Vec::new(),
            }
        }

        fn set(&mut self, key: &str, value: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::set_var(key, value);
            }
        }

        fn remove(&mut self, key: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original_value) in self.vars_to_restore.iter().rev() {
                unsafe {
                    match original_value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_new_reads_environment_variables() {
        let _lock = lock_env();
        let mut env = EnvGuard::new();
        env.remove(CONFIG_FILE_ENV);
        env.set(CONFIG_DIR_ENV, "/etc/forest");
        env.set(AppEnvironment::ENV_VAR, "prod");

        let loader = ConfigLoader::new().expect("Should create loader");
        assert_eq!(loader.config_dir(), Path::new("/etc/forest"));
        assert!(loader.config_file().is_none());
        assert_eq!(loader.environment(), AppEnvironment::Production);
    }

    #[test]
    fn test_new_rejects_dir_and_file_together() {
        let _lock = lock_env();
        let mut env = EnvGuard::new();
        env.set(CONFIG_DIR_ENV, "/etc/forest");
        env.set(CONFIG_FILE_ENV, "/etc/forest/app.toml");

        assert!(matches!(
            ConfigLoader::new(),
            Err(ConfigError::MutualExclusivityError(_))
        ));
    }

    #[test]
    fn test_missing_default_toml() {
        let dir = setup_config_dir(&[]);
        let result = ConfigLoader::default().with_config_dir(dir.path()).load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_layered_precedence() {
        let _lock = lock_env();
        let dir = setup_config_dir(&[
            ("default.toml", DEFAULT_TOML),
            (
                "production.toml",
                r#"
                [server]
                port = 9000

                [cache.stands.nearby]
                local_seconds = 120
                distributed_seconds = 240
                "#,
            ),
            (
                "local.toml",
                r#"
                [server]
                port = 9100
                "#,
            ),
        ]);

        let settings = ConfigLoader::default()
            .with_config_dir(dir.path())
            .with_environment(AppEnvironment::Production)
            .load()
            .expect("Should load");

        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.cache.stands.nearby.local_seconds, 120);
        assert_eq!(settings.cache.stands.nearby.distributed_seconds, 240);
        assert_eq!(settings.database.url, "postgres://localhost/forest");
        assert!(!settings.cache.redis.enabled);
    }

    #[test]
    fn test_environment_overlay_is_optional() {
        let _lock = lock_env();
        let dir = setup_config_dir(&[("default.toml", DEFAULT_TOML)]);

        let settings = ConfigLoader::default()
            .with_config_dir(dir.path())
            .with_environment(AppEnvironment::Staging)
            .load()
            .expect("Should load");
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn test_env_var_overrides_file() {
        let _lock = lock_env();
        let mut env = EnvGuard::new();
        env.set("FOREST_SERVER__PORT", "7070");
        env.set("FOREST_CACHE__REDIS__KEY_PREFIX", "forest-ci");
        env.set("FOREST_CACHE__DEFAULT_TTL__LOCAL_SECONDS", "42");

        let dir = setup_config_dir(&[("default.toml", DEFAULT_TOML)]);
        let settings = ConfigLoader::default()
            .with_config_dir(dir.path())
            .load()
            .expect("Should load");

        assert_eq!(settings.server.port, 7070);
        assert_eq!(settings.cache.redis.key_prefix, "forest-ci");
        assert_eq!(settings.cache.default_ttl.local_seconds, 42);
        assert_eq!(settings.cache.default_ttl.distributed_seconds, 1800);
    }

    #[test]
    fn test_single_file_mode_skips_layers() {
        let _lock = lock_env();
        let dir = setup_config_dir(&[
            ("default.toml", "[server]\nport = 1111\n"),
            ("custom.toml", DEFAULT_TOML),
        ]);

        let settings = ConfigLoader::default()
            .with_config_dir(dir.path())
            .with_config_file(dir.path().join("custom.toml"))
            .load()
            .expect("Should load");
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let _lock = lock_env();
        let dir = setup_config_dir(&[("default.toml", "[server]\nport = 8080\n")]);

        let result = ConfigLoader::default().with_config_dir(dir.path()).load();
        match result {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "database.url"),
            other => panic!("Expected database.url validation error, got {:?}", other),
        }
    }
}
