//! Server configuration: defaults, optional TOML file, `RUNBOUND_` environment

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use runbound_process::{
    LimitDefaults, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_MS, MAX_OUTPUT_BYTES, MAX_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn, Level};

use crate::error::ConfigError;

const DEFAULT_ENV_PREFIX: &str = "RUNBOUND";

/// Runtime settings for the server and the `exec` subcommand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Timeout used when a request omits `timeout_ms`
    pub default_timeout_ms: u64,
    /// Per-stream ceiling used when a request omits `max_output_bytes`
    pub default_max_output_bytes: u64,
    /// Shell executable; detected from the host when unset
    pub shell: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES as u64,
            shell: None,
        }
    }
}

impl ServerConfig {
    /// Check the loaded values, clamping defaults that exceed the hard caps
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "default_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.default_max_output_bytes == 0 {
            return Err(ConfigError::Validation(
                "default_max_output_bytes must be greater than 0".to_string(),
            ));
        }

        if self.default_timeout_ms > MAX_TIMEOUT_MS {
            warn!(
                configured = self.default_timeout_ms,
                cap = MAX_TIMEOUT_MS,
                "default_timeout_ms above hard cap, clamping"
            );
            self.default_timeout_ms = MAX_TIMEOUT_MS;
        }
        if self.default_max_output_bytes > MAX_OUTPUT_BYTES as u64 {
            warn!(
                configured = self.default_max_output_bytes,
                cap = MAX_OUTPUT_BYTES,
                "default_max_output_bytes above hard cap, clamping"
            );
            self.default_max_output_bytes = MAX_OUTPUT_BYTES as u64;
        }

        self.parse_log_level()?;
        Ok(self)
    }

    /// Defaults handed to limit resolution
    pub fn limit_defaults(&self) -> LimitDefaults {
        LimitDefaults {
            timeout_ms: self.default_timeout_ms.min(MAX_TIMEOUT_MS),
            max_output_bytes: usize::try_from(self.default_max_output_bytes)
                .unwrap_or(MAX_OUTPUT_BYTES)
                .min(MAX_OUTPUT_BYTES),
        }
    }

    pub fn parse_log_level(&self) -> Result<Level, ConfigError> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => Err(ConfigError::Validation(format!(
                "Unknown log level '{}', expected trace|debug|info|warn|error",
                other
            ))),
        }
    }
}

/// Loads [`ServerConfig`] from layered sources
pub struct ConfigLoader {
    /// Configuration file path
    config_path: PathBuf,
    /// Whether a missing file is an error
    required: bool,
    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    /// Loader reading the per-user config file if it exists
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            required: false,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Loader for an explicit file, which must exist
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            required: true,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// `<config_dir>/runbound/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("runbound")
            .join("config.toml")
    }

    /// Merge file and environment over the defaults, then validate
    pub fn load(&self) -> Result<ServerConfig, ConfigError> {
        debug!(
            path = %self.config_path.display(),
            required = self.required,
            env_prefix = %self.env_prefix,
            "Loading configuration"
        );

        let builder = Config::builder()
            .add_source(
                File::from(self.config_path.clone())
                    .format(FileFormat::Toml)
                    .required(self.required),
            )
            .add_source(Environment::with_prefix(&self.env_prefix).try_parsing(true));

        let config = builder.build()?;
        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validated()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_when_file_absent() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new().with_env_prefix("RUNBOUND_TEST_ABSENT");
        let loader = ConfigLoader {
            config_path: dir.path().join("missing.toml"),
            ..loader
        };

        let config = loader.load().unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = ConfigLoader::with_path(dir.path().join("missing.toml"))
            .with_env_prefix("RUNBOUND_TEST_MISSING")
            .load();

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "log_level = \"debug\"\ndefault_timeout_ms = 5000\nshell = \"/bin/sh\"\n",
        );

        let config = ConfigLoader::with_path(path)
            .with_env_prefix("RUNBOUND_TEST_FILE")
            .load()
            .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.default_timeout_ms, 5000);
        assert_eq!(config.default_max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES as u64);
        assert_eq!(config.shell.as_deref(), Some("/bin/sh"));
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "default_timeout_ms = 5000\n");
        std::env::set_var("RUNBOUND_TEST_ENV_DEFAULT_TIMEOUT_MS", "7000");

        let result = ConfigLoader::with_path(path)
            .with_env_prefix("RUNBOUND_TEST_ENV")
            .load();
        std::env::remove_var("RUNBOUND_TEST_ENV_DEFAULT_TIMEOUT_MS");

        assert_eq!(result.unwrap().default_timeout_ms, 7000);
    }

    #[test]
    fn test_zero_default_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "default_max_output_bytes = 0\n");

        let result = ConfigLoader::with_path(path)
            .with_env_prefix("RUNBOUND_TEST_ZERO")
            .load();

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_oversized_defaults_are_clamped() {
        let config = ServerConfig {
            default_timeout_ms: MAX_TIMEOUT_MS * 10,
            default_max_output_bytes: u64::MAX,
            ..ServerConfig::default()
        }
        .validated()
        .unwrap();

        assert_eq!(config.default_timeout_ms, MAX_TIMEOUT_MS);
        assert_eq!(config.limit_defaults().max_output_bytes, MAX_OUTPUT_BYTES);
    }

    #[test]
    fn test_log_level_parsing() {
        let mut config = ServerConfig::default();
        assert_eq!(config.parse_log_level().unwrap(), Level::INFO);

        config.log_level = "WARN".to_string();
        assert_eq!(config.parse_log_level().unwrap(), Level::WARN);

        config.log_level = "loud".to_string();
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_default_config_path() {
        let path = ConfigLoader::default_config_path();
        assert!(path.ends_with("runbound/config.toml"));
    }
}
