//! Configuration loading and environment variable handling

use crate::domains::logging::{FileRotation, LogFormat, LogLevel, LogTarget, LoggingConfig};
use crate::domains::report::{ReportConfig, ReportFormat};
use crate::domains::runtime::RuntimeConfig;
use crate::domains::CottConfig;
use crate::error::{ConfigError, ConfigResult};
use log::debug;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with the `COTT` prefix
    pub fn new() -> Self {
        Self {
            prefix: "COTT".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<CottConfig> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        self.from_yaml_str(&content)
    }

    /// Parse YAML, apply environment overrides and validate
    pub fn from_yaml_str(&self, content: &str) -> ConfigResult<CottConfig> {
        let mut config: CottConfig = serde_yaml::from_str(content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load from `config_path`, or `config.yaml` in the working directory
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<CottConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_file(PathBuf::from("config.yaml")),
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&self, config: &mut CottConfig) -> ConfigResult<()> {
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_report_overrides(&mut config.report)?;
        self.apply_runtime_overrides(&mut config.runtime)?;
        self.apply_execution_overrides(&mut config.execution)?;
        Ok(())
    }

    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Ok(level) = self.get_env_var("LOG_LEVEL") {
            config.level = LogLevel::from_str(&level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        if let Ok(file_path) = self.get_env_var("LOG_FILE_PATH") {
            let new_path = PathBuf::from(file_path);
            let existing = config.targets.iter_mut().find_map(|t| match t {
                LogTarget::File { path, .. } => Some(path),
                LogTarget::Console { .. } => None,
            });
            match existing {
                Some(path) => *path = new_path,
                None => config.targets.push(LogTarget::File {
                    path: new_path,
                    level: None,
                    rotation: FileRotation::default(),
                }),
            }
        }

        Ok(())
    }

    fn apply_report_overrides(&self, config: &mut ReportConfig) -> ConfigResult<()> {
        if let Ok(file_path) = self.get_env_var("REPORT_FILE_PATH") {
            config.file_path = PathBuf::from(file_path);
        }

        if let Ok(format) = self.get_env_var("REPORT_FORMAT") {
            config.format = ReportFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid REPORT_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn apply_runtime_overrides(&self, config: &mut RuntimeConfig) -> ConfigResult<()> {
        match config {
            RuntimeConfig::DockerCli { binary, .. } => {
                if let Ok(value) = self.get_env_var("DOCKER_BINARY") {
                    *binary = value;
                }
            }
            RuntimeConfig::DockerApi { endpoint, .. } => {
                if let Ok(value) = self.get_env_var("DOCKER_ENDPOINT") {
                    *endpoint = value;
                }
            }
        }
        Ok(())
    }

    fn apply_execution_overrides(
        &self,
        config: &mut crate::domains::execution::ExecutionConfig,
    ) -> ConfigResult<()> {
        if let Ok(name) = self.get_env_var("RESOURCE_NAME") {
            config.resource_name = name;
        }

        if let Ok(host) = self.get_env_var("INSTANCE_HOST") {
            config.host = host;
        }

        if let Ok(attempts) = self.get_env_var("READINESS_MAX_ATTEMPTS") {
            config.readiness_max_attempts = attempts.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid READINESS_MAX_ATTEMPTS: {}", e))
            })?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
