// src/config/loader.rs
//! Layered configuration loader
//!
//! Defaults are overlaid by each existing configuration file in order, then
//! by `CAM_<SECTION>_<KEY>` environment variables.

use crate::config::{constants::paths, CamConfig};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    current_config: Arc<RwLock<CamConfig>>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File does not exist
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Malformed TOML or wrongly typed value
    #[error("Configuration parse error: {0}")]
    ParseError(String),

    /// Values parsed but are inconsistent
    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    /// File could not be read or written
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl ConfigLoader {
    /// Create a loader over the standard search paths
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths, later paths taking precedence
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            current_config: Arc::new(RwLock::new(CamConfig::default())),
        }
    }

    /// Load configuration, applying overrides from the process environment
    pub fn load_config(&mut self) -> Result<CamConfig, ConfigError> {
        self.load_config_with_env(std::env::vars())
    }

    /// Load configuration with an explicit set of environment variables
    pub fn load_config_with_env<I>(&mut self, vars: I) -> Result<CamConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = self.load_and_merge_configs(vars)?;
        *self.current_config.write() = config.clone();
        info!(
            block_count = config.acquisition.default_block_count,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Get current configuration
    pub fn get_current_config(&self) -> CamConfig {
        self.current_config.read().clone()
    }

    /// Configuration files consulted, in precedence order
    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Validate a configuration file on its own, without loading it
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let value = self.load_config_file(path)?;
        let mut merged = Self::defaults_value()?;
        merge_toml_values(&mut merged, value);
        Self::finish(merged).map(|_| ())
    }

    /// Export current configuration to file
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let config = self.get_current_config();
        let toml_content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_and_merge_configs<I>(&self, vars: I) -> Result<CamConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = Self::defaults_value()?;

        for config_path in &self.config_paths {
            match self.load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "merging configuration file");
                    merge_toml_values(&mut merged, file_config);
                }
                Err(ConfigError::FileNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        apply_environment_overrides(&mut merged, vars);
        Self::finish(merged)
    }

    fn defaults_value() -> Result<toml::Value, ConfigError> {
        toml::Value::try_from(CamConfig::default()).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn finish(merged: toml::Value) -> Result<CamConfig, ConfigError> {
        let config: CamConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

        config
            .validate_consistency()
            .map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;

        Ok(config)
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(paths::SYSTEM_CONFIG_PATH),
            PathBuf::from(paths::DEFAULT_CONFIG_FILE),
            PathBuf::from(paths::LOCAL_CONFIG_FILE),
        ]
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// Apply `CAM_<SECTION>_<KEY>` overrides
///
/// The section is the first underscore-separated word, the key is the rest,
/// so `CAM_SIMULATOR_FRAME_PERIOD_MS` sets `simulator.frame_period_ms`.
fn apply_environment_overrides<I>(config: &mut toml::Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let toml::Value::Table(root) = config else {
        return;
    };

    for (name, raw) in vars {
        let Some(stripped) = name.strip_prefix(paths::ENV_PREFIX) else {
            continue;
        };
        let lowered = stripped.to_lowercase();
        let Some((section, key)) = lowered.split_once('_') else {
            warn!(variable = %name, "ignoring override without a section");
            continue;
        };

        match root.get_mut(section) {
            Some(toml::Value::Table(table)) => {
                debug!(section, key, "applying environment override");
                table.insert(key.to_string(), parse_env_value(&raw));
            }
            _ => warn!(variable = %name, "ignoring override for unknown section"),
        }
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}
