// src/config/mod.rs
//! Configuration management

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::hal::simulator::SimulatorConfig;
use serde::{Deserialize, Serialize};

/// Complete cam-core configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CamConfig {
    /// `[acquisition]` section
    #[serde(default)]
    pub acquisition: AcquisitionSettings,

    /// `[simulator]` section, used by the built-in `simulator` driver
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Buffering settings applied to every opened camera
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AcquisitionSettings {
    /// Ring buffer size used when recording starts without an allocation
    #[serde(default = "defaults::default_block_count")]
    pub default_block_count: usize,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::acquisition;

    pub fn default_block_count() -> usize { acquisition::DEFAULT_BLOCK_COUNT }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            default_block_count: defaults::default_block_count(),
        }
    }
}

impl CamConfig {
    /// Validate configuration consistency
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let count = self.acquisition.default_block_count;
        if !(acquisition::MIN_BLOCK_COUNT..=acquisition::MAX_BLOCK_COUNT).contains(&count) {
            errors.push(format!(
                "Default block count {} not in [{}, {}]",
                count,
                acquisition::MIN_BLOCK_COUNT,
                acquisition::MAX_BLOCK_COUNT
            ));
        }

        if let Err(simulator_errors) = self.simulator.validate() {
            errors.extend(simulator_errors.into_iter().map(|e| format!("simulator: {}", e)));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = CamConfig::default();
        assert_eq!(config.acquisition.default_block_count, acquisition::DEFAULT_BLOCK_COUNT);
        assert_eq!(config.simulator.sensor_width, simulator::DEFAULT_SENSOR_WIDTH);
        assert!(config.validate_consistency().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = CamConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: CamConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(
            config.acquisition.default_block_count,
            deserialized.acquisition.default_block_count
        );
        assert_eq!(config.simulator.frame_period_ms, deserialized.simulator.frame_period_ms);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CamConfig = toml::from_str(
            r#"
[simulator]
sensor_width = 64
"#,
        )
        .unwrap();

        assert_eq!(config.simulator.sensor_width, 64);
        assert_eq!(config.simulator.sensor_height, simulator::DEFAULT_SENSOR_HEIGHT);
        assert_eq!(config.acquisition.default_block_count, acquisition::DEFAULT_BLOCK_COUNT);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CamConfig::default();
        config.acquisition.default_block_count = 0;
        config.simulator.bit_depth = 0;

        let errors = config.validate_consistency().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
