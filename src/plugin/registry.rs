// src/plugin/registry.rs
//! Resolve camera names to driver constructors
//!
//! Registration is static: [`PluginRegistry::with_builtins`] installs the
//! drivers compiled into the crate and [`PluginRegistry::register`] adds
//! more. Opening a camera constructs its driver and probes for live
//! hardware before handing out a [`Camera`].

use crate::camera::Camera;
use crate::config::constants::registry as names;
use crate::config::{AcquisitionSettings, CamConfig};
use crate::error::{CamError, CamResult};
use crate::hal::simulator::{SimulatedCamera, SimulatorConfig};
use crate::hal::DeviceDriver;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds a fresh driver instance
pub type DriverConstructor = Arc<dyn Fn() -> CamResult<Box<dyn DeviceDriver>> + Send + Sync>;

/// Registry of named camera drivers
#[derive(Clone)]
pub struct PluginRegistry {
    constructors: BTreeMap<String, DriverConstructor>,
    settings: AcquisitionSettings,
}

impl PluginRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
            settings: AcquisitionSettings::default(),
        }
    }

    /// Registry with the built-in drivers at default settings
    pub fn with_builtins() -> Self {
        Self::from_config(&CamConfig::default())
    }

    /// Registry with the built-in drivers configured from `config`
    pub fn from_config(config: &CamConfig) -> Self {
        let mut plugins = Self::new();
        plugins.settings = config.acquisition.clone();
        plugins.register_simulator(names::SIMULATOR, config.simulator.clone());
        plugins
    }

    /// Register a driver under `name`, replacing any earlier registration
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> CamResult<Box<dyn DeviceDriver>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.constructors.insert(name.clone(), Arc::new(constructor)).is_some() {
            warn!(name = %name, "driver registration replaced");
        } else {
            debug!(name = %name, "driver registered");
        }
    }

    /// Register a simulated camera with its own configuration
    pub fn register_simulator(&mut self, name: impl Into<String>, config: SimulatorConfig) {
        self.register(name, move || {
            Ok(Box::new(SimulatedCamera::new(config.clone())?) as Box<dyn DeviceDriver>)
        });
    }

    /// Registered names in sorted order
    pub fn list_available(&self) -> impl Iterator<Item = &str> + '_ {
        self.constructors.keys().map(String::as_str)
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Construct and probe the named driver
    ///
    /// Fails with [`CamError::CameraNotFound`] for an unknown name, a driver
    /// that cannot be constructed, or a device that does not answer.
    pub fn open(&self, name: &str) -> CamResult<Camera> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| CamError::CameraNotFound(name.to_string()))?;

        let mut driver = constructor().map_err(|err| {
            warn!(name, error = %err, "driver construction failed");
            CamError::CameraNotFound(name.to_string())
        })?;

        if let Err(err) = driver.probe() {
            warn!(name, error = %err, "no device answered the probe");
            if let Err(destroy) = driver.destroy() {
                warn!(name, error = %destroy, "failed to release driver");
            }
            return Err(CamError::CameraNotFound(name.to_string()));
        }

        let camera = Camera::new(name, driver, &self.settings)?;
        info!(name, "camera ready");
        Ok(camera)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("drivers", &self.constructors.keys().collect::<Vec<_>>())
            .field("settings", &self.settings)
            .finish()
    }
}
