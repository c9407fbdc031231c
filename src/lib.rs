//! cam-core: uniform property, lifecycle and acquisition layer for scientific cameras
//!
//! Every camera, whatever its vendor, is driven through the same contract:
//!
//! - A process-wide property registry with typed, bounded values
//! - A lifecycle state machine separating configuration from recording
//! - A ring buffer of fixed-size frame slots
//! - Synchronous `grab` or a push loop delivering frames to a consumer
//! - A plugin registry resolving camera names to drivers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cam_core::{PluginRegistry, PropertyId};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = PluginRegistry::with_builtins();
//!     let mut camera = registry.open("simulator")?;
//!
//!     camera.set_property(PropertyId::Exposure, 5_000u32)?;
//!     camera.alloc_buffer(10)?;
//!
//!     camera.start_recording()?;
//!     for _ in 0..10 {
//!         let frame = camera.grab()?;
//!         println!("frame {} in slot {}", frame.index(), frame.slot());
//!     }
//!     camera.stop_recording()?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod acquisition;
pub mod camera;
pub mod config;
pub mod error;
pub mod hal;
pub mod plugin;
pub mod property;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{Frame, FrameCallback, FrameView, RingBuffer, RingBufferError, TransferFormat};
pub use camera::{Camera, CameraState, PropertyEntry};
pub use config::{AcquisitionSettings, CamConfig, ConfigError, ConfigLoader};
pub use error::{CamError, CamResult, ErrorKind};
pub use hal::{DeviceDriver, FrameMetadata, Geometry};
pub use plugin::PluginRegistry;
pub use property::{get_descriptor, PropertyDescriptor, PropertyId, PropertyValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Uniform property, lifecycle and acquisition layer for scientific cameras"
            .to_string(),
        drivers: PluginRegistry::with_builtins()
            .list_available()
            .map(str::to_string)
            .collect(),
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// Built-in driver names
    pub drivers: Vec<String>,
}
