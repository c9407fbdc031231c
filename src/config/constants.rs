// src/config/constants.rs
//! System-wide configuration constants

/// Acquisition and buffering constants
pub mod acquisition {
    /// Blocks allocated when recording starts without an allocation
    pub const DEFAULT_BLOCK_COUNT: usize = 16;
    /// Smallest accepted block count
    pub const MIN_BLOCK_COUNT: usize = 1;
    /// Largest accepted block count
    pub const MAX_BLOCK_COUNT: usize = 65_536;

    /// Upper bound on a single ring buffer allocation
    pub const MAX_BUFFER_BYTES: u64 = 8 * 1024 * 1024 * 1024;

    /// Name of the thread filling the ring buffer
    pub const ACQUISITION_THREAD_NAME: &str = "cam-acquisition";
    /// Name of the thread invoking the consumer
    pub const DELIVERY_THREAD_NAME: &str = "cam-delivery";
}

/// Simulated camera defaults
pub mod simulator {
    /// Reported camera name
    pub const DEFAULT_NAME: &str = "cam-core simulator";
    /// Sensor width in pixels
    pub const DEFAULT_SENSOR_WIDTH: u32 = 640;
    /// Sensor height in pixels
    pub const DEFAULT_SENSOR_HEIGHT: u32 = 480;
    /// Output bit depth
    pub const DEFAULT_BIT_DEPTH: u8 = 16;
    /// Time between frames
    pub const DEFAULT_FRAME_PERIOD_MS: u64 = 100;

    /// Shortest exposure, µs
    pub const EXPOSURE_MIN_US: u32 = 10;
    /// Longest exposure, µs
    pub const EXPOSURE_MAX_US: u32 = 10_000_000;
    /// Exposure after open, µs
    pub const DEFAULT_EXPOSURE_US: u32 = 1_000;
    /// Shortest trigger delay, µs
    pub const DELAY_MIN_US: u32 = 0;
    /// Longest trigger delay, µs
    pub const DELAY_MAX_US: u32 = 1_000_000;

    /// Fixed sensor temperature, °C
    pub const SENSOR_TEMPERATURE_C: i32 = -15;
    /// Peak noise added to each pixel
    pub const DEFAULT_NOISE_AMPLITUDE: u16 = 16;
    /// Noise generator seed
    pub const DEFAULT_SEED: u64 = 0x5EED_CA3E;
}

/// Plugin registry names
pub mod registry {
    /// Built-in simulated camera
    pub const SIMULATOR: &str = "simulator";
}

/// Configuration file locations
pub mod paths {
    /// System-wide configuration file
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/cam-core/config.toml";
    /// Configuration file in the working directory
    pub const DEFAULT_CONFIG_FILE: &str = "cam-core.toml";
    /// Local overrides, highest file precedence
    pub const LOCAL_CONFIG_FILE: &str = "config/local.toml";
    /// Prefix of environment overrides
    pub const ENV_PREFIX: &str = "CAM_";
}
