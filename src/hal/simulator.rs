// src/hal/simulator.rs
//! Simulated camera driver
//!
//! Produces frames at a fixed period against a monotonic clock, so that the
//! whole acquisition path can be exercised without hardware. The generated
//! image is a diagonal gradient that shifts by one pixel per frame, plus a
//! little seeded noise.

use crate::acquisition::unpack::{pack_pixels, TransferFormat};
use crate::config::constants::simulator;
use crate::error::{CamError, CamResult, IntoCamError};
use crate::hal::DeviceDriver;
use crate::property::{PropertyId, PropertyValue};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Simulator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Model name reported by the `name` property
    pub name: String,
    /// Full sensor width in pixels
    pub sensor_width: u32,
    /// Full sensor height in pixels
    pub sensor_height: u32,
    /// Significant bits per output pixel
    pub bit_depth: u8,
    /// Time between frames
    pub frame_period_ms: u64,
    /// Layout of the bytes `grab` delivers
    pub transfer_format: TransferFormat,
    /// Peak uniform noise added to every pixel
    pub noise_amplitude: u16,
    /// Noise generator seed
    pub seed: u64,
    /// Whether a device answers the presence probe
    pub present: bool,
    /// Reject `arm` with an arm error
    pub fail_arm: bool,
    /// Reject `start` with a record error
    pub fail_start: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            name: simulator::DEFAULT_NAME.to_string(),
            sensor_width: simulator::DEFAULT_SENSOR_WIDTH,
            sensor_height: simulator::DEFAULT_SENSOR_HEIGHT,
            bit_depth: simulator::DEFAULT_BIT_DEPTH,
            frame_period_ms: simulator::DEFAULT_FRAME_PERIOD_MS,
            transfer_format: TransferFormat::Native,
            noise_amplitude: simulator::DEFAULT_NOISE_AMPLITUDE,
            seed: simulator::DEFAULT_SEED,
            present: true,
            fail_arm: false,
            fail_start: false,
        }
    }
}

impl SimulatorConfig {
    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.sensor_width == 0 || self.sensor_height == 0 {
            errors.push(format!(
                "Sensor size must be non-zero, got {}x{}",
                self.sensor_width, self.sensor_height
            ));
        }

        if self.bit_depth == 0 || self.bit_depth > 16 {
            errors.push(format!("Bit depth {} not in [1, 16]", self.bit_depth));
        }

        if let Some(bits) = self.transfer_format.pixel_bits() {
            if bits != self.bit_depth {
                errors.push(format!(
                    "Transfer format {:?} carries {} bit pixels, bit depth is {}",
                    self.transfer_format, bits, self.bit_depth
                ));
            }
        }

        if self.frame_period_ms == 0 {
            errors.push("Frame period must be at least 1 ms".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Roi {
    width: u32,
    height: u32,
    x: u32,
    y: u32,
}

/// Simulated camera
pub struct SimulatedCamera {
    config: SimulatorConfig,
    roi: Roi,
    exposure_us: u32,
    delay_us: u32,
    timestamp_mode: u32,
    trigger_mode: u32,

    armed: bool,
    recording: bool,
    push_mode: bool,
    next_frame_at: Option<Instant>,
    frames_generated: u64,

    rng: StdRng,
    pixels: Vec<u16>,
}

impl SimulatedCamera {
    /// Create a simulated camera; the configuration is validated first
    pub fn new(config: SimulatorConfig) -> CamResult<Self> {
        config
            .validate()
            .map_err(|errors| CamError::GeneralDevice(errors.join("; ")))?;

        let roi = Roi {
            width: config.sensor_width,
            height: config.sensor_height,
            x: 0,
            y: 0,
        };
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            roi,
            exposure_us: simulator::DEFAULT_EXPOSURE_US,
            delay_us: simulator::DELAY_MIN_US,
            timestamp_mode: 0,
            trigger_mode: 0,
            armed: false,
            recording: false,
            push_mode: false,
            next_frame_at: None,
            frames_generated: 0,
            rng,
            pixels: Vec::new(),
        })
    }

    /// Frames produced since the last `start`
    pub fn frames_generated(&self) -> u64 {
        self.frames_generated
    }

    /// Whether the push loop announced itself
    pub fn push_mode(&self) -> bool {
        self.push_mode
    }

    fn frame_period(&self) -> Duration {
        Duration::from_millis(self.config.frame_period_ms)
    }

    fn bytes_per_pixel(&self) -> usize {
        usize::from(self.config.bit_depth).div_ceil(8)
    }

    fn check_extent(&self, property: PropertyId, offset: u32, extent: u32, limit: u32) -> CamResult<()> {
        match offset.checked_add(extent) {
            Some(end) if extent >= 1 && end <= limit => Ok(()),
            _ => Err(CamError::OutOfRange {
                property: property.name(),
                reason: format!("offset {} + extent {} exceeds sensor size {}", offset, extent, limit),
            }),
        }
    }

    fn check_limits(property: PropertyId, value: u32, min: u32, max: u32) -> CamResult<()> {
        if value < min || value > max {
            return Err(CamError::OutOfRange {
                property: property.name(),
                reason: format!("{} not in [{}, {}]", value, min, max),
            });
        }
        Ok(())
    }

    fn wait_for_frame_boundary(&mut self) {
        let period = self.frame_period();
        let now = Instant::now();
        let due = self.next_frame_at.unwrap_or(now + period);

        if due > now {
            std::thread::sleep(due - now);
        }

        // Keep the cadence unless we fell more than one period behind
        let next = due + period;
        self.next_frame_at = Some(if next < Instant::now() { Instant::now() + period } else { next });
    }

    fn render(&mut self) {
        let Roi { width, height, x, y } = self.roi;
        let max_value = (1u32 << self.config.bit_depth) - 1;
        let shift = self.frames_generated as u32;
        let noise = u32::from(self.config.noise_amplitude);

        self.pixels.clear();
        self.pixels.reserve(width as usize * height as usize);
        for row in y..y + height {
            for col in x..x + width {
                let base = col.wrapping_add(row).wrapping_add(shift).wrapping_mul(97);
                let jitter = if noise > 0 { self.rng.gen_range(0..=noise) } else { 0 };
                self.pixels.push((base.wrapping_add(jitter) % (max_value + 1)) as u16);
            }
        }
    }
}

impl DeviceDriver for SimulatedCamera {
    fn probe(&mut self) -> CamResult<()> {
        if self.config.present {
            Ok(())
        } else {
            Err(CamError::NotFound("no simulated device attached".to_string()))
        }
    }

    fn supports(&self, id: PropertyId) -> bool {
        // No housing sensor on the simulated camera
        id != PropertyId::TemperatureCamera
    }

    fn get_property(&mut self, id: PropertyId) -> CamResult<PropertyValue> {
        let value = match id {
            PropertyId::Name => PropertyValue::Str(self.config.name.clone()),
            PropertyId::Width => self.roi.width.into(),
            PropertyId::WidthMin | PropertyId::HeightMin => 1u32.into(),
            PropertyId::WidthMax => self.config.sensor_width.into(),
            PropertyId::Height => self.roi.height.into(),
            PropertyId::HeightMax => self.config.sensor_height.into(),
            PropertyId::OffsetX => self.roi.x.into(),
            PropertyId::OffsetY => self.roi.y.into(),
            PropertyId::BitDepth => self.config.bit_depth.into(),
            PropertyId::Exposure => self.exposure_us.into(),
            PropertyId::ExposureMin => simulator::EXPOSURE_MIN_US.into(),
            PropertyId::ExposureMax => simulator::EXPOSURE_MAX_US.into(),
            PropertyId::Delay => self.delay_us.into(),
            PropertyId::DelayMin => simulator::DELAY_MIN_US.into(),
            PropertyId::DelayMax => simulator::DELAY_MAX_US.into(),
            PropertyId::FramePeriod => {
                u32::try_from(self.config.frame_period_ms).device_err("frame_period")?.into()
            }
            PropertyId::TemperatureSensor => simulator::SENSOR_TEMPERATURE_C.into(),
            PropertyId::TimestampMode => self.timestamp_mode.into(),
            PropertyId::TriggerMode => self.trigger_mode.into(),
            PropertyId::TemperatureCamera => return Err(CamError::unsupported(id)),
        };
        Ok(value)
    }

    fn set_property(&mut self, id: PropertyId, value: &PropertyValue) -> CamResult<()> {
        let raw = value.as_u32().ok_or_else(|| CamError::OutOfRange {
            property: id.name(),
            reason: format!("expected an unsigned integer, got {}", value),
        })?;

        match id {
            PropertyId::Width => {
                self.check_extent(id, self.roi.x, raw, self.config.sensor_width)?;
                self.roi.width = raw;
            }
            PropertyId::Height => {
                self.check_extent(id, self.roi.y, raw, self.config.sensor_height)?;
                self.roi.height = raw;
            }
            PropertyId::OffsetX => {
                self.check_extent(id, raw, self.roi.width, self.config.sensor_width)?;
                self.roi.x = raw;
            }
            PropertyId::OffsetY => {
                self.check_extent(id, raw, self.roi.height, self.config.sensor_height)?;
                self.roi.y = raw;
            }
            PropertyId::Exposure => {
                Self::check_limits(id, raw, simulator::EXPOSURE_MIN_US, simulator::EXPOSURE_MAX_US)?;
                self.exposure_us = raw;
            }
            PropertyId::Delay => {
                Self::check_limits(id, raw, simulator::DELAY_MIN_US, simulator::DELAY_MAX_US)?;
                self.delay_us = raw;
            }
            PropertyId::TimestampMode => self.timestamp_mode = raw,
            PropertyId::TriggerMode => self.trigger_mode = raw,
            _ => return Err(CamError::read_only(id)),
        }

        debug!(property = %id, value = raw, "simulator property written");
        Ok(())
    }

    fn arm(&mut self) -> CamResult<()> {
        if self.config.fail_arm {
            return Err(CamError::Arm("simulated arm failure".to_string()));
        }
        self.armed = true;
        Ok(())
    }

    fn start(&mut self) -> CamResult<()> {
        if !self.armed {
            return Err(CamError::Record("camera is not armed".to_string()));
        }
        if self.config.fail_start {
            return Err(CamError::Record("simulated start failure".to_string()));
        }

        self.recording = true;
        self.frames_generated = 0;
        self.next_frame_at = Some(Instant::now() + self.frame_period());
        Ok(())
    }

    fn stop(&mut self) -> CamResult<()> {
        self.recording = false;
        self.armed = false;
        self.next_frame_at = None;
        Ok(())
    }

    fn grab(&mut self, out: &mut [u8]) -> CamResult<()> {
        if !self.recording {
            return Err(CamError::Record("camera is not recording".to_string()));
        }

        let pixels = self.roi.width as usize * self.roi.height as usize;
        let expected = self
            .config
            .transfer_format
            .transfer_size(pixels, self.bytes_per_pixel());
        if out.len() != expected {
            return Err(CamError::GeneralDevice(format!(
                "frame buffer holds {} bytes, transfer needs {}",
                out.len(),
                expected
            )));
        }

        self.wait_for_frame_boundary();
        self.render();

        match (self.config.transfer_format, self.bytes_per_pixel()) {
            (TransferFormat::Native, 1) => {
                for (byte, pixel) in out.iter_mut().zip(&self.pixels) {
                    *byte = *pixel as u8;
                }
            }
            (format, _) => pack_pixels(format, &self.pixels, out),
        }

        self.frames_generated += 1;
        trace!(frame = self.frames_generated, "simulated frame delivered");
        Ok(())
    }

    fn set_push_mode(&mut self, enabled: bool) -> CamResult<()> {
        self.push_mode = enabled;
        Ok(())
    }

    fn transfer_format(&self) -> TransferFormat {
        self.config.transfer_format
    }

    fn destroy(&mut self) -> CamResult<()> {
        self.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulatorConfig {
        SimulatorConfig {
            sensor_width: 8,
            sensor_height: 4,
            frame_period_ms: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_simulator_configuration_validation() {
        let mut config = SimulatorConfig::default();
        assert!(config.validate().is_ok());

        config.sensor_width = 0;
        assert!(config.validate().is_err());

        config.sensor_width = 64;
        config.transfer_format = TransferFormat::Mono12Packed;
        assert!(config.validate().is_err());

        config.bit_depth = 12;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roi_bounds() {
        let mut camera = SimulatedCamera::new(small_config()).unwrap();

        assert!(camera.set_property(PropertyId::Width, &PropertyValue::U32(6)).is_ok());
        assert!(camera.set_property(PropertyId::OffsetX, &PropertyValue::U32(2)).is_ok());

        let err = camera
            .set_property(PropertyId::OffsetX, &PropertyValue::U32(3))
            .unwrap_err();
        assert!(matches!(err, CamError::OutOfRange { .. }));

        let err = camera
            .set_property(PropertyId::Width, &PropertyValue::U32(0))
            .unwrap_err();
        assert!(matches!(err, CamError::OutOfRange { .. }));
    }

    #[test]
    fn test_error_states() {
        let mut camera = SimulatedCamera::new(small_config()).unwrap();
        let mut frame = vec![0u8; 8 * 4 * 2];

        assert!(matches!(camera.grab(&mut frame), Err(CamError::Record(_))));
        assert!(matches!(camera.start(), Err(CamError::Record(_))));

        camera.arm().unwrap();
        camera.start().unwrap();
        assert!(camera.grab(&mut frame[..10]).is_err());
        assert!(camera.grab(&mut frame).is_ok());
    }

    #[test]
    fn test_frame_pacing() {
        let mut camera = SimulatedCamera::new(small_config()).unwrap();
        let mut frame = vec![0u8; 8 * 4 * 2];
        camera.arm().unwrap();
        camera.start().unwrap();

        let start = Instant::now();
        for _ in 0..4 {
            camera.grab(&mut frame).unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(15));
        assert_eq!(camera.frames_generated(), 4);
    }

    #[test]
    fn test_absent_device() {
        let mut camera = SimulatedCamera::new(SimulatorConfig {
            present: false,
            ..small_config()
        })
        .unwrap();
        assert!(matches!(camera.probe(), Err(CamError::NotFound(_))));
    }

    #[test]
    fn test_arm_failure_injection() {
        let mut camera = SimulatedCamera::new(SimulatorConfig {
            fail_arm: true,
            ..small_config()
        })
        .unwrap();
        assert!(matches!(camera.arm(), Err(CamError::Arm(_))));
    }

    #[test]
    fn test_packed_transfer_size() {
        let mut camera = SimulatedCamera::new(SimulatorConfig {
            bit_depth: 12,
            transfer_format: TransferFormat::Mono12Packed,
            ..small_config()
        })
        .unwrap();
        camera.arm().unwrap();
        camera.start().unwrap();

        let mut packed = vec![0u8; 8 * 4 / 2 * 3];
        assert!(camera.grab(&mut packed).is_ok());
    }
}
