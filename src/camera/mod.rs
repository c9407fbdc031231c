// src/camera/mod.rs
//! Camera handle: property dispatch, lifecycle and buffering
//!
//! A [`Camera`] wraps one driver selected at open time. It enforces the
//! lifecycle rules, serves cached geometry and device limits without
//! touching the driver, owns the ring buffer and runs the acquisition
//! engine.

pub(crate) mod state;

pub use state::CameraState;

use crate::acquisition::engine::{
    acquire_frame, AcquisitionSession, AsyncEngine, Frame, FrameCallback, PushLoop,
};
use crate::acquisition::ring_buffer::{RingBuffer, RingBufferError};
use crate::acquisition::unpack::TransferFormat;
use crate::config::constants::acquisition;
use crate::config::AcquisitionSettings;
use crate::error::{CamError, CamResult};
use crate::hal::{DeviceDriver, Geometry, SharedDriver};
use crate::property::{get_descriptor, PropertyDescriptor, PropertyId, PropertyValue};
use parking_lot::Mutex;
use serde::Serialize;
use state::StateCell;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One row of [`Camera::property_tree`]
#[derive(Debug, Clone, Serialize)]
pub struct PropertyEntry {
    /// Registry descriptor
    pub descriptor: &'static PropertyDescriptor,
    /// Current value, `None` when unsupported or unreadable
    pub value: Option<PropertyValue>,
}

/// An opened camera
pub struct Camera {
    kind: String,
    driver: SharedDriver,
    state: StateCell,

    geometry: Geometry,
    limits: [Option<PropertyValue>; PropertyId::COUNT],
    supported: [bool; PropertyId::COUNT],
    transfer_format: TransferFormat,

    buffer: Arc<RingBuffer>,
    default_block_count: usize,

    consumer: Option<FrameCallback>,
    session: AcquisitionSession,
    engine: Option<AsyncEngine>,
    push_mode: bool,
    scratch: Vec<u8>,
    closed: bool,
}

impl Camera {
    /// Wrap a probed driver
    ///
    /// Reads the supported property set, the device limits and the current
    /// geometry once; later reads of those are served from the cache.
    pub fn new(
        kind: impl Into<String>,
        mut driver: Box<dyn DeviceDriver>,
        settings: &AcquisitionSettings,
    ) -> CamResult<Self> {
        let kind = kind.into();
        let (supported, limits, geometry) = match inspect_driver(&mut *driver) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(kind = %kind, error = %err, "failed to read device state");
                if let Err(destroy) = driver.destroy() {
                    warn!(kind = %kind, error = %destroy, "failed to release driver");
                }
                return Err(err);
            }
        };

        let transfer_format = driver.transfer_format();
        info!(
            kind = %kind,
            width = geometry.width,
            height = geometry.height,
            bit_depth = geometry.bit_depth,
            transfer = ?transfer_format,
            "camera opened"
        );

        Ok(Self {
            kind,
            driver: Arc::new(Mutex::new(driver)),
            state: StateCell::new(),
            geometry,
            limits,
            supported,
            transfer_format,
            buffer: Arc::new(RingBuffer::new()),
            default_block_count: settings.default_block_count,
            consumer: None,
            session: AcquisitionSession::new(),
            engine: None,
            push_mode: false,
            scratch: Vec::new(),
            closed: false,
        })
    }

    /// Registry name the camera was opened under
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Current lifecycle state
    pub fn state(&self) -> CameraState {
        self.state.get()
    }

    /// Cached frame geometry
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Bytes in one output frame: width × height × bytes per pixel
    pub fn frame_size(&self) -> usize {
        self.geometry.frame_size()
    }

    /// Layout the driver delivers frames in
    pub fn transfer_format(&self) -> TransferFormat {
        self.transfer_format
    }

    /// Whether the device implements `id`
    pub fn supports(&self, id: PropertyId) -> bool {
        self.supported[id as usize]
    }

    /// Device model name
    pub fn name(&self) -> CamResult<String> {
        match self.get_property(PropertyId::Name)? {
            PropertyValue::Str(name) => Ok(name),
            other => Ok(other.to_string()),
        }
    }

    /// Read a property
    pub fn get_property(&self, id: impl Into<u32>) -> CamResult<PropertyValue> {
        let descriptor = self.resolve(id.into())?;
        let id = descriptor.id;

        if let Some(value) = self.cached(id) {
            debug!(property = %id, value = %value, "property served from cache");
            return Ok(value);
        }

        let value = self.driver.lock().get_property(id)?;
        debug!(property = %id, value = %value, "property read");
        Ok(value)
    }

    /// Read a property into a raw buffer, returning the bytes written
    ///
    /// Integers are encoded little-endian, strings NUL-terminated.
    pub fn read_property(&self, id: impl Into<u32>, out: &mut [u8]) -> CamResult<usize> {
        let id = id.into();
        let value = self.get_property(id)?;
        value.encode_into(out).ok_or_else(|| CamError::OutOfRange {
            property: value_name(id),
            reason: format!("{} byte buffer too small for {}", out.len(), value),
        })
    }

    /// Write a property
    ///
    /// Only permitted in [`CameraState::Configurable`]. Geometry writes update
    /// the cached geometry and resize an allocated ring buffer.
    pub fn set_property(&mut self, id: impl Into<u32>, value: impl Into<PropertyValue>) -> CamResult<()> {
        let descriptor = self.resolve(id.into())?;
        let id = descriptor.id;
        let value = value.into().coerce_to(descriptor.value_type);

        if !descriptor.is_writable() {
            return Err(CamError::read_only(id));
        }
        value.check(descriptor)?;
        self.require_configurable("set_property")?;
        self.check_limits(id, &value)?;

        let resized = match (id.is_geometry(), value.as_u32()) {
            (true, Some(raw)) => {
                let geometry = with_geometry_value(self.geometry, id, raw);
                if self.buffer.is_allocated() {
                    check_buffer_size(geometry.frame_size(), self.buffer.block_count())?;
                }
                Some(geometry)
            }
            _ => None,
        };

        self.driver.lock().set_property(id, &value)?;
        debug!(property = %id, value = %value, "property written");

        if let Some(geometry) = resized {
            let previous = self.geometry.frame_size();
            self.geometry = geometry;

            if self.buffer.is_allocated() && geometry.frame_size() != previous {
                let block_count = self.buffer.block_count();
                self.buffer = Arc::new(RingBuffer::with_capacity(geometry.frame_size(), block_count)?);
                info!(
                    frame_size = geometry.frame_size(),
                    block_count, "ring buffer resized for new geometry"
                );
            }
        }

        Ok(())
    }

    /// Allocate the ring buffer with `block_count` frames
    ///
    /// Replaces any existing allocation. Frames handed out earlier keep the
    /// old allocation alive until they are dropped.
    pub fn alloc_buffer(&mut self, block_count: usize) -> CamResult<()> {
        self.require_configurable("alloc_buffer")?;

        let frame_size = self.frame_size();
        check_buffer_size(frame_size, block_count)?;

        self.buffer = Arc::new(RingBuffer::with_capacity(frame_size, block_count)?);
        info!(frame_size, block_count, "ring buffer allocated");
        Ok(())
    }

    /// Shared handle to the ring buffer, for preview readers
    pub fn ring_buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Register the consumer that receives frames while recording
    ///
    /// Replaces a previously registered consumer.
    pub fn register_callback<F>(&mut self, callback: F) -> CamResult<()>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        self.require_configurable("register_callback")?;
        self.consumer = Some(Box::new(callback));
        Ok(())
    }

    /// Remove the registered consumer
    pub fn unregister_callback(&mut self) -> CamResult<()> {
        self.require_configurable("unregister_callback")?;
        self.consumer = None;
        Ok(())
    }

    /// Whether a consumer is registered
    pub fn has_callback(&self) -> bool {
        self.consumer.is_some()
    }

    /// Arm the device and start recording
    ///
    /// Enters [`CameraState::ActiveAsync`] when a consumer is registered,
    /// [`CameraState::ActiveSync`] otherwise. On failure the camera stays
    /// configurable.
    pub fn start_recording(&mut self) -> CamResult<()> {
        self.require_configurable("start_recording")?;

        let frame_size = self.frame_size();
        let needs_allocation = !self.buffer.is_allocated();
        if needs_allocation {
            check_buffer_size(frame_size, self.default_block_count)?;
        }

        let push = self.consumer.is_some();
        self.arm_and_start(push)?;

        // The buffer is touched only once the device is running
        if needs_allocation {
            match RingBuffer::with_capacity(frame_size, self.default_block_count) {
                Ok(buffer) => {
                    self.buffer = Arc::new(buffer);
                    info!(frame_size, block_count = self.default_block_count, "ring buffer allocated");
                }
                Err(err) => {
                    if let Err(stop) = self.stop_driver() {
                        warn!(error = %stop, "failed to stop driver after allocation failure");
                    }
                    return Err(err.into());
                }
            }
        } else {
            self.buffer.reset();
        }
        self.session = AcquisitionSession::new();

        let Some(callback) = self.consumer.take() else {
            self.state.set(CameraState::ActiveSync);
            info!(kind = %self.kind, "recording started (sync)");
            return Ok(());
        };

        self.state.set(CameraState::ActiveAsync);
        let push_loop = PushLoop {
            driver: Arc::clone(&self.driver),
            buffer: Arc::clone(&self.buffer),
            state: self.state.clone(),
            geometry: self.geometry,
            format: self.transfer_format,
        };

        match AsyncEngine::spawn(push_loop, callback) {
            Ok(engine) => {
                self.engine = Some(engine);
                info!(kind = %self.kind, "recording started (async)");
                Ok(())
            }
            Err((err, callback)) => {
                self.state.set(CameraState::Configurable);
                self.consumer = callback;
                if let Err(stop) = self.stop_driver() {
                    warn!(error = %stop, "failed to stop driver after engine start failure");
                }
                Err(err)
            }
        }
    }

    /// Stop recording and return to [`CameraState::Configurable`]
    ///
    /// Does nothing when already configurable. If the push loop ended on a
    /// driver error, that error is returned here.
    pub fn stop_recording(&mut self) -> CamResult<()> {
        let previous = self.state.get();
        if previous == CameraState::Configurable {
            return Ok(());
        }

        self.state.set(CameraState::Configurable);

        let engine_result = match self.engine.take() {
            Some(engine) => {
                let exit = engine.join();
                self.consumer = exit.callback;
                exit.result.map(|frames| {
                    debug!(frames, "push loop joined");
                })
            }
            None => Ok(()),
        };

        let stop_result = self.stop_driver();
        info!(kind = %self.kind, from = %previous, "recording stopped");

        engine_result?;
        stop_result
    }

    /// Block until the next frame is in the ring buffer
    ///
    /// Only valid in [`CameraState::ActiveSync`].
    pub fn grab(&mut self) -> CamResult<Frame> {
        self.require_state(CameraState::ActiveSync, "grab")?;

        let mut driver = self.driver.lock();
        acquire_frame(
            &mut **driver,
            &self.buffer,
            &mut self.session,
            &self.geometry,
            self.transfer_format,
            &mut self.scratch,
        )
    }

    /// Every registered property with its current value on this camera
    pub fn property_tree(&self) -> Vec<PropertyEntry> {
        PropertyId::ALL
            .iter()
            .map(|&id| {
                let value = if self.supports(id) {
                    self.get_property(id)
                        .map_err(|err| debug!(property = %id, error = %err, "property unreadable"))
                        .ok()
                } else {
                    None
                };
                PropertyEntry {
                    descriptor: id.descriptor(),
                    value,
                }
            })
            .collect()
    }

    /// Stop any acquisition and release the driver
    pub fn close(mut self) -> CamResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> CamResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let stopped = self.stop_recording();
        let destroyed = self.driver.lock().destroy();
        info!(kind = %self.kind, "camera closed");

        stopped?;
        destroyed
    }

    fn resolve(&self, raw: u32) -> CamResult<&'static PropertyDescriptor> {
        let descriptor = get_descriptor(raw)?;
        if !self.supports(descriptor.id) {
            return Err(CamError::unsupported(descriptor.id));
        }
        Ok(descriptor)
    }

    fn cached(&self, id: PropertyId) -> Option<PropertyValue> {
        match id {
            PropertyId::Width => Some(self.geometry.width.into()),
            PropertyId::Height => Some(self.geometry.height.into()),
            PropertyId::OffsetX => Some(self.geometry.offset_x.into()),
            PropertyId::OffsetY => Some(self.geometry.offset_y.into()),
            PropertyId::BitDepth => Some(self.geometry.bit_depth.into()),
            _ => self.limits[id as usize].clone(),
        }
    }

    fn check_limits(&self, id: PropertyId, value: &PropertyValue) -> CamResult<()> {
        let Some((min_id, max_id)) = limit_pair(id) else {
            return Ok(());
        };
        let Some(value) = value.as_i64() else {
            return Ok(());
        };

        let min = self.limits[min_id as usize].as_ref().and_then(PropertyValue::as_i64);
        let max = self.limits[max_id as usize].as_ref().and_then(PropertyValue::as_i64);

        if min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max) {
            return Err(CamError::OutOfRange {
                property: id.name(),
                reason: format!(
                    "{} not in [{}, {}]",
                    value,
                    min.map_or_else(|| "-".to_string(), |v| v.to_string()),
                    max.map_or_else(|| "-".to_string(), |v| v.to_string()),
                ),
            });
        }
        Ok(())
    }

    fn require_configurable(&self, operation: &'static str) -> CamResult<()> {
        self.require_state(CameraState::Configurable, operation)
    }

    fn require_state(&self, expected: CameraState, operation: &'static str) -> CamResult<()> {
        let state = self.state.get();
        if state != expected {
            return Err(CamError::state(operation, state));
        }
        Ok(())
    }

    fn arm_and_start(&mut self, push: bool) -> CamResult<()> {
        let mut driver = self.driver.lock();

        if push {
            driver.set_push_mode(true)?;
            self.push_mode = true;
        }

        let started = driver.arm().and_then(|()| driver.start());
        if let Err(err) = started {
            warn!(kind = %self.kind, error = %err, "failed to start recording");
            if self.push_mode {
                if let Err(reset) = driver.set_push_mode(false) {
                    warn!(error = %reset, "failed to leave push mode");
                }
                self.push_mode = false;
            }
            return Err(err);
        }
        Ok(())
    }

    fn stop_driver(&mut self) -> CamResult<()> {
        let mut driver = self.driver.lock();
        let stopped = driver.stop();

        if self.push_mode {
            self.push_mode = false;
            if let Err(err) = driver.set_push_mode(false) {
                warn!(error = %err, "failed to leave push mode");
            }
        }
        stopped
    }
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("kind", &self.kind)
            .field("state", &self.state.get())
            .field("geometry", &self.geometry)
            .field("transfer_format", &self.transfer_format)
            .field("buffer", &self.buffer)
            .field("has_callback", &self.consumer.is_some())
            .finish()
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!(kind = %self.kind, error = %err, "error while closing camera");
        }
    }
}

/// Min/max properties bounding a writable property
fn limit_pair(id: PropertyId) -> Option<(PropertyId, PropertyId)> {
    match id {
        PropertyId::Width => Some((PropertyId::WidthMin, PropertyId::WidthMax)),
        PropertyId::Height => Some((PropertyId::HeightMin, PropertyId::HeightMax)),
        PropertyId::Exposure => Some((PropertyId::ExposureMin, PropertyId::ExposureMax)),
        PropertyId::Delay => Some((PropertyId::DelayMin, PropertyId::DelayMax)),
        _ => None,
    }
}

fn with_geometry_value(mut geometry: Geometry, id: PropertyId, raw: u32) -> Geometry {
    match id {
        PropertyId::Width => geometry.width = raw,
        PropertyId::Height => geometry.height = raw,
        PropertyId::OffsetX => geometry.offset_x = raw,
        PropertyId::OffsetY => geometry.offset_y = raw,
        _ => {}
    }
    geometry
}

/// Supported set, cached limits and geometry read once at open
type DeviceSnapshot = (
    [bool; PropertyId::COUNT],
    [Option<PropertyValue>; PropertyId::COUNT],
    Geometry,
);

fn inspect_driver(driver: &mut dyn DeviceDriver) -> CamResult<DeviceSnapshot> {
    let supported: [bool; PropertyId::COUNT] =
        std::array::from_fn(|index| driver.supports(PropertyId::ALL[index]));

    let mut limits: [Option<PropertyValue>; PropertyId::COUNT] = Default::default();
    for id in PropertyId::ALL.into_iter().filter(|id| id.is_limit()) {
        if supported[id as usize] {
            limits[id as usize] = Some(driver.get_property(id)?);
        }
    }

    let mut geometry = Geometry::default();
    let mut read_u32 = |id: PropertyId| -> CamResult<Option<u32>> {
        if !supported[id as usize] {
            return Ok(None);
        }
        let value = driver.get_property(id)?;
        value.as_u32().map(Some).ok_or_else(|| CamError::OutOfRange {
            property: id.name(),
            reason: format!("driver reported non-integer value {}", value),
        })
    };
    geometry.width = read_u32(PropertyId::Width)?.unwrap_or(0);
    geometry.height = read_u32(PropertyId::Height)?.unwrap_or(0);
    geometry.offset_x = read_u32(PropertyId::OffsetX)?.unwrap_or(0);
    geometry.offset_y = read_u32(PropertyId::OffsetY)?.unwrap_or(0);
    if let Some(depth) = read_u32(PropertyId::BitDepth)? {
        geometry.bit_depth = u8::try_from(depth).map_err(|_| CamError::OutOfRange {
            property: PropertyId::BitDepth.name(),
            reason: format!("bit depth {} too large", depth),
        })?;
    }

    Ok((supported, limits, geometry))
}

fn check_buffer_size(frame_size: usize, block_count: usize) -> CamResult<()> {
    let total = (frame_size as u64).saturating_mul(block_count as u64);
    if frame_size == 0
        || !(acquisition::MIN_BLOCK_COUNT..=acquisition::MAX_BLOCK_COUNT).contains(&block_count)
        || total > acquisition::MAX_BUFFER_BYTES
    {
        return Err(RingBufferError::InvalidSize {
            frame_size,
            block_count,
        }
        .into());
    }
    Ok(())
}

fn value_name(raw: u32) -> &'static str {
    PropertyId::from_raw(raw).map_or("unknown", PropertyId::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_pairs() {
        assert_eq!(
            limit_pair(PropertyId::Exposure),
            Some((PropertyId::ExposureMin, PropertyId::ExposureMax))
        );
        assert_eq!(limit_pair(PropertyId::TriggerMode), None);
    }

    #[test]
    fn test_geometry_update() {
        let geometry = Geometry {
            width: 10,
            height: 10,
            ..Default::default()
        };
        let updated = with_geometry_value(geometry, PropertyId::Width, 20);
        assert_eq!(updated.width, 20);
        assert_eq!(updated.frame_size(), 20 * 10 * 2);
        assert_eq!(with_geometry_value(geometry, PropertyId::OffsetY, 3).offset_y, 3);
    }

    #[test]
    fn test_buffer_size_limits() {
        assert!(check_buffer_size(1024, 4).is_ok());
        assert!(check_buffer_size(0, 4).is_err());
        assert!(check_buffer_size(1024, 0).is_err());
        assert!(check_buffer_size(usize::MAX / 2, 4).is_err());
    }
}
