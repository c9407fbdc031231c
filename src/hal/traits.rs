// src/hal/traits.rs
//! Contract every vendor driver implements

use crate::acquisition::unpack::TransferFormat;
use crate::error::CamResult;
use crate::property::{PropertyId, PropertyValue};
use parking_lot::Mutex;
use std::sync::Arc;

/// Driver shared between a camera and its acquisition thread
pub type SharedDriver = Arc<Mutex<Box<dyn DeviceDriver>>>;

/// Main trait for camera driver implementations
///
/// A driver only translates between the uniform property/acquisition contract
/// and one vendor's command set. Lifecycle rules, caching and buffering are
/// handled by [`crate::camera::Camera`]; errors returned here reach the caller
/// unchanged.
pub trait DeviceDriver: Send {
    /// Check that live hardware responds
    fn probe(&mut self) -> CamResult<()>;

    /// Whether this device implements `id`
    fn supports(&self, id: PropertyId) -> bool;

    /// Read a property from the device
    fn get_property(&mut self, id: PropertyId) -> CamResult<PropertyValue>;

    /// Write a property to the device
    fn set_property(&mut self, id: PropertyId, value: &PropertyValue) -> CamResult<()>;

    /// Prepare the device for acquisition
    fn arm(&mut self) -> CamResult<()>;

    /// Enter acquisition
    fn start(&mut self) -> CamResult<()>;

    /// Leave acquisition
    fn stop(&mut self) -> CamResult<()>;

    /// Block until one frame is available and copy it into `out`
    ///
    /// `out` holds exactly [`TransferFormat::transfer_size`] bytes for the
    /// current geometry.
    fn grab(&mut self, out: &mut [u8]) -> CamResult<()>;

    /// Announce that frames will be pulled continuously by the push loop
    fn set_push_mode(&mut self, _enabled: bool) -> CamResult<()> {
        Ok(())
    }

    /// Layout of the bytes delivered by [`DeviceDriver::grab`]
    fn transfer_format(&self) -> TransferFormat {
        TransferFormat::Native
    }

    /// Release device resources
    fn destroy(&mut self) -> CamResult<()> {
        Ok(())
    }
}
