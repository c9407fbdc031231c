// src/hal/tests.rs
//! Unit tests for HAL components

use crate::error::{CamError, CamResult};
use crate::hal::{DeviceDriver, Geometry};
use crate::property::{PropertyId, PropertyValue};

/// Driver exposing only a name and a fixed 4x2 ROI
struct MinimalDriver;

impl DeviceDriver for MinimalDriver {
    fn probe(&mut self) -> CamResult<()> {
        Ok(())
    }

    fn supports(&self, id: PropertyId) -> bool {
        matches!(id, PropertyId::Name | PropertyId::Width | PropertyId::Height)
    }

    fn get_property(&mut self, id: PropertyId) -> CamResult<PropertyValue> {
        match id {
            PropertyId::Name => Ok("minimal".into()),
            PropertyId::Width => Ok(4u32.into()),
            PropertyId::Height => Ok(2u32.into()),
            other => Err(CamError::unsupported(other)),
        }
    }

    fn set_property(&mut self, id: PropertyId, _value: &PropertyValue) -> CamResult<()> {
        Err(CamError::read_only(id))
    }

    fn arm(&mut self) -> CamResult<()> {
        Ok(())
    }

    fn start(&mut self) -> CamResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> CamResult<()> {
        Ok(())
    }

    fn grab(&mut self, out: &mut [u8]) -> CamResult<()> {
        out.fill(0xAB);
        Ok(())
    }
}

#[test]
fn test_geometry_frame_size() {
    let geometry = Geometry {
        width: 64,
        height: 32,
        bit_depth: 12,
        ..Default::default()
    };
    assert_eq!(geometry.bytes_per_pixel(), 2);
    assert_eq!(geometry.pixel_count(), 64 * 32);
    assert_eq!(geometry.frame_size(), 64 * 32 * 2);

    let mono8 = Geometry { bit_depth: 8, ..geometry };
    assert_eq!(mono8.frame_size(), 64 * 32);
}

#[test]
fn test_geometry_default() {
    let geometry = Geometry::default();
    assert_eq!(geometry.bit_depth, 16);
    assert_eq!(geometry.frame_size(), 0);
}

#[test]
fn test_driver_as_trait_object() {
    let mut driver: Box<dyn DeviceDriver> = Box::new(MinimalDriver);

    assert!(driver.probe().is_ok());
    assert!(driver.supports(PropertyId::Width));
    assert!(!driver.supports(PropertyId::Exposure));
    assert_eq!(driver.get_property(PropertyId::Name).unwrap(), PropertyValue::from("minimal"));
    assert!(driver.transfer_format().is_native());
    assert!(driver.set_push_mode(true).is_ok());

    let mut frame = [0u8; 16];
    driver.grab(&mut frame).unwrap();
    assert!(frame.iter().all(|&b| b == 0xAB));
    assert!(driver.destroy().is_ok());
}

#[test]
fn test_camera_over_minimal_driver() {
    use crate::camera::Camera;
    use crate::config::AcquisitionSettings;

    let camera = Camera::new("minimal", Box::new(MinimalDriver), &AcquisitionSettings::default()).unwrap();

    // Bit depth is not reported, so the 16-bit default applies
    assert_eq!(camera.frame_size(), 4 * 2 * 2);
    assert_eq!(camera.name().unwrap(), "minimal");
    assert!(matches!(
        camera.get_property(PropertyId::Exposure),
        Err(CamError::InvalidProperty { .. })
    ));
}
