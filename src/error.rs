// src/error.rs
//! Unified error handling for cam-core
//!
//! Every fallible operation in the crate returns [`CamResult`]. The variants
//! mirror the status codes a device driver may report, plus the errors the
//! core detects itself (unknown properties, lifecycle violations, missing
//! cameras). Errors produced by a driver are passed to the caller as-is.

use crate::acquisition::ring_buffer::RingBufferError;
use crate::camera::CameraState;
use crate::property::PropertyId;
use thiserror::Error;

/// Unified error type for camera operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CamError {
    /// Property id unknown to the registry, unsupported by the device,
    /// or not writable
    #[error("invalid property {id}: {reason}")]
    InvalidProperty {
        /// Raw property id as supplied by the caller
        id: u32,
        /// Why the property was rejected
        reason: &'static str,
    },

    /// Value rejected by a bounds or type check
    #[error("value out of range for `{property}`: {reason}")]
    OutOfRange {
        /// Hierarchical property name
        property: &'static str,
        /// Human readable explanation
        reason: String,
    },

    /// Underlying device call failed for an unspecified reason
    #[error("device error: {0}")]
    GeneralDevice(String),

    /// Operation not valid in the current lifecycle state
    #[error("`{operation}` is not permitted while the camera is {state}")]
    State {
        /// Name of the rejected operation
        operation: &'static str,
        /// State the camera was in
        state: CameraState,
    },

    /// Device failed to prepare for acquisition
    #[error("failed to arm camera: {0}")]
    Arm(String),

    /// Device failed to enter or leave acquisition
    #[error("recording error: {0}")]
    Record(String),

    /// No resolvable driver, or no live hardware behind it
    #[error("no camera found for `{0}`")]
    CameraNotFound(String),

    /// A driver-side resource was not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Frame buffer misuse
    #[error(transparent)]
    Buffer(#[from] RingBufferError),
}

/// Coarse error category, for callers that only branch on the kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`CamError::InvalidProperty`]
    InvalidProperty,
    /// See [`CamError::OutOfRange`]
    OutOfRange,
    /// See [`CamError::GeneralDevice`]
    GeneralDeviceError,
    /// See [`CamError::State`]
    StateError,
    /// See [`CamError::Arm`]
    ArmError,
    /// See [`CamError::Record`]
    RecordError,
    /// See [`CamError::CameraNotFound`]
    CameraNotFound,
    /// See [`CamError::NotFound`]
    NotFound,
    /// See [`CamError::Buffer`]
    Buffer,
}

impl CamError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CamError::InvalidProperty { .. } => ErrorKind::InvalidProperty,
            CamError::OutOfRange { .. } => ErrorKind::OutOfRange,
            CamError::GeneralDevice(_) => ErrorKind::GeneralDeviceError,
            CamError::State { .. } => ErrorKind::StateError,
            CamError::Arm(_) => ErrorKind::ArmError,
            CamError::Record(_) => ErrorKind::RecordError,
            CamError::CameraNotFound(_) => ErrorKind::CameraNotFound,
            CamError::NotFound(_) => ErrorKind::NotFound,
            CamError::Buffer(_) => ErrorKind::Buffer,
        }
    }

    /// Error for a property the device does not implement
    pub fn unsupported(id: PropertyId) -> Self {
        CamError::InvalidProperty {
            id: id as u32,
            reason: "not supported by this device",
        }
    }

    /// Error for a write to a read-only property
    pub fn read_only(id: PropertyId) -> Self {
        CamError::InvalidProperty {
            id: id as u32,
            reason: "property is read-only",
        }
    }

    /// Error for a lifecycle violation
    pub fn state(operation: &'static str, state: CameraState) -> Self {
        CamError::State { operation, state }
    }
}

/// Result type alias for camera operations
pub type CamResult<T> = Result<T, CamError>;

/// Convenience trait for mapping vendor errors into device errors
pub trait IntoCamError<T> {
    /// Wrap any error as [`CamError::GeneralDevice`], prefixed with the operation
    fn device_err(self, operation: &str) -> CamResult<T>;
}

impl<T, E> IntoCamError<T> for Result<T, E>
where
    E: std::error::Error,
{
    fn device_err(self, operation: &str) -> CamResult<T> {
        self.map_err(|err| CamError::GeneralDevice(format!("{operation}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        let err = CamError::unsupported(PropertyId::TemperatureSensor);
        assert_eq!(err.kind(), ErrorKind::InvalidProperty);

        let err = CamError::state("set_property", CameraState::ActiveSync);
        assert_eq!(err.kind(), ErrorKind::StateError);

        let err: CamError = RingBufferError::NotAllocated.into();
        assert_eq!(err.kind(), ErrorKind::Buffer);
    }

    #[test]
    fn test_error_display() {
        let err = CamError::state("grab", CameraState::Configurable);
        let display = err.to_string();
        assert!(display.contains("grab"));
        assert!(display.contains("configurable"));

        let err = CamError::read_only(PropertyId::WidthMax);
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CamError>();
    }

    #[test]
    fn test_into_cam_error_trait() {
        let result: Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "link down",
        ));

        match result.device_err("read_temperature") {
            Err(CamError::GeneralDevice(reason)) => {
                assert!(reason.contains("read_temperature"));
                assert!(reason.contains("link down"));
            }
            other => panic!("Expected device error, got {:?}", other),
        }
    }
}
