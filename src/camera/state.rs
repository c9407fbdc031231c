// src/camera/state.rs
//! Lifecycle states

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CameraState {
    /// Properties may be written and buffers reallocated
    Configurable = 0,
    /// Recording, frames pulled by the caller with `grab`
    ActiveSync = 1,
    /// Recording, frames pushed to the registered consumer
    ActiveAsync = 2,
}

impl CameraState {
    /// Whether the camera is recording
    pub fn is_active(self) -> bool {
        self != CameraState::Configurable
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => CameraState::ActiveSync,
            2 => CameraState::ActiveAsync,
            _ => CameraState::Configurable,
        }
    }
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CameraState::Configurable => "configurable",
            CameraState::ActiveSync => "active (sync)",
            CameraState::ActiveAsync => "active (async)",
        };
        f.write_str(name)
    }
}

/// State shared between a camera and its push loop
///
/// The push loop polls it between frames; the camera is the only writer.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(CameraState::Configurable as u8)))
    }

    pub(crate) fn get(&self) -> CameraState {
        CameraState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: CameraState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
