// src/hal/types.rs
//! Core types shared by drivers and cameras

use serde::{Deserialize, Serialize};

/// Frame geometry cached by a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Region of interest width in pixels
    pub width: u32,
    /// Region of interest height in pixels
    pub height: u32,
    /// Horizontal ROI offset from the sensor origin
    pub offset_x: u32,
    /// Vertical ROI offset from the sensor origin
    pub offset_y: u32,
    /// Significant bits per pixel
    pub bit_depth: u8,
}

impl Geometry {
    /// Bytes used to store one output pixel
    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.bit_depth).div_ceil(8).max(1)
    }

    /// Pixels in one frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes in one output frame
    pub fn frame_size(&self) -> usize {
        self.pixel_count() * self.bytes_per_pixel()
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            offset_x: 0,
            offset_y: 0,
            bit_depth: 16,
        }
    }
}

/// Per-frame information handed to consumers alongside the pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameMetadata {
    /// Index within the current recording, starting at zero
    pub frame_index: u64,
    /// Wall-clock time the frame was completed, in nanoseconds since the epoch
    pub timestamp_nanos: u64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Significant bits per pixel
    pub bit_depth: u8,
}
