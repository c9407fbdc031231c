// src/acquisition/mod.rs
//! Frame buffering and acquisition

pub mod engine;
pub mod ring_buffer;
pub mod unpack;

pub use engine::{Frame, FrameCallback, FrameView};
pub use ring_buffer::{RingBuffer, RingBufferError, Slot};
pub use unpack::{TransferFormat, UnpackError};
