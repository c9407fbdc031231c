// src/acquisition/engine.rs
//! Frame acquisition: synchronous grab and the push loop
//!
//! Both paths fill the ring buffer through [`acquire_frame`]. The push loop
//! runs it on a dedicated thread while the camera is in
//! [`CameraState::ActiveAsync`] and forwards every completed frame over a
//! channel to a second thread that invokes the registered consumer.

use crate::acquisition::ring_buffer::{RingBuffer, RingBufferError, Slot};
use crate::acquisition::unpack::{unpack_into, TransferFormat};
use crate::camera::state::StateCell;
use crate::camera::CameraState;
use crate::config::constants::acquisition;
use crate::error::{CamError, CamResult, IntoCamError};
use crate::hal::{DeviceDriver, FrameMetadata, Geometry, SharedDriver};
use crate::utils::current_timestamp_nanos;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::RwLockReadGuard;
use std::ops::Deref;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

/// Consumer invoked once per frame while recording asynchronously
pub type FrameCallback = Box<dyn FnMut(Frame) + Send + 'static>;

/// Frame counter for one recording
#[derive(Debug, Default)]
pub(crate) struct AcquisitionSession {
    next_index: u64,
}

impl AcquisitionSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Frames acquired so far
    pub(crate) fn frames(&self) -> u64 {
        self.next_index
    }
}

/// Handle to one acquired frame
///
/// The pixel data stays in the ring buffer. A handle kept after the writer
/// reused its slot reports [`RingBufferError::Overwritten`] instead of
/// returning the newer content.
#[derive(Clone)]
pub struct Frame {
    metadata: FrameMetadata,
    slot: usize,
    generation: u64,
    buffer: Arc<RingBuffer>,
}

impl Frame {
    /// Index within the recording, starting at zero
    pub fn index(&self) -> u64 {
        self.metadata.frame_index
    }

    /// Geometry and timestamp of the frame
    pub fn metadata(&self) -> &FrameMetadata {
        &self.metadata
    }

    /// Ring buffer slot holding the pixels
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Borrow the pixel data
    ///
    /// Holding the view blocks the writer once it wraps around to this slot.
    pub fn read(&self) -> CamResult<FrameView<'_>> {
        let guard = match self.buffer.slot_at(self.slot) {
            Ok(guard) => guard,
            Err(RingBufferError::Incomplete { .. }) => {
                return Err(RingBufferError::Overwritten {
                    expected: self.index(),
                    found: None,
                }
                .into())
            }
            Err(err) => return Err(err.into()),
        };
        if guard.generation() != self.generation || guard.sequence() != Some(self.index()) {
            return Err(RingBufferError::Overwritten {
                expected: self.index(),
                found: guard.sequence(),
            }
            .into());
        }
        Ok(FrameView { guard })
    }

    /// Copy the pixel data out of the ring buffer
    pub fn to_vec(&self) -> CamResult<Vec<u8>> {
        Ok(self.read()?.to_vec())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("metadata", &self.metadata)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Read access to the pixels of a [`Frame`]
pub struct FrameView<'a> {
    guard: RwLockReadGuard<'a, Slot>,
}

impl Deref for FrameView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.guard.data()
    }
}

/// Fill the current write slot with one frame and publish it
///
/// Drivers whose transfer format is not native are grabbed into `scratch`
/// and unpacked into the slot. Driver errors are returned unchanged; the slot
/// is left unpublished.
pub(crate) fn acquire_frame(
    driver: &mut dyn DeviceDriver,
    buffer: &Arc<RingBuffer>,
    session: &mut AcquisitionSession,
    geometry: &Geometry,
    format: TransferFormat,
    scratch: &mut Vec<u8>,
) -> CamResult<Frame> {
    let frame_index = session.next_index;
    let slot = buffer.write_cursor();
    let generation;

    {
        let mut target = buffer.current_write_slot()?;
        target.invalidate();
        generation = target.generation();

        if format.is_native() {
            driver.grab(target.data_mut())?;
        } else {
            let pixels = geometry.pixel_count();
            scratch.resize(format.transfer_size(pixels, geometry.bytes_per_pixel()), 0);
            driver.grab(&mut scratch[..])?;
            unpack_into(format, &scratch[..], target.data_mut(), pixels).device_err("unpack")?;
        }

        target.set_sequence(frame_index);
    }

    buffer.advance()?;
    session.next_index += 1;

    trace!(frame = frame_index, slot, "frame acquired");

    Ok(Frame {
        metadata: FrameMetadata {
            frame_index,
            timestamp_nanos: current_timestamp_nanos(),
            width: geometry.width,
            height: geometry.height,
            bit_depth: geometry.bit_depth,
        },
        slot,
        generation,
        buffer: Arc::clone(buffer),
    })
}

/// Everything the push loop needs from the camera
pub(crate) struct PushLoop {
    pub driver: SharedDriver,
    pub buffer: Arc<RingBuffer>,
    pub state: StateCell,
    pub geometry: Geometry,
    pub format: TransferFormat,
}

/// Running push loop and consumer thread
pub(crate) struct AsyncEngine {
    acquisition: JoinHandle<CamResult<u64>>,
    delivery: JoinHandle<FrameCallback>,
}

/// Outcome of joining the engine threads
pub(crate) struct EngineExit {
    /// Frames acquired, or the error that ended the push loop
    pub result: CamResult<u64>,
    /// Consumer handed back, `None` if it panicked
    pub callback: Option<FrameCallback>,
}

impl AsyncEngine {
    /// Start both threads
    ///
    /// The state cell must already read [`CameraState::ActiveAsync`]. On
    /// failure the consumer is handed back when it can be recovered.
    pub(crate) fn spawn(
        push: PushLoop,
        callback: FrameCallback,
    ) -> Result<Self, (CamError, Option<FrameCallback>)> {
        let (tx, rx) = channel::unbounded::<Frame>();

        let delivery = thread::Builder::new()
            .name(acquisition::DELIVERY_THREAD_NAME.to_string())
            .spawn(move || deliver(rx, callback))
            .device_err("spawn delivery thread")
            .map_err(|err| (err, None))?;

        let spawned = thread::Builder::new()
            .name(acquisition::ACQUISITION_THREAD_NAME.to_string())
            .spawn(move || push_loop(push, tx))
            .device_err("spawn acquisition thread");

        match spawned {
            Ok(acquisition) => {
                info!("push loop started");
                Ok(Self {
                    acquisition,
                    delivery,
                })
            }
            Err(err) => {
                // The sender went down with the closure, so delivery ends.
                let callback = delivery.join().ok();
                Err((err, callback))
            }
        }
    }

    /// Wait for both threads to finish
    ///
    /// The caller must have moved the state away from `ActiveAsync` first.
    pub(crate) fn join(self) -> EngineExit {
        let result = self.acquisition.join().unwrap_or_else(|_| {
            error!("acquisition thread panicked");
            Err(CamError::GeneralDevice("acquisition thread panicked".to_string()))
        });

        let callback = match self.delivery.join() {
            Ok(callback) => Some(callback),
            Err(_) => {
                error!("frame consumer panicked; it has been unregistered");
                None
            }
        };

        EngineExit { result, callback }
    }
}

fn push_loop(push: PushLoop, tx: Sender<Frame>) -> CamResult<u64> {
    let PushLoop {
        driver,
        buffer,
        state,
        geometry,
        format,
    } = push;

    let mut session = AcquisitionSession::new();
    let mut scratch = Vec::new();

    while state.get() == CameraState::ActiveAsync {
        let acquired = {
            let mut driver = driver.lock();
            acquire_frame(
                &mut **driver,
                &buffer,
                &mut session,
                &geometry,
                format,
                &mut scratch,
            )
        };

        match acquired {
            Ok(frame) => {
                if tx.send(frame).is_err() {
                    warn!("frame consumer is gone, leaving push loop");
                    break;
                }
            }
            Err(err) => {
                error!(error = %err, frames = session.frames(), "push loop stopped by driver error");
                return Err(err);
            }
        }
    }

    debug!(frames = session.frames(), "push loop finished");
    Ok(session.frames())
}

fn deliver(rx: Receiver<Frame>, mut callback: FrameCallback) -> FrameCallback {
    for frame in rx {
        callback(frame);
    }
    callback
}
