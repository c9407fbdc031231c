// src/acquisition/ring_buffer.rs
//! Circular frame store for acquisition
//!
//! A single writer fills slots in place and publishes them with
//! [`RingBuffer::advance`]; any number of readers may inspect slots whose
//! index is below [`RingBuffer::written_count`]. Each slot sits behind its own
//! lock, so a reader holding a slot delays the writer only when the writer
//! wraps around to that very slot.
//!
//! Every slot carries the generation it was written in. The generation moves
//! on at each [`RingBuffer::reset`], so a stamp never repeats across
//! recordings sharing one allocation.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;

/// One fixed-size block holding the raw pixels of a single frame
#[derive(Debug)]
pub struct Slot {
    generation: u64,
    sequence: Option<u64>,
    data: Box<[u8]>,
}

impl Slot {
    fn new(frame_size: usize) -> Self {
        Self {
            generation: 0,
            sequence: None,
            data: vec![0u8; frame_size].into_boxed_slice(),
        }
    }

    /// Frame index stamped by the last writer, if any
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Buffer generation the slot was last handed out for writing in
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stamp the frame index of the content just written
    pub fn set_sequence(&mut self, sequence: u64) {
        self.sequence = Some(sequence);
    }

    /// Mark the content as being rewritten
    pub fn invalidate(&mut self) {
        self.sequence = None;
    }

    /// Raw frame bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw frame bytes, for filling in place
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

struct Storage {
    frame_size: usize,
    slots: Box<[RwLock<Slot>]>,
}

/// Ring buffer error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingBufferError {
    /// `allocate` called on an allocated buffer
    #[error("ring buffer is already allocated")]
    AlreadyAllocated,
    /// Zero frame size or block count
    #[error("invalid ring buffer size: {frame_size} bytes x {block_count} blocks")]
    InvalidSize {
        /// Requested bytes per slot
        frame_size: usize,
        /// Requested number of slots
        block_count: usize,
    },
    /// Operation requires an allocation
    #[error("ring buffer is not allocated")]
    NotAllocated,
    /// Read beyond the written region
    #[error("slot {index} has not been written (written: {written})")]
    IndexOutOfRange {
        /// Requested logical index
        index: usize,
        /// Number of written slots at the time of the request
        written: usize,
    },
    /// The slot holds no complete frame, its last fill failed
    #[error("slot {index} holds no complete frame")]
    Incomplete {
        /// Requested logical index
        index: usize,
    },
    /// The slot was reused for a newer frame
    #[error("frame {expected} was overwritten")]
    Overwritten {
        /// Frame index the caller expected
        expected: u64,
        /// Frame index currently held by the slot
        found: Option<u64>,
    },
}

/// Fixed-capacity circular store of equally sized frame slots
pub struct RingBuffer {
    storage: Option<Storage>,
    write_cursor: AtomicUsize,
    written: AtomicUsize,
    generation: AtomicU64,
}

impl RingBuffer {
    /// Create an unallocated ring buffer
    pub fn new() -> Self {
        Self {
            storage: None,
            write_cursor: AtomicUsize::new(0),
            written: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Create and allocate in one step
    pub fn with_capacity(frame_size: usize, block_count: usize) -> Result<Self, RingBufferError> {
        let mut buffer = Self::new();
        buffer.allocate(frame_size, block_count)?;
        Ok(buffer)
    }

    /// Allocate `block_count` slots of `frame_size` bytes each
    pub fn allocate(&mut self, frame_size: usize, block_count: usize) -> Result<(), RingBufferError> {
        if self.storage.is_some() {
            return Err(RingBufferError::AlreadyAllocated);
        }
        if frame_size == 0 || block_count == 0 {
            return Err(RingBufferError::InvalidSize {
                frame_size,
                block_count,
            });
        }

        let slots = (0..block_count)
            .map(|_| RwLock::new(Slot::new(frame_size)))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        self.storage = Some(Storage { frame_size, slots });
        self.write_cursor.store(0, Ordering::Release);
        self.written.store(0, Ordering::Release);
        Ok(())
    }

    /// Drop the allocation
    pub fn release(&mut self) {
        self.storage = None;
        self.write_cursor.store(0, Ordering::Release);
        self.written.store(0, Ordering::Release);
    }

    /// Rewind the write cursor, logically discarding all content
    ///
    /// Starts a new generation, so handles to earlier frames never match
    /// frames written afterwards.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.write_cursor.store(0, Ordering::Release);
        self.written.store(0, Ordering::Release);
    }

    /// Current generation, bumped by every [`reset`](Self::reset)
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Slot at the write cursor, locked for writing; does not advance
    ///
    /// The slot is tagged with the current generation.
    pub fn current_write_slot(&self) -> Result<RwLockWriteGuard<'_, Slot>, RingBufferError> {
        let storage = self.storage()?;
        let cursor = self.write_cursor.load(Ordering::Acquire);
        let mut slot = storage.slots[cursor].write();
        slot.generation = self.generation();
        Ok(slot)
    }

    /// Publish the current slot and move the cursor, wrapping at capacity
    ///
    /// Returns the new cursor position.
    pub fn advance(&self) -> Result<usize, RingBufferError> {
        let block_count = self.storage()?.slots.len();
        let next = (self.write_cursor.load(Ordering::Acquire) + 1) % block_count;
        self.write_cursor.store(next, Ordering::Release);

        // Saturates at capacity; the closure never returns None.
        let _ = self
            .written
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |written| {
                Some((written + 1).min(block_count))
            });
        Ok(next)
    }

    /// Read access to an already written slot
    ///
    /// A slot whose last fill was abandoned is refused rather than exposing
    /// partial content.
    pub fn slot_at(&self, index: usize) -> Result<RwLockReadGuard<'_, Slot>, RingBufferError> {
        let storage = self.storage()?;
        let written = self.written.load(Ordering::Acquire);
        if index >= written {
            return Err(RingBufferError::IndexOutOfRange { index, written });
        }
        let slot = storage.slots[index].read();
        if slot.sequence.is_none() {
            return Err(RingBufferError::Incomplete { index });
        }
        Ok(slot)
    }

    /// Number of distinct slots written so far, capped at the block count
    pub fn written_count(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    /// Index of the next slot to fill
    pub fn write_cursor(&self) -> usize {
        self.write_cursor.load(Ordering::Acquire)
    }

    /// Number of slots, zero when unallocated
    pub fn block_count(&self) -> usize {
        self.storage.as_ref().map_or(0, |s| s.slots.len())
    }

    /// Bytes per slot, zero when unallocated
    pub fn frame_size(&self) -> usize {
        self.storage.as_ref().map_or(0, |s| s.frame_size)
    }

    /// Whether slots have been allocated
    pub fn is_allocated(&self) -> bool {
        self.storage.is_some()
    }

    fn storage(&self) -> Result<&Storage, RingBufferError> {
        self.storage.as_ref().ok_or(RingBufferError::NotAllocated)
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("frame_size", &self.frame_size())
            .field("block_count", &self.block_count())
            .field("write_cursor", &self.write_cursor())
            .field("written", &self.written_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(buffer: &RingBuffer, value: u8) {
        let mut slot = buffer.current_write_slot().unwrap();
        slot.data_mut().fill(value);
        slot.set_sequence(u64::from(value));
        drop(slot);
        buffer.advance().unwrap();
    }

    #[test]
    fn test_allocate_rules() {
        let mut buffer = RingBuffer::new();
        assert!(!buffer.is_allocated());
        assert_eq!(
            buffer.allocate(0, 4),
            Err(RingBufferError::InvalidSize { frame_size: 0, block_count: 4 })
        );
        assert!(buffer.allocate(16, 0).is_err());

        buffer.allocate(16, 4).unwrap();
        assert_eq!(buffer.allocate(16, 4), Err(RingBufferError::AlreadyAllocated));
        assert_eq!(buffer.frame_size(), 16);
        assert_eq!(buffer.block_count(), 4);

        buffer.release();
        assert!(buffer.allocate(8, 2).is_ok());
    }

    #[test]
    fn test_unallocated_access_fails() {
        let buffer = RingBuffer::new();
        assert!(matches!(buffer.current_write_slot(), Err(RingBufferError::NotAllocated)));
        assert_eq!(buffer.advance(), Err(RingBufferError::NotAllocated));
        assert!(buffer.slot_at(0).is_err());
    }

    #[test]
    fn test_overwrite_oldest() {
        let buffer = RingBuffer::with_capacity(8, 4).unwrap();
        for value in 1..=5 {
            fill(&buffer, value);
        }

        assert_eq!(buffer.written_count(), 4);
        assert_eq!(buffer.slot_at(0).unwrap().data(), &[5u8; 8]);
        assert_eq!(buffer.slot_at(1).unwrap().data(), &[2u8; 8]);
        assert_eq!(buffer.write_cursor(), 1);
    }

    #[test]
    fn test_read_beyond_written() {
        let buffer = RingBuffer::with_capacity(4, 3).unwrap();
        fill(&buffer, 1);
        assert!(buffer.slot_at(0).is_ok());
        assert_eq!(
            buffer.slot_at(1).unwrap_err(),
            RingBufferError::IndexOutOfRange { index: 1, written: 1 }
        );
    }

    #[test]
    fn test_current_slot_does_not_advance() {
        let buffer = RingBuffer::with_capacity(4, 3).unwrap();
        {
            let _slot = buffer.current_write_slot().unwrap();
        }
        assert_eq!(buffer.write_cursor(), 0);
        assert_eq!(buffer.written_count(), 0);
    }

    #[test]
    fn test_reset_keeps_allocation() {
        let buffer = RingBuffer::with_capacity(4, 3).unwrap();
        fill(&buffer, 1);
        fill(&buffer, 2);
        buffer.reset();

        assert_eq!(buffer.written_count(), 0);
        assert_eq!(buffer.write_cursor(), 0);
        assert!(buffer.is_allocated());
        assert_eq!(buffer.block_count(), 3);
    }

    #[test]
    fn test_reset_starts_new_generation() {
        let buffer = RingBuffer::with_capacity(4, 2).unwrap();
        fill(&buffer, 1);
        assert_eq!(buffer.slot_at(0).unwrap().generation(), 0);

        buffer.reset();
        assert_eq!(buffer.generation(), 1);
        fill(&buffer, 1);
        assert_eq!(buffer.slot_at(0).unwrap().generation(), 1);
    }

    #[test]
    fn test_abandoned_fill_is_not_readable() {
        let buffer = RingBuffer::with_capacity(4, 2).unwrap();
        fill(&buffer, 1);
        fill(&buffer, 2);

        // Writer wraps to slot 0 and gives up halfway
        {
            let mut slot = buffer.current_write_slot().unwrap();
            slot.invalidate();
            slot.data_mut()[..2].fill(9);
        }

        assert_eq!(buffer.written_count(), 2);
        assert_eq!(
            buffer.slot_at(0).unwrap_err(),
            RingBufferError::Incomplete { index: 0 }
        );
        assert_eq!(buffer.slot_at(1).unwrap().data(), &[2u8; 4]);
    }
}
