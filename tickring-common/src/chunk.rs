// tickring-common/src/chunk.rs

use std::ops::Deref;

use crate::error::{Result, RingError};
use crate::kind::RingElement;

/// Fixed-capacity destination buffer with a separately declared size.
///
/// The backing storage is allocated once and pre-filled with the sentinel;
/// fills copy into it at explicit offsets and then declare how much is valid.
#[derive(Debug, Clone)]
pub struct WritableChunk<T> {
    data: Box<[T]>,
    size: usize,
}

impl<T: RingElement> WritableChunk<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![T::NULL; capacity].into_boxed_slice(),
            size: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn set_size(&mut self, size: usize) -> Result<()> {
        if size > self.data.len() {
            return Err(RingError::DestinationTooSmall {
                required: size,
                capacity: self.data.len(),
            });
        }
        self.size = size;
        Ok(())
    }

    /// Copies `src` into the buffer starting at `dest_offset`. The declared size
    /// is left untouched.
    pub fn copy_from_slice(&mut self, src: &[T], dest_offset: usize) -> Result<()> {
        let end = dest_offset + src.len();
        if end > self.data.len() {
            return Err(RingError::DestinationTooSmall {
                required: end,
                capacity: self.data.len(),
            });
        }
        self.data[dest_offset..end].clone_from_slice(src);
        Ok(())
    }

    #[inline]
    pub(crate) fn set_unchecked(&mut self, offset: usize, value: T) {
        self.data[offset] = value;
    }

    /// Like `copy_from_slice` but panics on overflow; callers size-check first.
    #[inline]
    pub(crate) fn write_unchecked(&mut self, src: &[T], dest_offset: usize) {
        self.data[dest_offset..dest_offset + src.len()].clone_from_slice(src);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[..self.size]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data[..self.size]
    }
}

impl<T: RingElement> Deref for WritableChunk<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

/// Result of a ranged read. Either a borrowed view straight into the ring's
/// backing array, or the caller's buffer holding a stitched two-segment copy.
///
/// Both variants borrow the ring, so no append can happen while a chunk is
/// alive.
#[derive(Debug, Clone, Copy)]
pub enum Chunk<'a, T> {
    View(&'a [T]),
    Materialized(&'a [T]),
}

impl<'a, T> Chunk<'a, T> {
    pub fn is_view(&self) -> bool {
        matches!(self, Chunk::View(_))
    }

    pub fn as_slice(&self) -> &'a [T] {
        match *self {
            Chunk::View(values) | Chunk::Materialized(values) => values,
        }
    }
}

impl<'a, T> Deref for Chunk<'a, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

/// Scratch state for `get_chunk` reads: owns the buffer that wraparound reads
/// are materialized into.
#[derive(Debug, Clone)]
pub struct GetContext<T> {
    chunk: WritableChunk<T>,
}

impl<T: RingElement> GetContext<T> {
    pub fn new(chunk_capacity: usize) -> Self {
        Self {
            chunk: WritableChunk::with_capacity(chunk_capacity),
        }
    }

    pub fn chunk_capacity(&self) -> usize {
        self.chunk.capacity()
    }

    pub(crate) fn writable_chunk(&mut self) -> &mut WritableChunk<T> {
        &mut self.chunk
    }
}
