//! Vectorized reads over a [`RingStore`], hiding the wraparound boundary.
//!
//! A logical range whose physical slots are increasing is handed out as a
//! borrowed view of the backing array. A range that straddles slot 0 is
//! stitched into a caller-owned buffer with two copies.

use std::fmt;

use log::trace;

use crate::chunk::{Chunk, GetContext, WritableChunk};
use crate::error::{Result, RingError};
use crate::kind::RingElement;
use crate::ring_store::RingStore;
use crate::row_sequence::RowSequence;

/// Below this average run length a row sequence is filled key by key.
pub const USE_RANGES_AVERAGE_RUN_LENGTH: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    /// One slot lookup and one element copy per key.
    PerKey,
    /// One or two slice copies per maximal contiguous range.
    PerRange,
}

impl FillStrategy {
    pub fn choose(average_run_length: f64, threshold: f64) -> FillStrategy {
        if average_run_length < threshold {
            FillStrategy::PerKey
        } else {
            FillStrategy::PerRange
        }
    }
}

pub struct WraparoundChunkAccessor<'a, T> {
    ring: &'a RingStore<T>,
    use_ranges_threshold: f64,
}

impl<'a, T> Clone for WraparoundChunkAccessor<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for WraparoundChunkAccessor<'a, T> {}

impl<'a, T: RingElement> fmt::Debug for WraparoundChunkAccessor<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WraparoundChunkAccessor")
            .field("ring", self.ring)
            .field("use_ranges_threshold", &self.use_ranges_threshold)
            .finish()
    }
}

impl<'a, T: RingElement> WraparoundChunkAccessor<'a, T> {
    pub fn new(ring: &'a RingStore<T>, use_ranges_threshold: f64) -> Self {
        Self {
            ring,
            use_ranges_threshold,
        }
    }

    pub fn ring(&self) -> &'a RingStore<T> {
        self.ring
    }

    /// Reads keys `[first, last]`. Zero-copy when the physical slots do not
    /// wrap; otherwise the values are copied into `context`'s buffer.
    pub fn get_chunk<'c>(
        &self,
        context: &'c mut GetContext<T>,
        first: i64,
        last: i64,
    ) -> Result<Chunk<'c, T>>
    where
        'a: 'c,
    {
        self.check_window(first, last)?;
        let first_ix = self.ring.physical_slot(first);
        let last_ix = self.ring.physical_slot(last);
        if first_ix <= last_ix {
            return Ok(Chunk::View(&self.ring.backing()[first_ix..=last_ix]));
        }

        let len = (last - first + 1) as usize;
        let chunk = context.writable_chunk();
        if len > chunk.capacity() {
            return Err(RingError::DestinationTooSmall {
                required: len,
                capacity: chunk.capacity(),
            });
        }
        let written = self.copy_segments(chunk, 0, first_ix, last_ix);
        chunk.set_size(written)?;
        let chunk: &'c WritableChunk<T> = chunk;
        Ok(Chunk::Materialized(chunk.as_slice()))
    }

    /// Contiguous sequences go through [`Self::get_chunk`]; anything else is
    /// filled into `context`'s buffer.
    pub fn get_chunk_rows<'c>(
        &self,
        context: &'c mut GetContext<T>,
        rows: &dyn RowSequence,
    ) -> Result<Chunk<'c, T>>
    where
        'a: 'c,
    {
        if let (true, Some(first), Some(last)) =
            (rows.is_contiguous(), rows.first_row_key(), rows.last_row_key())
        {
            return self.get_chunk(context, first, last);
        }
        let chunk = context.writable_chunk();
        self.fill_chunk(chunk, rows)?;
        let chunk: &'c WritableChunk<T> = chunk;
        Ok(Chunk::Materialized(chunk.as_slice()))
    }

    /// Copies the values of `rows` into `destination` and declares its size.
    /// The strategy follows the sequence's average run length estimate.
    pub fn fill_chunk(
        &self,
        destination: &mut WritableChunk<T>,
        rows: &dyn RowSequence,
    ) -> Result<()> {
        let estimate = rows.average_run_length_estimate();
        let strategy = FillStrategy::choose(estimate, self.use_ranges_threshold);
        trace!("fill of {} rows, run length ~{estimate:.1}: {strategy:?}", rows.size());
        self.fill_chunk_with(strategy, destination, rows)
    }

    pub fn fill_chunk_with(
        &self,
        strategy: FillStrategy,
        destination: &mut WritableChunk<T>,
        rows: &dyn RowSequence,
    ) -> Result<()> {
        if rows.size() > destination.capacity() {
            return Err(RingError::DestinationTooSmall {
                required: rows.size(),
                capacity: destination.capacity(),
            });
        }
        let (Some(first), Some(last)) = (rows.first_row_key(), rows.last_row_key()) else {
            return destination.set_size(0);
        };
        self.check_window(first, last)?;

        let mut dest_offset = 0usize;
        match strategy {
            FillStrategy::PerKey => {
                rows.for_each_row_key(&mut |key| {
                    destination.set_unchecked(dest_offset, self.ring.get_unchecked(key));
                    dest_offset += 1;
                });
            }
            FillStrategy::PerRange => {
                rows.for_each_row_key_range(&mut |first, last| {
                    let first_ix = self.ring.physical_slot(first);
                    let last_ix = self.ring.physical_slot(last);
                    dest_offset += self.copy_segments(destination, dest_offset, first_ix, last_ix);
                });
            }
        }
        destination.set_size(dest_offset)
    }

    fn copy_segments(
        &self,
        destination: &mut WritableChunk<T>,
        dest_offset: usize,
        first_ix: usize,
        last_ix: usize,
    ) -> usize {
        let backing = self.ring.backing();
        if first_ix <= last_ix {
            let segment = &backing[first_ix..=last_ix];
            destination.write_unchecked(segment, dest_offset);
            segment.len()
        } else {
            let head = &backing[first_ix..];
            let tail = &backing[..=last_ix];
            destination.write_unchecked(head, dest_offset);
            destination.write_unchecked(tail, dest_offset + head.len());
            head.len() + tail.len()
        }
    }

    fn check_window(&self, first: i64, last: i64) -> Result<()> {
        if first > last {
            return Err(RingError::InvalidRange { first, last });
        }
        for key in [first, last] {
            if !self.ring.contains_index(key) {
                return Err(RingError::KeyOutOfWindow {
                    key,
                    window: self.ring.indices(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_threshold() {
        assert_eq!(FillStrategy::choose(1.0, 5.0), FillStrategy::PerKey);
        assert_eq!(FillStrategy::choose(4.99, 5.0), FillStrategy::PerKey);
        assert_eq!(FillStrategy::choose(5.0, 5.0), FillStrategy::PerRange);
    }

    #[test]
    fn full_lap_from_slot_zero_is_a_view() {
        let mut ring = RingStore::<i64>::new(4).unwrap();
        ring.add_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let accessor = WraparoundChunkAccessor::new(&ring, USE_RANGES_AVERAGE_RUN_LENGTH);
        let mut context = GetContext::new(4);
        let chunk = accessor.get_chunk(&mut context, 4, 7).unwrap();
        assert!(chunk.is_view());
        assert_eq!(&*chunk, &[5, 6, 7, 8]);
    }

    #[test]
    fn debug_shows_the_ring_window() {
        let mut ring = RingStore::<f32>::new(3).unwrap();
        ring.add_slice(&[1.0, 2.0, 3.0, 4.0]);
        let accessor = WraparoundChunkAccessor::new(&ring, USE_RANGES_AVERAGE_RUN_LENGTH);
        let shown = format!("{accessor:?}");
        assert!(shown.starts_with("WraparoundChunkAccessor"), "{shown}");
        assert!(shown.contains("[1, 3]"), "{shown}");
    }
}
