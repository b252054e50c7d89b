//! Dual-generation ring column: a live `current` ring plus a `previous` ring
//! frozen at the last cycle barrier.
//!
//! There is no internal locking. The borrow rules carry the single-writer
//! contract instead:
//! - appends and [`DualGenerationRingColumn::advance_generation`] take
//!   `&mut self`, so they never overlap each other or any read;
//! - [`DualGenerationRingColumn::begin_cycle`] splits the column into a
//!   [`CycleWriter`] (exclusive on `current`) and a shared `previous`, so
//!   readers of `previous` can run on other threads while the writer appends.

use log::debug;

use crate::chunk::{Chunk, GetContext, WritableChunk};
use crate::chunk_accessor::WraparoundChunkAccessor;
use crate::common_config::{RingConfig, CONFIG};
use crate::error::Result;
use crate::kind::RingElement;
use crate::ring_store::{FillSource, RingStore};
use crate::row_sequence::{KeyRange, RowSequence};

/// Which of the two buffered states a read targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    Current,
    Previous,
}

/// Keys that entered and left the window between two generations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableUpdate {
    pub added: Option<KeyRange>,
    pub removed: Option<KeyRange>,
}

impl TableUpdate {
    /// Delta from window `before` to window `after`. Windows only move
    /// forward, so each side of the difference is one contiguous range.
    pub fn between(before: Option<KeyRange>, after: Option<KeyRange>) -> TableUpdate {
        match (before, after) {
            (None, after) => TableUpdate {
                added: after,
                removed: None,
            },
            (before, None) => TableUpdate {
                added: None,
                removed: before,
            },
            (Some(b), Some(a)) => TableUpdate {
                added: KeyRange::new(a.first.max(b.last + 1), a.last),
                removed: KeyRange::new(b.first, b.last.min(a.first - 1)),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_none() && self.removed.is_none()
    }
}

pub struct DualGenerationRingColumn<T> {
    current: RingStore<T>,
    previous: RingStore<T>,
    generation: u64,
    use_ranges_threshold: f64,
}

impl<T: RingElement> DualGenerationRingColumn<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(capacity, &CONFIG)
    }

    pub fn with_config(capacity: usize, config: &RingConfig) -> Result<Self> {
        config.check_budget(T::KIND, capacity)?;
        Ok(Self {
            current: RingStore::new(capacity)?,
            previous: RingStore::new(capacity)?,
            generation: 0,
            use_ranges_threshold: config.use_ranges_average_run_length,
        })
    }

    pub fn capacity(&self) -> usize {
        self.current.capacity()
    }

    /// Number of completed `advance_generation` calls.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current(&self) -> &RingStore<T> {
        &self.current
    }

    pub fn previous(&self) -> &RingStore<T> {
        &self.previous
    }

    pub fn ring(&self, generation: Generation) -> &RingStore<T> {
        match generation {
            Generation::Current => &self.current,
            Generation::Previous => &self.previous,
        }
    }

    pub fn append(&mut self, value: T) {
        self.current.add(value);
    }

    pub fn append_slice(&mut self, values: &[T]) {
        self.current.add_slice(values);
    }

    pub fn append_range(&mut self, values: &[T], offset: usize, len: usize) -> Result<()> {
        self.current.add_range(values, offset, len)
    }

    pub fn append_from<S>(&mut self, src: &S, first: i64, last: i64) -> Result<()>
    where
        S: FillSource<T> + ?Sized,
    {
        self.current.append_from(src, first, last)
    }

    /// Opens a write cycle. The returned writer appends to `current` and can
    /// hand out `previous` to concurrent readers.
    pub fn begin_cycle(&mut self) -> CycleWriter<'_, T> {
        CycleWriter {
            current: &mut self.current,
            previous: &self.previous,
            use_ranges_threshold: self.use_ranges_threshold,
        }
    }

    /// Snapshots `current` into `previous`: whole backing array plus cursor.
    /// Call once per cycle, after the last append and before readers look at
    /// the new `previous`.
    pub fn advance_generation(&mut self) {
        self.previous.replay_from(&self.current);
        self.generation += 1;
        debug!(
            "advanced to generation {}, window {:?}",
            self.generation,
            self.previous.indices()
        );
    }

    /// What a reader of `previous` would see change once the generation
    /// advances.
    pub fn pending_update(&self) -> TableUpdate {
        TableUpdate::between(self.previous.indices(), self.current.indices())
    }

    pub fn accessor(&self, generation: Generation) -> WraparoundChunkAccessor<'_, T> {
        WraparoundChunkAccessor::new(self.ring(generation), self.use_ranges_threshold)
    }

    pub fn get(&self, key: i64) -> T {
        self.current.get(key)
    }

    pub fn get_prev(&self, key: i64) -> T {
        self.previous.get(key)
    }

    pub fn get_unchecked(&self, key: i64) -> T {
        self.current.get_unchecked(key)
    }

    pub fn get_prev_unchecked(&self, key: i64) -> T {
        self.previous.get_unchecked(key)
    }

    pub fn get_chunk<'c>(
        &'c self,
        context: &'c mut GetContext<T>,
        first: i64,
        last: i64,
    ) -> Result<Chunk<'c, T>> {
        self.accessor(Generation::Current)
            .get_chunk(context, first, last)
    }

    pub fn get_prev_chunk<'c>(
        &'c self,
        context: &'c mut GetContext<T>,
        first: i64,
        last: i64,
    ) -> Result<Chunk<'c, T>> {
        self.accessor(Generation::Previous)
            .get_chunk(context, first, last)
    }

    pub fn get_chunk_rows<'c>(
        &'c self,
        context: &'c mut GetContext<T>,
        rows: &dyn RowSequence,
    ) -> Result<Chunk<'c, T>> {
        self.accessor(Generation::Current)
            .get_chunk_rows(context, rows)
    }

    pub fn get_prev_chunk_rows<'c>(
        &'c self,
        context: &'c mut GetContext<T>,
        rows: &dyn RowSequence,
    ) -> Result<Chunk<'c, T>> {
        self.accessor(Generation::Previous)
            .get_chunk_rows(context, rows)
    }

    pub fn fill_chunk(&self, destination: &mut WritableChunk<T>, rows: &dyn RowSequence) -> Result<()> {
        self.accessor(Generation::Current)
            .fill_chunk(destination, rows)
    }

    pub fn fill_prev_chunk(
        &self,
        destination: &mut WritableChunk<T>,
        rows: &dyn RowSequence,
    ) -> Result<()> {
        self.accessor(Generation::Previous)
            .fill_chunk(destination, rows)
    }

    /// Copies the whole window of one generation, oldest first.
    pub fn window_values(&self, generation: Generation) -> Result<Vec<T>> {
        let ring = self.ring(generation);
        let Some(window) = ring.indices() else {
            return Ok(Vec::new());
        };
        let mut destination = WritableChunk::with_capacity(window.len());
        self.accessor(generation).fill_chunk(&mut destination, &window)?;
        Ok(destination.as_slice().to_vec())
    }
}

/// Exclusive write access to `current` for one cycle.
///
/// Dropping the writer ends the cycle; the owner then calls
/// [`DualGenerationRingColumn::advance_generation`].
pub struct CycleWriter<'a, T> {
    current: &'a mut RingStore<T>,
    previous: &'a RingStore<T>,
    use_ranges_threshold: f64,
}

impl<'a, T: RingElement> CycleWriter<'a, T> {
    pub fn append(&mut self, value: T) {
        self.current.add(value);
    }

    pub fn append_slice(&mut self, values: &[T]) {
        self.current.add_slice(values);
    }

    pub fn append_range(&mut self, values: &[T], offset: usize, len: usize) -> Result<()> {
        self.current.add_range(values, offset, len)
    }

    pub fn append_from<S>(&mut self, src: &S, first: i64, last: i64) -> Result<()>
    where
        S: FillSource<T> + ?Sized,
    {
        self.current.append_from(src, first, last)
    }

    pub fn current(&self) -> &RingStore<T> {
        self.current
    }

    /// The frozen generation. Lives as long as the cycle, independent of
    /// further appends through this writer, and is `Sync`.
    pub fn previous(&self) -> &'a RingStore<T> {
        self.previous
    }

    pub fn previous_accessor(&self) -> WraparoundChunkAccessor<'a, T> {
        WraparoundChunkAccessor::new(self.previous, self.use_ranges_threshold)
    }
}

impl<T: RingElement> std::fmt::Debug for DualGenerationRingColumn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualGenerationRingColumn")
            .field("kind", &T::KIND)
            .field("generation", &self.generation)
            .field("current", &self.current)
            .field("previous", &self.previous)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_between_windows() {
        let before = KeyRange::new(2, 5);
        let after = KeyRange::new(4, 9);
        let update = TableUpdate::between(before, after);
        assert_eq!(update.added, KeyRange::new(6, 9));
        assert_eq!(update.removed, KeyRange::new(2, 3));

        let jumped = TableUpdate::between(before, KeyRange::new(20, 23));
        assert_eq!(jumped.added, KeyRange::new(20, 23));
        assert_eq!(jumped.removed, before);

        assert!(TableUpdate::between(before, before).is_empty());
        assert_eq!(TableUpdate::between(None, after).added, after);
    }
}
