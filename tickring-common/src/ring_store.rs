//! Fixed-capacity, append-only circular store.
//!
//! Logical keys grow forever; a key lives in physical slot `key % capacity`
//! until `capacity` newer values have been appended. The retained keys always
//! form one contiguous window `[cursor - size, cursor)`.

use log::debug;

use crate::error::{Result, RingError};
use crate::kind::RingElement;
use crate::row_sequence::KeyRange;

pub struct RingStore<T> {
    backing: Box<[T]>,
    next_key: i64,
}

impl<T: RingElement> RingStore<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(RingError::InvalidCapacity);
        }
        Ok(Self {
            backing: vec![T::NULL; capacity].into_boxed_slice(),
            next_key: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.backing.len()
    }

    /// Number of values ever appended.
    #[inline]
    pub fn write_cursor(&self) -> i64 {
        self.next_key
    }

    /// Never shrinks, never exceeds `capacity()`.
    #[inline]
    pub fn size(&self) -> usize {
        let capacity = self.capacity();
        if self.next_key as u64 >= capacity as u64 {
            capacity
        } else {
            self.next_key as usize
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.next_key == 0
    }

    /// Oldest retained key; 0 for an empty ring.
    pub fn first_key(&self) -> i64 {
        self.next_key - self.size() as i64
    }

    /// Newest retained key; -1 for an empty ring.
    pub fn last_key(&self) -> i64 {
        self.next_key - 1
    }

    #[inline]
    pub fn contains_index(&self, key: i64) -> bool {
        key >= 0 && key >= self.next_key - self.capacity() as i64 && key < self.next_key
    }

    pub fn indices(&self) -> Option<KeyRange> {
        KeyRange::new(self.first_key(), self.last_key())
    }

    #[inline]
    pub fn physical_slot(&self, key: i64) -> usize {
        key.rem_euclid(self.capacity() as i64) as usize
    }

    pub fn add(&mut self, value: T) {
        let slot = self.physical_slot(self.next_key);
        self.backing[slot] = value;
        self.next_key += 1;
    }

    pub fn add_slice(&mut self, values: &[T]) {
        let start = self.reserve(values.len());
        self.write_segments(start, |dest, offset| {
            let len = dest.len();
            dest.clone_from_slice(&values[offset..offset + len]);
        });
    }

    /// Appends `values[offset..offset + len]`. If the batch is longer than the
    /// capacity only its last `capacity` elements are written.
    pub fn add_range(&mut self, values: &[T], offset: usize, len: usize) -> Result<()> {
        let in_bounds = offset
            .checked_add(len)
            .is_some_and(|end| end <= values.len());
        if !in_bounds {
            return Err(RingError::SliceOutOfBounds {
                offset,
                len,
                available: values.len(),
            });
        }
        self.add_slice(&values[offset..offset + len]);
        Ok(())
    }

    /// Appends keys `[first, last]` of `src`, with the same last-N truncation
    /// as [`RingStore::add_slice`]. Values are filled straight into the
    /// backing array.
    pub fn append_from<S>(&mut self, src: &S, first: i64, last: i64) -> Result<()>
    where
        S: FillSource<T> + ?Sized,
    {
        let Some(range) = KeyRange::new(first, last) else {
            return Err(RingError::InvalidRange { first, last });
        };
        src.check_range(range)?;
        let start = self.reserve(range.len());
        let mut outcome = Ok(());
        self.write_segments(start, |dest, offset| {
            if outcome.is_ok() {
                outcome = src.fill_range(first + offset as i64, dest);
            }
        });
        outcome
    }

    /// Bounds-checked read; the sentinel for anything outside the window.
    #[inline]
    pub fn get(&self, key: i64) -> T {
        if !self.contains_index(key) {
            return T::NULL;
        }
        self.get_unchecked(key)
    }

    /// Caller guarantees `contains_index(key)`.
    #[inline]
    pub fn get_unchecked(&self, key: i64) -> T {
        debug_assert!(
            self.contains_index(key),
            "key {key} outside window {:?}",
            self.indices()
        );
        self.backing[self.physical_slot(key)].clone()
    }

    pub(crate) fn backing(&self) -> &[T] {
        &self.backing
    }

    /// Makes `self` a verbatim copy of `other`: backing array and cursor.
    pub(crate) fn replay_from(&mut self, other: &RingStore<T>) {
        debug_assert_eq!(self.capacity(), other.capacity());
        self.backing.clone_from_slice(&other.backing);
        self.next_key = other.next_key;
    }

    /// Advances the cursor for a batch of `len` values and returns where the
    /// retained tail of the batch has to be written.
    fn reserve(&mut self, len: usize) -> Reservation {
        let capacity = self.capacity();
        let (key_start, batch_offset, copy_len) = if len <= capacity {
            (self.next_key, 0, len)
        } else {
            let extra = len - capacity;
            debug!(
                "bulk append of {len} values truncated to the last {capacity} (dropping {extra})"
            );
            (self.next_key + extra as i64, extra, capacity)
        };
        self.next_key = key_start + copy_len as i64;
        Reservation {
            slot: self.physical_slot(key_start),
            batch_offset,
            len: copy_len,
        }
    }

    /// Writes a reserved batch as at most two contiguous segments: insertion
    /// slot to end of array, then wrapping to slot 0.
    fn write_segments(&mut self, r: Reservation, mut fill: impl FnMut(&mut [T], usize)) {
        let copy1_len = (self.capacity() - r.slot).min(r.len);
        let copy2_len = r.len - copy1_len;
        fill(&mut self.backing[r.slot..r.slot + copy1_len], r.batch_offset);
        if copy2_len != 0 {
            fill(&mut self.backing[..copy2_len], r.batch_offset + copy1_len);
        }
    }
}

struct Reservation {
    slot: usize,
    batch_offset: usize,
    len: usize,
}

/// Anything that can fill a contiguous logical range into a slice.
pub trait FillSource<T> {
    /// Fails when some key of `range` cannot be supplied.
    fn check_range(&self, range: KeyRange) -> Result<()>;

    /// Writes keys `first..first + dest.len()` into `dest`.
    fn fill_range(&self, first: i64, dest: &mut [T]) -> Result<()>;
}

/// Plain slices are keyed by position.
impl<T: RingElement> FillSource<T> for [T] {
    fn check_range(&self, range: KeyRange) -> Result<()> {
        if range.first < 0 || range.last >= self.len() as i64 {
            let window = KeyRange::from_half_open(0, self.len() as i64);
            let key = if range.first < 0 { range.first } else { range.last };
            return Err(RingError::KeyOutOfWindow { key, window });
        }
        Ok(())
    }

    fn fill_range(&self, first: i64, dest: &mut [T]) -> Result<()> {
        let start = first as usize;
        let len = dest.len();
        dest.clone_from_slice(&self[start..start + len]);
        Ok(())
    }
}

/// Another ring can feed this one, as long as the range is inside its window.
impl<T: RingElement> FillSource<T> for RingStore<T> {
    fn check_range(&self, range: KeyRange) -> Result<()> {
        for key in [range.first, range.last] {
            if !self.contains_index(key) {
                return Err(RingError::KeyOutOfWindow {
                    key,
                    window: self.indices(),
                });
            }
        }
        Ok(())
    }

    fn fill_range(&self, first: i64, dest: &mut [T]) -> Result<()> {
        let start = self.physical_slot(first);
        let head = (self.capacity() - start).min(dest.len());
        let (dest_head, dest_tail) = dest.split_at_mut(head);
        dest_head.clone_from_slice(&self.backing[start..start + head]);
        dest_tail.clone_from_slice(&self.backing[..dest_tail.len()]);
        Ok(())
    }
}

impl<T: RingElement> std::fmt::Debug for RingStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingStore")
            .field("capacity", &self.capacity())
            .field("write_cursor", &self.next_key)
            .field("window", &self.indices())
            .finish()
    }
}
