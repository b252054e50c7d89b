//! Ordered sequences of logical row keys.
//!
//! A [`RowSequence`] offers the same keys two ways: one key at a time, or as
//! maximal contiguous ranges. The chunk accessor picks whichever is cheaper.

use std::fmt;

/// Inclusive range of logical keys `[first, last]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyRange {
    pub first: i64,
    pub last: i64,
}

impl KeyRange {
    /// Returns `None` when `first > last`.
    pub fn new(first: i64, last: i64) -> Option<KeyRange> {
        (first <= last).then_some(KeyRange { first, last })
    }

    /// Half-open constructor, `[start, end)`.
    pub fn from_half_open(start: i64, end: i64) -> Option<KeyRange> {
        KeyRange::new(start, end.checked_sub(1)?)
    }

    /// Saturates at `usize::MAX`; `[i64::MIN, i64::MAX]` has 2^64 keys.
    pub fn len(&self) -> usize {
        let len = self.last as i128 - self.first as i128 + 1;
        usize::try_from(len).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, key: i64) -> bool {
        key >= self.first && key <= self.last
    }
}

impl fmt::Debug for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.first, self.last)
    }
}

pub trait RowSequence {
    /// Total number of keys.
    fn size(&self) -> usize;

    fn first_row_key(&self) -> Option<i64>;

    fn last_row_key(&self) -> Option<i64>;

    fn is_contiguous(&self) -> bool;

    /// Hint only. Used to choose between per-key and per-range filling.
    fn average_run_length_estimate(&self) -> f64;

    fn for_each_row_key(&self, f: &mut dyn FnMut(i64));

    fn for_each_row_key_range(&self, f: &mut dyn FnMut(i64, i64));

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl RowSequence for KeyRange {
    fn size(&self) -> usize {
        self.len()
    }

    fn first_row_key(&self) -> Option<i64> {
        Some(self.first)
    }

    fn last_row_key(&self) -> Option<i64> {
        Some(self.last)
    }

    fn is_contiguous(&self) -> bool {
        true
    }

    fn average_run_length_estimate(&self) -> f64 {
        self.len() as f64
    }

    fn for_each_row_key(&self, f: &mut dyn FnMut(i64)) {
        for key in self.first..=self.last {
            f(key);
        }
    }

    fn for_each_row_key_range(&self, f: &mut dyn FnMut(i64, i64)) {
        f(self.first, self.last);
    }
}

/// Sorted, disjoint, non-adjacent key ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    ranges: Vec<KeyRange>,
    size: usize,
}

impl RowSet {
    pub fn empty() -> RowSet {
        RowSet::default()
    }

    pub fn builder() -> RowSetBuilder {
        RowSetBuilder::default()
    }

    /// Builds from keys in strictly ascending order; duplicates and
    /// out-of-order keys are ignored.
    pub fn from_keys<I: IntoIterator<Item = i64>>(keys: I) -> RowSet {
        let mut builder = RowSet::builder();
        for key in keys {
            builder.append_key(key);
        }
        builder.build()
    }

    pub fn ranges(&self) -> &[KeyRange] {
        &self.ranges
    }
}

impl From<KeyRange> for RowSet {
    fn from(range: KeyRange) -> RowSet {
        RowSet {
            ranges: vec![range],
            size: range.len(),
        }
    }
}

impl RowSequence for RowSet {
    fn size(&self) -> usize {
        self.size
    }

    fn first_row_key(&self) -> Option<i64> {
        self.ranges.first().map(|r| r.first)
    }

    fn last_row_key(&self) -> Option<i64> {
        self.ranges.last().map(|r| r.last)
    }

    fn is_contiguous(&self) -> bool {
        self.ranges.len() <= 1
    }

    fn average_run_length_estimate(&self) -> f64 {
        if self.ranges.is_empty() {
            return 0.0;
        }
        self.size as f64 / self.ranges.len() as f64
    }

    fn for_each_row_key(&self, f: &mut dyn FnMut(i64)) {
        for range in &self.ranges {
            for key in range.first..=range.last {
                f(key);
            }
        }
    }

    fn for_each_row_key_range(&self, f: &mut dyn FnMut(i64, i64)) {
        for range in &self.ranges {
            f(range.first, range.last);
        }
    }
}

/// Sequential builder; keys and ranges must arrive in ascending order.
#[derive(Debug, Default)]
pub struct RowSetBuilder {
    ranges: Vec<KeyRange>,
    size: usize,
}

impl RowSetBuilder {
    pub fn append_key(&mut self, key: i64) -> &mut Self {
        self.append_range(key, key)
    }

    pub fn append_range(&mut self, first: i64, last: i64) -> &mut Self {
        if first > last {
            return self;
        }
        match self.ranges.last_mut() {
            Some(tail) if first <= tail.last => {
                // overlap or out of order; keep only the new tail
                if last > tail.last {
                    let grown = KeyRange { first: tail.last + 1, last };
                    self.size = self.size.saturating_add(grown.len());
                    tail.last = last;
                }
            }
            Some(tail) if first == tail.last + 1 => {
                self.size = self.size.saturating_add(KeyRange { first, last }.len());
                tail.last = last;
            }
            _ => {
                self.size = self.size.saturating_add(KeyRange { first, last }.len());
                self.ranges.push(KeyRange { first, last });
            }
        }
        self
    }

    pub fn build(&mut self) -> RowSet {
        RowSet {
            ranges: std::mem::take(&mut self.ranges),
            size: std::mem::take(&mut self.size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_merges_adjacent_keys() {
        let rows = RowSet::from_keys([1, 2, 3, 7, 9, 10]);
        assert_eq!(
            rows.ranges(),
            &[
                KeyRange { first: 1, last: 3 },
                KeyRange { first: 7, last: 7 },
                KeyRange { first: 9, last: 10 }
            ]
        );
        assert_eq!(rows.size(), 6);
        assert_eq!(rows.average_run_length_estimate(), 2.0);
        assert!(!rows.is_contiguous());
    }

    #[test]
    fn builder_ignores_repeated_keys() {
        let rows = RowSet::from_keys([4, 4, 5, 3]);
        assert_eq!(rows.ranges(), &[KeyRange { first: 4, last: 5 }]);
        assert_eq!(rows.size(), 2);
    }

    #[test]
    fn empty_row_set() {
        let rows = RowSet::empty();
        assert!(rows.is_empty());
        assert!(rows.is_contiguous());
        assert_eq!(rows.first_row_key(), None);
        assert_eq!(rows.average_run_length_estimate(), 0.0);
    }

    #[test]
    fn key_range_iterates_every_key() {
        let range = KeyRange::new(3, 6).unwrap();
        let mut keys = Vec::new();
        range.for_each_row_key(&mut |k| keys.push(k));
        assert_eq!(keys, vec![3, 4, 5, 6]);
        assert!(KeyRange::new(6, 3).is_none());
        assert!(KeyRange::from_half_open(5, 5).is_none());
    }

    #[test]
    fn extreme_ranges_do_not_overflow() {
        assert!(KeyRange::from_half_open(i64::MIN, i64::MIN).is_none());
        assert_eq!(KeyRange::from_half_open(0, i64::MIN), None);
        let wide = KeyRange::new(-1, i64::MAX).unwrap();
        assert_eq!(wide.size() as u128, i64::MAX as u128 + 2);
        assert_eq!(KeyRange::new(i64::MIN, i64::MAX).unwrap().len(), usize::MAX);

        let rows = RowSet::builder().append_range(-1, i64::MAX).build();
        assert_eq!(rows.size(), wide.len());
    }
}
