//! Instant columns: timestamps kept as nanoseconds since the Unix epoch in a
//! `long` ring, converted to `DateTime<Utc>` only at the edges.

use chrono::{DateTime, Utc};

use crate::chunk::{Chunk, GetContext, WritableChunk};
use crate::column::{DualGenerationRingColumn, Generation};
use crate::common_config::{RingConfig, CONFIG};
use crate::error::{Result, RingError};
use crate::kind::{RingKind, NULL_LONG};
use crate::ring_store::RingStore;
use crate::row_sequence::RowSequence;

pub fn instant_to_nanos(instant: Option<DateTime<Utc>>) -> Result<i64> {
    match instant {
        None => Ok(NULL_LONG),
        Some(instant) => match instant.timestamp_nanos_opt() {
            // the sentinel itself is not a storable instant
            Some(nanos) if nanos != NULL_LONG => Ok(nanos),
            _ => Err(RingError::InstantOutOfRange),
        },
    }
}

pub fn nanos_to_instant(nanos: i64) -> Option<DateTime<Utc>> {
    (nanos != NULL_LONG).then(|| DateTime::from_timestamp_nanos(nanos))
}

#[derive(Debug)]
pub struct InstantRingColumn {
    nanos: DualGenerationRingColumn<i64>,
}

impl InstantRingColumn {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(capacity, &CONFIG)
    }

    pub fn with_config(capacity: usize, config: &RingConfig) -> Result<Self> {
        config.check_budget(RingKind::Instant, capacity)?;
        Ok(Self {
            nanos: DualGenerationRingColumn::with_config(capacity, config)?,
        })
    }

    /// The underlying nanosecond column.
    pub fn nanos(&self) -> &DualGenerationRingColumn<i64> {
        &self.nanos
    }

    pub fn capacity(&self) -> usize {
        self.nanos.capacity()
    }

    pub fn append(&mut self, instant: Option<DateTime<Utc>>) -> Result<()> {
        let nanos = instant_to_nanos(instant)?;
        self.nanos.append(nanos);
        Ok(())
    }

    /// Converts the whole batch before writing, so a bad instant leaves the
    /// ring untouched.
    pub fn append_slice(&mut self, instants: &[Option<DateTime<Utc>>]) -> Result<()> {
        let nanos = instants
            .iter()
            .map(|instant| instant_to_nanos(*instant))
            .collect::<Result<Vec<i64>>>()?;
        self.nanos.append_slice(&nanos);
        Ok(())
    }

    pub fn append_nanos(&mut self, nanos: &[i64]) {
        self.nanos.append_slice(nanos);
    }

    pub fn append_nanos_from(&mut self, src: &RingStore<i64>, first: i64, last: i64) -> Result<()> {
        self.nanos.append_from(src, first, last)
    }

    pub fn advance_generation(&mut self) {
        self.nanos.advance_generation();
    }

    pub fn get(&self, key: i64) -> Option<DateTime<Utc>> {
        nanos_to_instant(self.nanos.get(key))
    }

    pub fn get_prev(&self, key: i64) -> Option<DateTime<Utc>> {
        nanos_to_instant(self.nanos.get_prev(key))
    }

    pub fn get_nanos_chunk<'c>(
        &'c self,
        generation: Generation,
        context: &'c mut GetContext<i64>,
        first: i64,
        last: i64,
    ) -> Result<Chunk<'c, i64>> {
        self.nanos.accessor(generation).get_chunk(context, first, last)
    }

    pub fn fill_nanos_chunk(
        &self,
        generation: Generation,
        destination: &mut WritableChunk<i64>,
        rows: &dyn RowSequence,
    ) -> Result<()> {
        self.nanos.accessor(generation).fill_chunk(destination, rows)
    }

    pub fn window_instants(&self, generation: Generation) -> Result<Vec<Option<DateTime<Utc>>>> {
        Ok(self
            .nanos
            .window_values(generation)?
            .into_iter()
            .map(nanos_to_instant)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nanos_round_trip() {
        let instant = DateTime::from_timestamp(1_700_000_000, 123).unwrap();
        let nanos = instant_to_nanos(Some(instant)).unwrap();
        assert_eq!(nanos, 1_700_000_000_000_000_123);
        assert_eq!(nanos_to_instant(nanos), Some(instant));
        assert_eq!(instant_to_nanos(None).unwrap(), NULL_LONG);
        assert_eq!(nanos_to_instant(NULL_LONG), None);
    }

    #[test]
    fn far_future_is_rejected() {
        let far = DateTime::from_timestamp(i64::MAX / 1_000_000_000 + 1, 0).unwrap();
        assert_eq!(instant_to_nanos(Some(far)), Err(RingError::InstantOutOfRange));
    }

    #[test]
    fn budget_error_names_the_instant_kind() {
        let mut config = CONFIG.clone();
        config.max_ring_bytes = 64;
        assert!(InstantRingColumn::with_config(4, &config).is_ok());
        assert!(matches!(
            InstantRingColumn::with_config(5, &config),
            Err(RingError::CapacityExceedsBudget {
                kind: RingKind::Instant,
                ..
            })
        ));
    }
}
