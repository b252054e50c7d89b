//! Ring tables: named ring columns of one capacity that are appended to and
//! advanced together.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;

use crate::column::{DualGenerationRingColumn, Generation, TableUpdate};
use crate::common_config::{RingConfig, CONFIG};
use crate::error::{Result, RingError};
use crate::instant::{instant_to_nanos, InstantRingColumn};
use crate::kind::RingKind;
use crate::row_sequence::KeyRange;

pub type ByteRingColumn = DualGenerationRingColumn<i8>;
pub type CharRingColumn = DualGenerationRingColumn<u16>;
pub type ShortRingColumn = DualGenerationRingColumn<i16>;
pub type IntRingColumn = DualGenerationRingColumn<i32>;
pub type LongRingColumn = DualGenerationRingColumn<i64>;
pub type FloatRingColumn = DualGenerationRingColumn<f32>;
pub type DoubleRingColumn = DualGenerationRingColumn<f64>;
pub type BooleanRingColumn = DualGenerationRingColumn<Option<bool>>;
pub type ObjectRingColumn<V> = DualGenerationRingColumn<Option<Arc<V>>>;
pub type StringRingColumn = ObjectRingColumn<str>;

/// A ring column whose kind is only known at runtime.
#[derive(Debug)]
pub enum AnyRingColumn {
    Byte(ByteRingColumn),
    Char(CharRingColumn),
    Short(ShortRingColumn),
    Int(IntRingColumn),
    Long(LongRingColumn),
    Float(FloatRingColumn),
    Double(DoubleRingColumn),
    Boolean(BooleanRingColumn),
    Instant(InstantRingColumn),
    Object(StringRingColumn),
}

/// Runs `$body` with `$col` bound to the column's typed storage. Instant
/// columns expose their nanosecond ring.
macro_rules! with_column {
    ($column:expr, $col:ident => $body:expr) => {
        match $column {
            AnyRingColumn::Byte($col) => $body,
            AnyRingColumn::Char($col) => $body,
            AnyRingColumn::Short($col) => $body,
            AnyRingColumn::Int($col) => $body,
            AnyRingColumn::Long($col) => $body,
            AnyRingColumn::Float($col) => $body,
            AnyRingColumn::Double($col) => $body,
            AnyRingColumn::Boolean($col) => $body,
            AnyRingColumn::Object($col) => $body,
            AnyRingColumn::Instant(instant) => {
                let $col = instant.nanos();
                $body
            }
        }
    };
}

impl AnyRingColumn {
    pub fn of(kind: RingKind, capacity: usize) -> Result<AnyRingColumn> {
        AnyRingColumn::with_config(kind, capacity, &CONFIG)
    }

    pub fn with_config(kind: RingKind, capacity: usize, config: &RingConfig) -> Result<AnyRingColumn> {
        Ok(match kind {
            RingKind::Byte => AnyRingColumn::Byte(DualGenerationRingColumn::with_config(capacity, config)?),
            RingKind::Char => AnyRingColumn::Char(DualGenerationRingColumn::with_config(capacity, config)?),
            RingKind::Short => AnyRingColumn::Short(DualGenerationRingColumn::with_config(capacity, config)?),
            RingKind::Int => AnyRingColumn::Int(DualGenerationRingColumn::with_config(capacity, config)?),
            RingKind::Long => AnyRingColumn::Long(DualGenerationRingColumn::with_config(capacity, config)?),
            RingKind::Float => AnyRingColumn::Float(DualGenerationRingColumn::with_config(capacity, config)?),
            RingKind::Double => AnyRingColumn::Double(DualGenerationRingColumn::with_config(capacity, config)?),
            RingKind::Boolean => {
                AnyRingColumn::Boolean(DualGenerationRingColumn::with_config(capacity, config)?)
            }
            RingKind::Instant => AnyRingColumn::Instant(InstantRingColumn::with_config(capacity, config)?),
            RingKind::Object => AnyRingColumn::Object(DualGenerationRingColumn::with_config(capacity, config)?),
        })
    }

    pub fn kind(&self) -> RingKind {
        match self {
            AnyRingColumn::Byte(_) => RingKind::Byte,
            AnyRingColumn::Char(_) => RingKind::Char,
            AnyRingColumn::Short(_) => RingKind::Short,
            AnyRingColumn::Int(_) => RingKind::Int,
            AnyRingColumn::Long(_) => RingKind::Long,
            AnyRingColumn::Float(_) => RingKind::Float,
            AnyRingColumn::Double(_) => RingKind::Double,
            AnyRingColumn::Boolean(_) => RingKind::Boolean,
            AnyRingColumn::Instant(_) => RingKind::Instant,
            AnyRingColumn::Object(_) => RingKind::Object,
        }
    }

    pub fn capacity(&self) -> usize {
        with_column!(self, col => col.capacity())
    }

    pub fn generation(&self) -> u64 {
        with_column!(self, col => col.generation())
    }

    pub fn indices(&self, generation: Generation) -> Option<KeyRange> {
        with_column!(self, col => col.ring(generation).indices())
    }

    pub fn pending_update(&self) -> TableUpdate {
        with_column!(self, col => col.pending_update())
    }

    pub fn advance_generation(&mut self) {
        match self {
            AnyRingColumn::Byte(col) => col.advance_generation(),
            AnyRingColumn::Char(col) => col.advance_generation(),
            AnyRingColumn::Short(col) => col.advance_generation(),
            AnyRingColumn::Int(col) => col.advance_generation(),
            AnyRingColumn::Long(col) => col.advance_generation(),
            AnyRingColumn::Float(col) => col.advance_generation(),
            AnyRingColumn::Double(col) => col.advance_generation(),
            AnyRingColumn::Boolean(col) => col.advance_generation(),
            AnyRingColumn::Instant(col) => col.advance_generation(),
            AnyRingColumn::Object(col) => col.advance_generation(),
        }
    }

    /// Values must already be kind-checked. Instants are converted as a
    /// whole batch, so a bad one fails before anything is written.
    fn append_checked(&mut self, values: &ColumnValues) -> Result<()> {
        match (self, values) {
            (AnyRingColumn::Byte(col), ColumnValues::Byte(v)) => col.append_slice(v),
            (AnyRingColumn::Char(col), ColumnValues::Char(v)) => col.append_slice(v),
            (AnyRingColumn::Short(col), ColumnValues::Short(v)) => col.append_slice(v),
            (AnyRingColumn::Int(col), ColumnValues::Int(v)) => col.append_slice(v),
            (AnyRingColumn::Long(col), ColumnValues::Long(v)) => col.append_slice(v),
            (AnyRingColumn::Float(col), ColumnValues::Float(v)) => col.append_slice(v),
            (AnyRingColumn::Double(col), ColumnValues::Double(v)) => col.append_slice(v),
            (AnyRingColumn::Boolean(col), ColumnValues::Boolean(v)) => col.append_slice(v),
            (AnyRingColumn::Object(col), ColumnValues::Object(v)) => col.append_slice(v),
            (AnyRingColumn::Instant(col), ColumnValues::Instant(v)) => return col.append_slice(v),
            (col, values) => unreachable!("{:?} column given {:?} values", col.kind(), values.kind()),
        }
        Ok(())
    }

    /// Appends keys `[first, last]` of one generation of another column.
    fn append_from_column(
        &mut self,
        src: &AnyRingColumn,
        generation: Generation,
        first: i64,
        last: i64,
    ) -> Result<()> {
        let g = generation;
        match (self, src) {
            (AnyRingColumn::Byte(dst), AnyRingColumn::Byte(src)) => dst.append_from(src.ring(g), first, last),
            (AnyRingColumn::Char(dst), AnyRingColumn::Char(src)) => dst.append_from(src.ring(g), first, last),
            (AnyRingColumn::Short(dst), AnyRingColumn::Short(src)) => dst.append_from(src.ring(g), first, last),
            (AnyRingColumn::Int(dst), AnyRingColumn::Int(src)) => dst.append_from(src.ring(g), first, last),
            (AnyRingColumn::Long(dst), AnyRingColumn::Long(src)) => dst.append_from(src.ring(g), first, last),
            (AnyRingColumn::Float(dst), AnyRingColumn::Float(src)) => dst.append_from(src.ring(g), first, last),
            (AnyRingColumn::Double(dst), AnyRingColumn::Double(src)) => dst.append_from(src.ring(g), first, last),
            (AnyRingColumn::Boolean(dst), AnyRingColumn::Boolean(src)) => {
                dst.append_from(src.ring(g), first, last)
            }
            (AnyRingColumn::Object(dst), AnyRingColumn::Object(src)) => dst.append_from(src.ring(g), first, last),
            (AnyRingColumn::Instant(dst), AnyRingColumn::Instant(src)) => {
                dst.append_nanos_from(src.nanos().ring(g), first, last)
            }
            (dst, src) => unreachable!("{:?} column fed from {:?}", dst.kind(), src.kind()),
        }
    }
}

/// One column's worth of appended values.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Byte(Vec<i8>),
    Char(Vec<u16>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Boolean(Vec<Option<bool>>),
    Instant(Vec<Option<DateTime<Utc>>>),
    Object(Vec<Option<Arc<str>>>),
}

impl ColumnValues {
    pub fn kind(&self) -> RingKind {
        match self {
            ColumnValues::Byte(_) => RingKind::Byte,
            ColumnValues::Char(_) => RingKind::Char,
            ColumnValues::Short(_) => RingKind::Short,
            ColumnValues::Int(_) => RingKind::Int,
            ColumnValues::Long(_) => RingKind::Long,
            ColumnValues::Float(_) => RingKind::Float,
            ColumnValues::Double(_) => RingKind::Double,
            ColumnValues::Boolean(_) => RingKind::Boolean,
            ColumnValues::Instant(_) => RingKind::Instant,
            ColumnValues::Object(_) => RingKind::Object,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Byte(v) => v.len(),
            ColumnValues::Char(v) => v.len(),
            ColumnValues::Short(v) => v.len(),
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Long(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Double(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
            ColumnValues::Instant(v) => v.len(),
            ColumnValues::Object(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which generation of a source table a new table starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    Empty,
    FromPrevious,
    FromCurrent,
}

/// Named ring columns of equal capacity sharing one window.
///
/// Every column is appended to in the same call, so all current windows are
/// identical, and `end_cycle` advances all of them at the same barrier.
#[derive(Debug)]
pub struct RingTable {
    capacity: usize,
    names: Vec<String>,
    columns: Vec<AnyRingColumn>,
    config: RingConfig,
}

impl RingTable {
    pub fn new(schema: &[(&str, RingKind)], capacity: usize) -> Result<RingTable> {
        RingTable::with_config(schema, capacity, &CONFIG)
    }

    pub fn with_config(schema: &[(&str, RingKind)], capacity: usize, config: &RingConfig) -> Result<RingTable> {
        if schema.is_empty() {
            return Err(RingError::EmptySchema);
        }
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(schema.len());
        let mut columns = Vec::with_capacity(schema.len());
        for (name, kind) in schema {
            if !seen.insert(*name) {
                return Err(RingError::DuplicateColumn(name.to_string()));
            }
            names.push(name.to_string());
            columns.push(AnyRingColumn::with_config(*kind, capacity, config)?);
        }
        Ok(RingTable {
            capacity,
            names,
            columns,
            config: config.clone(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn schema(&self) -> impl Iterator<Item = (&str, RingKind)> + '_ {
        self.names
            .iter()
            .zip(&self.columns)
            .map(|(name, column)| (name.as_str(), column.kind()))
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &AnyRingColumn)> + '_ {
        self.names.iter().map(String::as_str).zip(&self.columns)
    }

    pub fn column(&self, name: &str) -> Result<&AnyRingColumn> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|ix| &self.columns[ix])
            .ok_or_else(|| RingError::UnknownColumn(name.to_string()))
    }

    pub fn generation(&self) -> u64 {
        self.columns[0].generation()
    }

    pub fn row_set(&self) -> Option<KeyRange> {
        self.columns[0].indices(Generation::Current)
    }

    pub fn prev_row_set(&self) -> Option<KeyRange> {
        self.columns[0].indices(Generation::Previous)
    }

    /// Change a reader of the previous generation will see at the next
    /// `end_cycle`.
    pub fn pending_update(&self) -> TableUpdate {
        self.columns[0].pending_update()
    }

    /// A table with `source`'s schema and config, seeded from one of its
    /// generations. A seeded table starts with both generations equal.
    pub fn seeded_from(source: &RingTable, capacity: usize, seed: Seed) -> Result<RingTable> {
        let schema: Vec<(&str, RingKind)> = source.schema().collect();
        let mut table = RingTable::with_config(&schema, capacity, source.config())?;
        let generation = match seed {
            Seed::Empty => return Ok(table),
            Seed::FromCurrent => Generation::Current,
            Seed::FromPrevious => Generation::Previous,
        };
        let window = match generation {
            Generation::Current => source.row_set(),
            Generation::Previous => source.prev_row_set(),
        };
        if let Some(window) = window {
            table.append_from_generation(source, generation, window.first, window.last)?;
        }
        table.end_cycle();
        Ok(table)
    }

    /// Appends one batch to every column's current generation and returns
    /// the update relative to the previous generation. Nothing is written
    /// unless the whole batch is valid.
    pub fn append(&mut self, batch: &[ColumnValues]) -> Result<TableUpdate> {
        let rows = self.check_batch(batch)?;
        if rows > 0 {
            for (column, values) in self.columns.iter_mut().zip(batch) {
                column.append_checked(values)?;
            }
        }
        Ok(self.pending_update())
    }

    /// Appends keys `[first, last]` of `source`'s current generation, column
    /// by column. Schemas must match.
    pub fn append_from(&mut self, source: &RingTable, first: i64, last: i64) -> Result<TableUpdate> {
        self.append_from_generation(source, Generation::Current, first, last)
    }

    pub fn append_from_generation(
        &mut self,
        source: &RingTable,
        generation: Generation,
        first: i64,
        last: i64,
    ) -> Result<TableUpdate> {
        if source.num_columns() != self.num_columns() {
            return Err(RingError::ColumnCountMismatch {
                expected: self.num_columns(),
                actual: source.num_columns(),
            });
        }
        for ((name, dst), src) in self.names.iter().zip(&self.columns).zip(&source.columns) {
            if dst.kind() != src.kind() {
                return Err(RingError::ColumnKindMismatch {
                    column: name.clone(),
                    expected: dst.kind(),
                    actual: src.kind(),
                });
            }
        }
        // the first column checks the range, so a failure writes nothing
        for (dst, src) in self.columns.iter_mut().zip(&source.columns) {
            dst.append_from_column(src, generation, first, last)?;
        }
        Ok(self.pending_update())
    }

    /// The cycle barrier: snapshots every column into its previous generation.
    pub fn end_cycle(&mut self) -> TableUpdate {
        let update = self.pending_update();
        for column in &mut self.columns {
            column.advance_generation();
        }
        debug!(
            "ring table cycle {} closed: added {:?}, removed {:?}",
            self.generation(),
            update.added,
            update.removed
        );
        update
    }

    fn check_batch(&self, batch: &[ColumnValues]) -> Result<usize> {
        if batch.len() != self.columns.len() {
            return Err(RingError::ColumnCountMismatch {
                expected: self.columns.len(),
                actual: batch.len(),
            });
        }
        let rows = batch[0].len();
        for ((name, column), values) in self.names.iter().zip(&self.columns).zip(batch) {
            if column.kind() != values.kind() {
                return Err(RingError::ColumnKindMismatch {
                    column: name.clone(),
                    expected: column.kind(),
                    actual: values.kind(),
                });
            }
            if values.len() != rows {
                return Err(RingError::RowCountMismatch {
                    column: name.clone(),
                    expected: rows,
                    actual: values.len(),
                });
            }
            if let ColumnValues::Instant(instants) = values {
                for instant in instants {
                    instant_to_nanos(*instant)?;
                }
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_rows_are_never_dropped() {
        let mut column = AnyRingColumn::of(RingKind::Instant, 4).unwrap();
        let far = DateTime::from_timestamp(i64::MAX / 1_000_000_000 + 1, 0).unwrap();
        let bad = ColumnValues::Instant(vec![None, Some(far), None]);
        assert_eq!(column.append_checked(&bad), Err(RingError::InstantOutOfRange));
        assert_eq!(column.indices(Generation::Current), None, "a failed batch writes nothing");

        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        let good = ColumnValues::Instant(vec![None, Some(epoch), None]);
        column.append_checked(&good).unwrap();
        assert_eq!(column.indices(Generation::Current), KeyRange::new(0, 2));
    }
}
