//! Circular columnar storage for real-time tables.
//!
//! A [`RingStore`] keeps the last N values of a column. A
//! [`DualGenerationRingColumn`] pairs a live ring with a snapshot taken at the
//! last cycle barrier, and [`WraparoundChunkAccessor`] serves bulk reads from
//! either one, zero-copy whenever the range does not wrap.

pub mod arrow_export;
pub mod chunk;
pub mod chunk_accessor;
pub mod column;
pub mod common_config;
pub mod error;
pub mod instant;
pub mod kind;
pub mod ring_store;
pub mod row_sequence;
pub mod table;

pub use arrow_export::{extract_config_from_arrow_metadata, read_ipc_snapshot, write_ipc_snapshot};
pub use chunk::{Chunk, GetContext, WritableChunk};
pub use chunk_accessor::{FillStrategy, WraparoundChunkAccessor, USE_RANGES_AVERAGE_RUN_LENGTH};
pub use column::{CycleWriter, DualGenerationRingColumn, Generation, TableUpdate};
pub use common_config::{RingConfig, CONFIG};
pub use error::{Result, RingError};
pub use instant::InstantRingColumn;
pub use kind::{
    RingElement, RingKind, NULL_BYTE, NULL_CHAR, NULL_DOUBLE, NULL_FLOAT, NULL_INT, NULL_LONG, NULL_SHORT,
};
pub use ring_store::{FillSource, RingStore};
pub use row_sequence::{KeyRange, RowSequence, RowSet, RowSetBuilder};
pub use table::{
    AnyRingColumn, BooleanRingColumn, ByteRingColumn, CharRingColumn, ColumnValues, DoubleRingColumn,
    FloatRingColumn, IntRingColumn, LongRingColumn, ObjectRingColumn, RingTable, Seed, ShortRingColumn,
    StringRingColumn,
};
