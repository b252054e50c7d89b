//! Errors raised by ring stores, columns and tables.

use thiserror::Error;

use crate::kind::RingKind;
use crate::row_sequence::KeyRange;

pub type Result<T> = std::result::Result<T, RingError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RingError {
    #[error("ring capacity must be positive")]
    InvalidCapacity,

    #[error("slice [{offset}, {offset}+{len}) out of bounds for input of length {available}")]
    SliceOutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("invalid key range [{first}, {last}]")]
    InvalidRange { first: i64, last: i64 },

    #[error("key {key} is outside the ring window {window:?}")]
    KeyOutOfWindow { key: i64, window: Option<KeyRange> },

    #[error("destination holds {capacity} elements but {required} are required")]
    DestinationTooSmall { required: usize, capacity: usize },

    #[error("{kind:?} ring of capacity {capacity} needs {required} bytes, budget is {budget}")]
    CapacityExceedsBudget {
        kind: RingKind,
        capacity: usize,
        required: u64,
        budget: u64,
    },

    #[error("a ring table needs at least one column")]
    EmptySchema,

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("expected {expected} columns, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("column '{column}' is {expected:?}, got {actual:?} values")]
    ColumnKindMismatch {
        column: String,
        expected: RingKind,
        actual: RingKind,
    },

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("no column named '{0}'")]
    UnknownColumn(String),

    #[error("instant cannot be represented as nanoseconds since the epoch")]
    InstantOutOfRange,
}
