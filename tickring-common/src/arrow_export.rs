// arrow_export.rs – ring windows as Arrow arrays, record batches and IPC files

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, Int8Array,
    StringArray, TimestampNanosecondArray, UInt16Array,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;

use crate::column::Generation;
use crate::common_config::RingConfig;
use crate::kind::{RingElement, RingKind};
use crate::table::{AnyRingColumn, RingTable};

pub fn arrow_data_type(kind: RingKind) -> DataType {
    match kind {
        RingKind::Byte => DataType::Int8,
        RingKind::Char => DataType::UInt16,
        RingKind::Short => DataType::Int16,
        RingKind::Int => DataType::Int32,
        RingKind::Long => DataType::Int64,
        RingKind::Float => DataType::Float32,
        RingKind::Double => DataType::Float64,
        RingKind::Boolean => DataType::Boolean,
        RingKind::Instant => DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into())),
        RingKind::Object => DataType::Utf8,
    }
}

/// Sentinels become nulls.
fn nullable<T: RingElement + Copy>(values: Vec<T>) -> Vec<Option<T>> {
    values
        .into_iter()
        .map(|v| if v.is_null() { None } else { Some(v) })
        .collect()
}

/// The window of one generation, oldest key first.
pub fn column_to_arrow(column: &AnyRingColumn, generation: Generation) -> Result<ArrayRef> {
    let array: ArrayRef = match column {
        AnyRingColumn::Byte(col) => Arc::new(Int8Array::from(nullable(col.window_values(generation)?))),
        AnyRingColumn::Char(col) => Arc::new(UInt16Array::from(nullable(col.window_values(generation)?))),
        AnyRingColumn::Short(col) => Arc::new(Int16Array::from(nullable(col.window_values(generation)?))),
        AnyRingColumn::Int(col) => Arc::new(Int32Array::from(nullable(col.window_values(generation)?))),
        AnyRingColumn::Long(col) => Arc::new(Int64Array::from(nullable(col.window_values(generation)?))),
        AnyRingColumn::Float(col) => Arc::new(Float32Array::from(nullable(col.window_values(generation)?))),
        AnyRingColumn::Double(col) => Arc::new(Float64Array::from(nullable(col.window_values(generation)?))),
        AnyRingColumn::Boolean(col) => Arc::new(BooleanArray::from(col.window_values(generation)?)),
        AnyRingColumn::Instant(col) => {
            let nanos = nullable(col.nanos().window_values(generation)?);
            Arc::new(TimestampNanosecondArray::from(nanos).with_timezone("UTC"))
        }
        AnyRingColumn::Object(col) => {
            let values = col.window_values(generation)?;
            Arc::new(StringArray::from_iter(values.iter().map(|v| v.as_deref())))
        }
    };
    Ok(array)
}

pub fn attach_metadata(table: &RingTable, generation: Generation) -> HashMap<String, String> {
    let mut metadata = table.config().to_metadata();
    metadata.insert("capacity".into(), table.capacity().to_string());
    metadata.insert("generation".into(), table.generation().to_string());
    let (label, window) = match generation {
        Generation::Current => ("current", table.row_set()),
        Generation::Previous => ("previous", table.prev_row_set()),
    };
    metadata.insert("ring_generation".into(), label.into());
    if let Some(window) = window {
        metadata.insert("first_key".into(), window.first.to_string());
        metadata.insert("last_key".into(), window.last.to_string());
    }
    metadata
}

pub fn extract_config_from_arrow_metadata(metadata: &HashMap<String, String>) -> Result<RingConfig> {
    RingConfig::from_metadata(metadata)
}

impl RingTable {
    /// One generation of every column as a record batch; the schema metadata
    /// carries the config and the window.
    pub fn to_record_batch(&self, generation: Generation) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.num_columns());
        let mut arrays = Vec::with_capacity(self.num_columns());
        for (name, column) in self.columns() {
            fields.push(Field::new(name, arrow_data_type(column.kind()), true));
            arrays.push(
                column_to_arrow(column, generation)
                    .with_context(|| format!("Failed to export column '{}'", name))?,
            );
        }
        let schema = Schema::new(fields).with_metadata(attach_metadata(self, generation));
        RecordBatch::try_new(Arc::new(schema), arrays).context("Failed to build record batch")
    }
}

/// Writes one generation of `table` as an Arrow IPC file; returns the row count.
pub fn write_ipc_snapshot(table: &RingTable, generation: Generation, path: &Path) -> Result<usize> {
    let batch = table.to_record_batch(generation)?;
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = FileWriter::try_new(BufWriter::new(file), &batch.schema())?;
    writer.write(&batch)?;
    writer.finish()?;
    log::debug!("wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(batch.num_rows())
}

pub fn read_ipc_snapshot(path: &Path) -> Result<(RingConfig, Vec<RecordBatch>)> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = FileReader::try_new(file, None)?;
    let config = extract_config_from_arrow_metadata(reader.schema().metadata())?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((config, batches))
}
