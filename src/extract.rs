//! FIT record extraction.
//!
//! Decoding of the binary format is delegated to [`fitparser`]; this module
//! flattens every `record` message into a [`RecordTable`] row and projects
//! those rows onto the fixed warehouse layout.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use chrono::Utc;
use fitparser::de::{from_reader_with_options, DecodeOption};
use fitparser::profile::MesgNum;
use fitparser::Value;

use crate::error::ExtractError;
use crate::models::{Cell, LoadedRow, RecordTable, METRIC_COLUMNS};

// ---

/// Decode an activity file into one row per sensor record.
///
/// Every field of a `record` message becomes a column named after the
/// field. A file without any record messages yields [`RecordTable::empty`].
///
/// Composite fields are kept alongside their expansions: `speed` expands
/// into `enhanced_speed`, and both columns are loaded.
pub fn parse_activity_file(path: &Path) -> Result<RecordTable, ExtractError> {
    // ---
    let mut file = File::open(path)?;
    let options = HashSet::from([DecodeOption::KeepCompositeFields]);
    let messages = from_reader_with_options(&mut file, &options)
        .map_err(|e| ExtractError::Decode(e.to_string()))?;

    let mut table = RecordTable::empty();
    for message in messages
        .iter()
        .filter(|m| matches!(m.kind(), MesgNum::Record))
    {
        table.push_record(
            message
                .fields()
                .iter()
                .map(|field| (field.name(), to_cell(field.value()))),
        );
    }

    tracing::debug!(
        "Decoded {} record(s) with {} column(s) from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Select the metric columns and tag every row with `file_name`.
///
/// Fails with [`ExtractError::MissingColumn`] if the source table lacks any
/// of [`METRIC_COLUMNS`]. Source column order is irrelevant.
pub fn project_columns(table: &RecordTable, file_name: &str) -> Result<Vec<LoadedRow>, ExtractError> {
    // ---
    let mut idx = [0usize; METRIC_COLUMNS.len()];
    for (slot, name) in idx.iter_mut().zip(METRIC_COLUMNS) {
        *slot = table
            .column_index(name)
            .ok_or_else(|| ExtractError::MissingColumn(name.to_string()))?;
    }
    let [ts, hr, pw, cad, spd, espd] = idx;

    let rows = table
        .rows()
        .iter()
        .map(|row| LoadedRow {
            file_name: file_name.to_string(),
            timestamp: row[ts].as_timestamp(),
            heart_rate: row[hr].as_i64().and_then(|v| i32::try_from(v).ok()),
            power: row[pw].as_i64().and_then(|v| i32::try_from(v).ok()),
            cadence: row[cad].as_i64().and_then(|v| i32::try_from(v).ok()),
            speed: row[spd].as_f64(),
            enhanced_speed: row[espd].as_f64(),
        })
        .collect();

    Ok(rows)
}

/// Map a decoded FIT value onto a table cell.
fn to_cell(value: &Value) -> Cell {
    // ---
    match value {
        Value::Timestamp(ts) => Cell::Timestamp(ts.with_timezone(&Utc)),
        Value::Byte(v) | Value::Enum(v) | Value::UInt8(v) | Value::UInt8z(v) => {
            Cell::Int(i64::from(*v))
        }
        Value::SInt8(v) => Cell::Int(i64::from(*v)),
        Value::SInt16(v) => Cell::Int(i64::from(*v)),
        Value::UInt16(v) | Value::UInt16z(v) => Cell::Int(i64::from(*v)),
        Value::SInt32(v) => Cell::Int(i64::from(*v)),
        Value::UInt32(v) | Value::UInt32z(v) => Cell::Int(i64::from(*v)),
        Value::SInt64(v) => Cell::Int(*v),
        Value::UInt64(v) | Value::UInt64z(v) => {
            i64::try_from(*v).map(Cell::Int).unwrap_or(Cell::Null)
        }
        Value::Float32(v) => Cell::Float(f64::from(*v)),
        Value::Float64(v) => Cell::Float(*v),
        Value::String(s) => Cell::Text(s.clone()),
        // Arrays (e.g. left/right balance pairs) are not projected.
        _ => Cell::Null,
    }
}
