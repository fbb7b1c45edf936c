//! Data models for the FIT record pipeline.
//!
//! A decoded activity file is held as a [`RecordTable`]: an ordered list of
//! column names plus one row of [`Cell`]s per `record` message. Projection
//! turns that loose table into [`LoadedRow`]s with the fixed warehouse layout.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

// ---

/// Column layout of the warehouse records table, in load order.
pub const LOADED_COLUMNS: [&str; 7] = [
    "file_name",
    "timestamp",
    "heart_rate",
    "power",
    "cadence",
    "speed",
    "enhanced_speed",
];

/// Sensor fields kept from each decoded record, in load order.
pub const METRIC_COLUMNS: [&str; 6] = [
    "timestamp",
    "heart_rate",
    "power",
    "cadence",
    "speed",
    "enhanced_speed",
];

/// One decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Cell {
    // ---
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Float(v) if v.is_finite() => Some(v.round() as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) if v.is_finite() => Some(*v),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Cell::Timestamp(ts) => Some(*ts),
            Cell::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            _ => None,
        }
    }
}

/// Tabular form of a decoded activity file.
///
/// Columns are the union of field names seen across all records, in
/// first-seen order. Every row has exactly one cell per column; fields a
/// record does not carry are [`Cell::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    // ---
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RecordTable {
    // ---
    /// The explicitly empty table: zero rows, zero columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a record given as `(field name, value)` pairs.
    ///
    /// Unknown names widen the table; earlier rows are back-filled with nulls.
    /// A name repeated within one record keeps its last non-null value. The
    /// decoder emits expanded components (e.g. `enhanced_speed` from 16-bit
    /// `speed`) before the native field, so the native value wins.
    pub fn push_record<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (S, Cell)>,
        S: AsRef<str>,
    {
        // ---
        let mut row = vec![Cell::Null; self.columns.len()];

        for (name, value) in fields {
            let name = name.as_ref();
            let idx = match self.column_index(name) {
                Some(idx) => idx,
                None => {
                    self.columns.push(name.to_string());
                    for existing in &mut self.rows {
                        existing.push(Cell::Null);
                    }
                    row.push(Cell::Null);
                    self.columns.len() - 1
                }
            };
            if !matches!(value, Cell::Null) {
                row[idx] = value;
            }
        }

        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A sensor record annotated with its source file, ready for the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRow {
    // ---
    pub file_name: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub heart_rate: Option<i32>,
    pub power: Option<i32>,
    pub cadence: Option<i32>,
    pub speed: Option<f64>,
    pub enhanced_speed: Option<f64>,
}

/// Per-session aggregate served by the dashboard API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SessionSummary {
    // ---
    pub file_name: String,
    pub session_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub distance_km: f64,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<i32>,
    pub avg_cadence: Option<f64>,
    pub max_cadence: Option<i32>,
    pub avg_power: Option<f64>,
    pub max_power: Option<i32>,
    pub avg_speed_kmh: Option<f64>,
    pub max_speed_kmh: Option<f64>,
    pub sample_count: i64,
}

/// Aggregate statistics across sessions.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GlobalStats {
    // ---
    pub total_sessions: i64,
    pub total_distance_km: Option<f64>,
    pub avg_distance_km: Option<f64>,
    pub avg_duration_seconds: Option<f64>,
    pub max_heart_rate: Option<i32>,
    pub avg_heart_rate: Option<f64>,
    pub max_cadence: Option<i32>,
    pub avg_cadence: Option<f64>,
    pub max_power: Option<i32>,
    pub avg_power: Option<f64>,
    pub max_speed_kmh: Option<f64>,
    pub avg_speed_kmh: Option<f64>,
}

/// One time-series sample of a session.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SessionSample {
    // ---
    pub timestamp: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub power: Option<i32>,
    pub cadence: Option<i32>,
    pub heart_rate: Option<i32>,
    pub speed_kmh: Option<f64>,
}

/// Share of a session's heart-rate samples falling into one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneShare {
    // ---
    pub zone: u8,
    pub zone_name: String,
    pub percentage: f64,
}
