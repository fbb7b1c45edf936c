#![allow(dead_code)]

//! Shared helpers for the integration tests: FIT fixtures built in memory
//! and an in-memory warehouse.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use fitflow::{LoadedRow, TableRef, Warehouse, WarehouseError};

// ---

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z).
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

/// FIT timestamp of the first fixture sample: 2023-04-04T12:33:06Z.
pub const FIXTURE_START: u32 = (1_680_611_586 - FIT_EPOCH_OFFSET) as u32;

const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800, 0xB401,
    0x5000, 0x9C01, 0x8801, 0x4400,
];

fn crc16(bytes: &[u8]) -> u16 {
    // ---
    let mut crc = 0u16;
    for &byte in bytes {
        let mut tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ CRC_TABLE[(byte & 0xF) as usize];

        tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize];
    }
    crc
}

/// One 1 Hz trainer sample.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub heart_rate: u8,
    pub cadence: u8,
    pub power: u16,
    /// Speed in mm/s, the FIT record scale.
    pub speed_mm_s: u16,
    /// Native `enhanced_speed` in mm/s; finer than the 16-bit `speed`.
    pub enhanced_speed_mm_s: u32,
}

/// `n` plausible samples with slowly varying values.
pub fn ride(n: usize) -> Vec<Sample> {
    // ---
    (0..n)
        .map(|i| Sample {
            heart_rate: 120 + (i % 40) as u8,
            cadence: 85 + (i % 10) as u8,
            power: 180 + (i % 60) as u16,
            speed_mm_s: 8_000 + (i % 500) as u16,
            enhanced_speed_mm_s: 8_000 + (i % 500) as u32 + 1,
        })
        .collect()
}

fn definition(local: u8, global: u16, fields: &[(u8, u8, u8)]) -> Vec<u8> {
    // ---
    let mut out = vec![0x40 | local, 0, 0];
    out.extend_from_slice(&global.to_le_bytes());
    out.push(fields.len() as u8);
    for &(num, size, base) in fields {
        out.extend_from_slice(&[num, size, base]);
    }
    out
}

/// A complete FIT activity: a `file_id` message plus one `record` per sample.
///
/// Header and file CRCs are valid.
pub fn fit_bytes(samples: &[Sample]) -> Vec<u8> {
    // ---
    let mut data = Vec::new();

    // file_id: type (enum), manufacturer (uint16), time_created (uint32)
    data.extend(definition(0, 0, &[(0, 1, 0x00), (1, 2, 0x84), (4, 4, 0x86)]));
    data.push(0x00);
    data.push(4);
    data.extend_from_slice(&260u16.to_le_bytes());
    data.extend_from_slice(&FIXTURE_START.to_le_bytes());

    if !samples.is_empty() {
        // record: timestamp, heart_rate, cadence, speed, power, enhanced_speed
        data.extend(definition(
            1,
            20,
            &[
                (253, 4, 0x86),
                (3, 1, 0x02),
                (4, 1, 0x02),
                (6, 2, 0x84),
                (7, 2, 0x84),
                (73, 4, 0x86),
            ],
        ));
        for (i, s) in samples.iter().enumerate() {
            data.push(0x01);
            data.extend_from_slice(&(FIXTURE_START + i as u32).to_le_bytes());
            data.push(s.heart_rate);
            data.push(s.cadence);
            data.extend_from_slice(&s.speed_mm_s.to_le_bytes());
            data.extend_from_slice(&s.power.to_le_bytes());
            data.extend_from_slice(&s.enhanced_speed_mm_s.to_le_bytes());
        }
    }

    let mut out = vec![14, 0x20];
    out.extend_from_slice(&2132u16.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(b".FIT");
    let header_crc = crc16(&out);
    out.extend_from_slice(&header_crc.to_le_bytes());

    out.extend(data);
    let file_crc = crc16(&out);
    out.extend_from_slice(&file_crc.to_le_bytes());
    out
}

/// A FIT activity whose trailing file CRC does not match its content.
pub fn corrupted_fit_bytes(samples: &[Sample]) -> Vec<u8> {
    // ---
    let mut bytes = fit_bytes(samples);
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    bytes
}

/// Bytes that are not a FIT file at all.
pub fn junk_bytes() -> Vec<u8> {
    b"garbage bytes, not an activity".to_vec()
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) {
    std::fs::write(dir.join(name), bytes).expect("write fixture");
}

/// How [`MemoryWarehouse`] should misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    None,
    Discovery,
    Load,
}

/// Warehouse keeping tables in memory, keyed by `dataset.table`.
pub struct MemoryWarehouse {
    tables: Mutex<HashMap<String, Vec<LoadedRow>>>,
    failure: Failure,
}

impl MemoryWarehouse {
    // ---
    pub fn new() -> Self {
        Self::failing(Failure::None)
    }

    pub fn failing(failure: Failure) -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            failure,
        }
    }

    /// Pre-populate `target` with `rows` rows for `file_name`.
    pub fn seed(&self, target: &TableRef, file_name: &str, rows: usize) {
        // ---
        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(target.to_string()).or_default();
        for _ in 0..rows {
            table.push(LoadedRow {
                file_name: file_name.to_string(),
                timestamp: None,
                heart_rate: None,
                power: None,
                cadence: None,
                speed: None,
                enhanced_speed: None,
            });
        }
    }

    pub fn rows(&self, target: &TableRef) -> Vec<LoadedRow> {
        self.tables
            .lock()
            .unwrap()
            .get(&target.to_string())
            .cloned()
            .unwrap_or_default()
    }
}

impl Warehouse for MemoryWarehouse {
    // ---
    fn project(&self) -> &str {
        "test-project"
    }

    async fn loaded_files(&self, target: &TableRef) -> Result<HashSet<String>, WarehouseError> {
        // ---
        if self.failure == Failure::Discovery {
            return Err(WarehouseError::Database(sqlx::Error::PoolTimedOut));
        }
        let tables = self.tables.lock().unwrap();
        match tables.get(&target.to_string()) {
            Some(rows) => Ok(rows.iter().map(|r| r.file_name.clone()).collect()),
            None => Err(WarehouseError::TableNotFound(target.to_string())),
        }
    }

    async fn load_rows(
        &self,
        rows: &[LoadedRow],
        target: &TableRef,
    ) -> Result<(u64, String), WarehouseError> {
        // ---
        if self.failure == Failure::Load {
            return Err(WarehouseError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut tables = self.tables.lock().unwrap();
        tables
            .entry(target.to_string())
            .or_default()
            .extend_from_slice(rows);
        Ok((rows.len() as u64, self.table_id(target)))
    }
}
