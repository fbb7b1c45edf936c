//! Extract and load step: turns new activity files into warehouse rows.
//!
//! Each run lists the storage folder, asks the warehouse which file names it
//! already holds, and processes the difference one file at a time. A file's
//! fate is decided independently of the others:
//!
//! - records found: projected and appended to the warehouse
//! - no records: disposed of (deleted, or moved to quarantine)
//! - checksum mismatch: disposed of as corrupted
//! - any other extraction failure: left in place for the next run
//!
//! A warehouse failure other than "table not found" during discovery, or
//! any warehouse failure during a load, aborts the run. Rows already loaded
//! stay loaded; re-running picks up exactly the files still missing.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::discovery::{compute_new_files, list_local_files};
use crate::error::WarehouseError;
use crate::extract::{parse_activity_file, project_columns};
use crate::relocate::move_file;
use crate::warehouse::{TableRef, Warehouse};

// ---

/// What happens to empty and corrupted activity files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Disposal {
    /// Remove the file.
    #[default]
    Delete,
    /// Move the file into the given folder.
    Quarantine(PathBuf),
}

impl Disposal {
    // ---
    pub fn from_quarantine_dir(dir: Option<PathBuf>) -> Self {
        dir.map(Disposal::Quarantine).unwrap_or_default()
    }

    fn apply(&self, path: &Path, file_name: &str) -> io::Result<()> {
        // ---
        match self {
            Disposal::Delete => fs::remove_file(path),
            Disposal::Quarantine(dir) => {
                fs::create_dir_all(dir)?;
                move_file(path, &dir.join(file_name))
            }
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Disposal::Delete => "Deleting",
            Disposal::Quarantine(_) => "Quarantining",
        }
    }
}

/// How a single candidate file was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Rows appended to the warehouse.
    Loaded { rows: u64, table_id: String },
    /// No sensor records; file disposed of.
    RemovedEmpty,
    /// Checksum mismatch; file disposed of.
    RemovedCorrupted,
    /// Left in place to be retried by the next run.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file_name: String,
    pub outcome: FileOutcome,
}

/// Result of one extract-and-load run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    // ---
    /// Activity files found in the storage folder.
    pub local_files: usize,
    /// Distinct file names already present in the warehouse.
    pub loaded_files: usize,
    /// Per-file outcomes, in processing order.
    pub files: Vec<FileReport>,
    /// Rows accepted by the warehouse across all files.
    pub total_rows: u64,
}

impl RunReport {
    // ---
    pub fn candidates(&self) -> usize {
        self.files.len()
    }

    pub fn files_loaded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Loaded { .. }))
    }

    pub fn files_removed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::RemovedEmpty | FileOutcome::RemovedCorrupted))
    }

    pub fn files_failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded {} rows from {} file(s).",
            self.total_rows,
            self.files_loaded()
        )
    }
}

/// Load every activity file in `data_dir` not yet present in `target`.
pub async fn run<W: Warehouse>(
    warehouse: &W,
    data_dir: &Path,
    target: &TableRef,
    disposal: &Disposal,
) -> Result<RunReport> {
    // ---
    let local = list_local_files(data_dir)
        .with_context(|| format!("Failed to list activity files in {}", data_dir.display()))?;
    tracing::info!("Found {} FIT files in {}", local.len(), data_dir.display());

    let loaded = match warehouse.loaded_files(target).await {
        Ok(names) => {
            tracing::info!("Found {} FIT files in {}", names.len(), warehouse.table_id(target));
            names
        }
        Err(WarehouseError::TableNotFound(table)) => {
            tracing::warn!("Could not query existing files, table {} does not exist yet", table);
            HashSet::new()
        }
        Err(e) => return Err(e).context("Failed to query already loaded files"),
    };

    let mut new_files: Vec<String> = compute_new_files(&local, &loaded).into_iter().collect();
    new_files.sort();
    tracing::info!("Found {} new file(s) to load", new_files.len());

    let mut report = RunReport {
        local_files: local.len(),
        loaded_files: loaded.len(),
        ..RunReport::default()
    };

    for file_name in new_files {
        let path = data_dir.join(&file_name);
        let outcome = process_file(warehouse, &path, &file_name, target, disposal)
            .await
            .with_context(|| format!("Failed to load {} into {}", file_name, target))?;

        if let FileOutcome::Loaded { rows, .. } = &outcome {
            report.total_rows += rows;
        }
        report.files.push(FileReport { file_name, outcome });
    }

    tracing::info!(
        "{} ({} removed, {} failed)",
        report,
        report.files_removed(),
        report.files_failed()
    );
    Ok(report)
}

/// Apply the per-file policy to one candidate.
///
/// Only warehouse errors escape; everything else becomes a [`FileOutcome`].
async fn process_file<W: Warehouse>(
    warehouse: &W,
    path: &Path,
    file_name: &str,
    target: &TableRef,
    disposal: &Disposal,
) -> Result<FileOutcome, WarehouseError> {
    // ---
    let table = match parse_activity_file(path) {
        Ok(table) => table,
        Err(e) if e.is_corrupted() => {
            tracing::warn!("{} corrupted file: {} ({})", disposal.verb(), file_name, e);
            return Ok(dispose(disposal, path, file_name, FileOutcome::RemovedCorrupted));
        }
        Err(e) => {
            tracing::error!("Error processing {}: {}", file_name, e);
            return Ok(FileOutcome::Failed(e.to_string()));
        }
    };

    if table.is_empty() {
        tracing::info!("{} empty file: {}.", disposal.verb(), file_name);
        return Ok(dispose(disposal, path, file_name, FileOutcome::RemovedEmpty));
    }

    let rows = match project_columns(&table, file_name) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Error processing {}: {}", file_name, e);
            return Ok(FileOutcome::Failed(e.to_string()));
        }
    };

    let (loaded, table_id) = warehouse.load_rows(&rows, target).await?;
    tracing::info!(
        "   Processed '{}' successfully ({} rows) into {}.",
        file_name,
        loaded,
        table_id
    );

    Ok(FileOutcome::Loaded {
        rows: loaded,
        table_id,
    })
}

/// Dispose of `path`; a failure leaves the file for the next run.
fn dispose(disposal: &Disposal, path: &Path, file_name: &str, outcome: FileOutcome) -> FileOutcome {
    // ---
    match disposal.apply(path, file_name) {
        Ok(()) => outcome,
        Err(e) => {
            tracing::error!("Error removing {}: {}", file_name, e);
            FileOutcome::Failed(format!("failed to remove: {}", e))
        }
    }
}
