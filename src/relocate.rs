//! Moves finished activity files from the device-sync folder into storage.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

use crate::discovery::IN_PROGRESS_FILE_NAME;

// ---

/// Outcome of a relocation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RelocationReport {
    pub moved: Vec<String>,
}

/// Move every regular file in `source` into `destination`.
///
/// `destination` is created if needed. The in-progress recording is left
/// where it is. A file already present in `destination` is replaced.
pub fn relocate(source: &Path, destination: &Path) -> Result<RelocationReport> {
    // ---
    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;

    let mut pending = Vec::new();
    for entry in fs::read_dir(source)
        .with_context(|| format!("Failed to read source folder {}", source.display()))?
    {
        let entry = entry?;
        if entry.file_name() == IN_PROGRESS_FILE_NAME || !entry.file_type()?.is_file() {
            continue;
        }
        pending.push(entry.file_name());
    }
    pending.sort();

    if pending.is_empty() {
        tracing::info!("No files to process.");
        return Ok(RelocationReport::default());
    }

    tracing::info!("Found {} files to process.", pending.len());

    let mut report = RelocationReport::default();
    for file_name in pending {
        // Non-UTF-8 names are moved as-is; only the report is lossy
        let name = file_name.to_string_lossy().into_owned();
        move_file(&source.join(&file_name), &destination.join(&file_name))
            .with_context(|| format!("Failed to move {}", name))?;
        tracing::info!("Moved: {}", name);
        report.moved.push(name);
    }

    tracing::info!("All {} activity files moved successfully.", report.moved.len());
    Ok(report)
}

/// Rename, or copy and remove when the two paths live on different devices.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    // ---
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(
                "rename {} failed ({}), falling back to copy",
                from.display(),
                rename_err
            );
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
