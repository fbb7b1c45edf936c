//! Discovery of activity files that still need loading.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

// ---

/// Extension carried by activity files, without the dot.
pub const ACTIVITY_EXTENSION: &str = "fit";

/// File the device is still recording into; never moved or extracted.
pub const IN_PROGRESS_FILE_NAME: &str = "inProgressActivity.fit";

/// Base names of every activity file directly inside `folder`.
///
/// No recursion; directories are skipped even if their name matches, and
/// so is [`IN_PROGRESS_FILE_NAME`].
pub fn list_local_files(folder: &Path) -> io::Result<HashSet<String>> {
    // ---
    let mut names = HashSet::new();

    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_activity = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ACTIVITY_EXTENSION));
        if !is_activity {
            continue;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(IN_PROGRESS_FILE_NAME) | None => continue,
            Some(name) => {
                names.insert(name.to_string());
            }
        }
    }

    Ok(names)
}

/// Files present locally but not yet reflected in the warehouse.
pub fn compute_new_files(local: &HashSet<String>, loaded: &HashSet<String>) -> HashSet<String> {
    local.difference(loaded).cloned().collect()
}
