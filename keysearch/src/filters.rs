/// This module implements the file lister that feeds the search a file list.
///
/// The lister is deliberately simple: one directory, one extension. A missing
/// directory is not an error for the caller; it is logged and produces an empty
/// list, which the coordinator treats as a trivial run.
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Checks if a file has the wanted extension.
///
/// The comparison ignores case and a leading dot, so `"txt"`, `".txt"` and
/// `"TXT"` are equivalent. An empty extension accepts every file.
pub fn has_valid_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    if wanted.is_empty() {
        return true;
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

/// Lists the files in `dir` with the given extension, sorted by name
pub fn list_files(dir: &Path, extension: &str, recursive: bool) -> Vec<PathBuf> {
    if !dir.is_dir() {
        error!("Directory not found: {}", dir.display());
        return Vec::new();
    }

    let mut builder = WalkBuilder::new(dir);
    builder
        .standard_filters(false)
        .follow_links(true)
        .max_depth(if recursive { None } else { Some(1) })
        .sort_by_file_name(|a, b| a.cmp(b));

    let files: Vec<PathBuf> = builder
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error reading directory {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| has_valid_extension(entry.path(), extension))
        .map(|entry| entry.into_path())
        .collect();

    info!("Found {} files in directory {}", files.len(), dir.display());
    files
}
