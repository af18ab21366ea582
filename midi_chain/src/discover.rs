// Input file discovery.
//
// Walks a directory tree for `.mid`/`.midi` files (any letter case). Hidden
// directories below the root (name starting with `.`) are not entered; the
// root itself is searched even when its own name is hidden. The generator's
// own output file is left out so that a second run does not train on the
// first run's result. The list comes back sorted, which
// makes `limit_inputs` pick the same files every time.

use crate::error::{ChainError, Result};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

/// True for paths ending in `.mid` or `.midi`, ignoring case.
pub fn has_midi_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// All MIDI files under `root`, sorted, minus anything in `exclude`.
pub fn find_midi_files(root: &Path, exclude: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ChainError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !is_hidden_dir(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping unreadable path: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_midi_extension(entry.path()))
        .map(DirEntry::into_path)
        .filter(|path| !exclude.iter().any(|x| same_file(path, x)))
        .collect();

    files.sort();
    files.dedup();
    Ok(files)
}

/// Keep the first `max` files, warning when some are dropped.
pub fn limit_inputs(mut files: Vec<PathBuf>, max: usize) -> Vec<PathBuf> {
    if files.len() > max {
        log::warn!(
            "too many files ({}), just examining the first {max}",
            files.len()
        );
        files.truncate(max);
    }
    files
}
