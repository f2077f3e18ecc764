//! Filesystem helpers for table file discovery.
//!
//! Provides [`collect_files`] to recursively search a directory of raw MySQL
//! table files for `.frm` or `.ibd` files. Used by the `frm-dump` subcommand.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::HdbError;

/// Recursively find regular files under `dir` whose extension is `extension`.
///
/// The extension may be given with or without the leading dot (`"frm"` and
/// `".frm"` are equivalent). Entries that cannot be read are skipped.
/// Results are sorted by path.
pub fn collect_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, HdbError> {
    if !dir.is_dir() {
        return Err(HdbError::Argument(format!(
            "Directory does not exist: {}",
            dir.display()
        )));
    }

    let extension = extension.trim_start_matches('.');
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_extension(path, extension))
        .collect();

    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}
