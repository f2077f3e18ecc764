//! Apache virtual host scanning.
//!
//! Each file in the vhost directory is memory-mapped and searched for its
//! first `DocumentRoot` directive; the directive's value is the site root
//! that may hold a WordPress installation.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::HdbError;

const DIRECTIVE: &str = "DocumentRoot";

/// Extract the value of the first active `DocumentRoot` directive.
///
/// The value is the first whitespace-separated token following the keyword
/// on its line, with surrounding quotes removed. Directives on lines that
/// start with `#` are ignored.
pub fn parse_document_root(content: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(content);

    text.lines().find_map(|line| {
        if line.trim_start().starts_with('#') {
            return None;
        }
        let offset = line.find(DIRECTIVE)?;
        let value = line[offset + DIRECTIVE.len()..].split_whitespace().next()?;
        let value = value.trim_matches('"').trim_matches('\'');
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

/// Read the document root of a single vhost file.
///
/// Empty files yield `Ok(None)`; they cannot be mapped.
pub fn read_document_root(path: &Path) -> Result<Option<String>, HdbError> {
    let file = File::open(path)
        .map_err(|e| HdbError::Io(format!("Cannot open {}: {}", path.display(), e)))?;
    let len = file
        .metadata()
        .map_err(|e| HdbError::Io(format!("Cannot stat {}: {}", path.display(), e)))?
        .len();
    if len == 0 {
        return Ok(None);
    }

    // SAFETY: the mapping is read-only and dropped before returning. A vhost
    // file truncated concurrently could fault; this tool runs on idle configs.
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| HdbError::Io(format!("Cannot mmap {}: {}", path.display(), e)))?;

    Ok(parse_document_root(&mmap))
}

/// Collect the distinct document roots declared in `vhost_dir`.
///
/// Only regular files directly inside `vhost_dir` are read. Files that cannot
/// be read or declare no document root are skipped.
pub fn scan_vhosts(vhost_dir: &Path) -> Result<BTreeSet<PathBuf>, HdbError> {
    let entries = std::fs::read_dir(vhost_dir).map_err(|e| {
        HdbError::Io(format!(
            "Cannot read directory {}: {}",
            vhost_dir.display(),
            e
        ))
    })?;

    let mut roots = BTreeSet::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match read_document_root(&path) {
            Ok(Some(root)) => {
                roots.insert(PathBuf::from(root));
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("skipping vhost {}: {}", path.display(), e),
        }
    }

    Ok(roots)
}
