//! Schema dump assembly.
//!
//! `mysqlfrm --diagnostic` reads a `.frm` file without a running server and
//! prints a best-effort `CREATE TABLE` statement surrounded by `#`-prefixed
//! commentary. The helpers here turn that output into a loadable SQL file:
//! a `DROP`/`CREATE DATABASE` preamble followed by the statements of every
//! table, commentary and blank lines removed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::HdbError;

/// Path of the schema-only dump for `db` inside `tmp_dir`.
pub fn schema_dump_path(tmp_dir: &Path, db: &str) -> PathBuf {
    tmp_dir.join(format!("{}.sql", db))
}

/// Path of the final `mysqldump` output for `db` inside `tmp_dir`.
pub fn full_dump_path(tmp_dir: &Path, db: &str) -> PathBuf {
    tmp_dir.join(format!("{}_complete_dump.sql", db))
}

/// The statements that recreate an empty database.
pub fn dump_preamble(db: &str, charset: &str) -> String {
    format!(
        "DROP DATABASE IF EXISTS {db};\nCREATE DATABASE {db} CHARACTER SET {charset};\n\n"
    )
}

/// Keep the SQL lines of `mysqlfrm --diagnostic` output.
///
/// Lines starting with `#` and blank lines are dropped; everything else is
/// returned verbatim, in order.
pub fn filter_diagnostic_output(output: &str) -> Vec<&str> {
    output
        .lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .collect()
}

/// Table name of a `.frm`/`.ibd` file: the file name up to its first dot.
pub fn table_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.split('.').next().unwrap_or(file_name);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Start a fresh dump file at `path` containing only the preamble.
///
/// An existing regular file at `path` is replaced.
pub fn prepare_dump(path: &Path, db: &str, charset: &str) -> Result<(), HdbError> {
    if path.is_file() {
        fs::remove_file(path)
            .map_err(|e| HdbError::Io(format!("Cannot remove {}: {}", path.display(), e)))?;
    }

    fs::write(path, dump_preamble(db, charset))
        .map_err(|e| HdbError::Io(format!("Cannot write {}: {}", path.display(), e)))
}

/// Append `lines` to the dump at `path`, one per line.
pub fn append_statements(path: &Path, lines: &[&str]) -> Result<(), HdbError> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| HdbError::Io(format!("Cannot open {}: {}", path.display(), e)))?;

    for line in lines {
        writeln!(file, "{}", line)
            .map_err(|e| HdbError::Io(format!("Cannot write {}: {}", path.display(), e)))?;
    }
    Ok(())
}
