//! CLI implementation for the `hdb frm-dump` subcommand.
//!
//! Rebuilds a database from a directory of raw table files and exports it:
//!
//! 1. every `.frm` file is run through `mysqlfrm --diagnostic` and the
//!    recovered `CREATE TABLE` statements are collected in `<tmp>/<db>.sql`
//!    behind a `DROP`/`CREATE DATABASE` preamble;
//! 2. that schema dump is loaded with the `mysql` client;
//! 3. for every `.ibd` file the new table's tablespace is discarded, the
//!    original file copied into the data directory (owned by the server
//!    account) and imported;
//! 4. `mysqldump` writes the complete database to
//!    `<tmp>/<db>_complete_dump.sql`.
//!
//! The run stops at the first failure.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;

use crate::cli::{wprint, wprintln};
use crate::frm::dump::{
    append_statements, filter_diagnostic_output, full_dump_path, prepare_dump, schema_dump_path,
    table_name,
};
use crate::frm::tools::{self, ToolPaths, ToolRun};
use crate::util::audit::AuditLogger;
use crate::util::fs::collect_files;
use crate::util::mysql::{find_defaults_file, is_safe_identifier, SqlExecutor};
use crate::util::owner::chown_path;
use crate::HdbError;

/// Options for the `hdb frm-dump` subcommand.
pub struct FrmDumpOptions {
    /// Directory holding the `.frm` and `.ibd` files.
    pub path: String,
    /// Database to create and dump.
    pub db: String,
    /// Character set of the database and the dump.
    pub charset: String,
    /// Directory receiving both dump files.
    pub tmp_dir: String,
    /// MySQL data directory the tablespaces are copied into.
    pub mysql_datadir: String,
    /// MySQL defaults file; looked up in the usual places when `None`.
    pub defaults_file: Option<String>,
    /// Owner of the copied tablespace files.
    pub owner: String,
    /// Group of the copied tablespace files.
    pub group: String,
    /// External program locations.
    pub tools: ToolPaths,
    /// Echo external tool output.
    pub verbose: bool,
    /// Emit a JSON summary instead of progress messages.
    pub json: bool,
    /// Optional audit logger for tool runs, file writes and tablespace changes.
    pub audit_logger: Option<Arc<AuditLogger>>,
}

#[derive(Serialize)]
struct FrmDumpSummaryJson {
    database: String,
    charset: String,
    schema_dump: String,
    full_dump: String,
    frm_files: usize,
    tables: Vec<String>,
}

/// Rebuild the database from raw table files and write the full dump.
pub fn execute(opts: &FrmDumpOptions, writer: &mut dyn Write) -> Result<(), HdbError> {
    validate(opts)?;

    let source = Path::new(&opts.path);
    let frm_files = collect_files(source, "frm")?;
    let ibd_files = collect_files(source, "ibd")?;
    let defaults_file = resolve_defaults_file(opts)?;

    tracing::info!(
        "{} .frm and {} .ibd files under {}",
        frm_files.len(),
        ibd_files.len(),
        source.display()
    );

    let schema_dump = build_schema_dump(opts, &frm_files, writer)?;
    load_schema_dump(opts, &defaults_file, &schema_dump, writer)?;
    let tables = transplant_tablespaces(opts, &defaults_file, &ibd_files, writer)?;
    let full_dump = export_full_dump(opts, &defaults_file, writer)?;

    if opts.json {
        let summary = FrmDumpSummaryJson {
            database: opts.db.clone(),
            charset: opts.charset.clone(),
            schema_dump: schema_dump.display().to_string(),
            full_dump: full_dump.display().to_string(),
            frm_files: frm_files.len(),
            tables,
        };
        wprintln!(writer, "{}", crate::cli::to_json(&summary)?)?;
    } else {
        wprintln!(writer)?;
        wprintln!(writer)?;
        wprintln!(
            writer,
            "The dump has been saved as {}",
            full_dump.display().to_string().bold()
        )?;
    }

    Ok(())
}

fn validate(opts: &FrmDumpOptions) -> Result<(), HdbError> {
    if !Path::new(&opts.path).is_dir() {
        return Err(HdbError::Argument(format!(
            "Source directory does not exist: {}",
            opts.path
        )));
    }
    if !Path::new(&opts.tmp_dir).is_dir() {
        return Err(HdbError::Argument(format!(
            "Temporary directory does not exist: {}",
            opts.tmp_dir
        )));
    }
    if !is_safe_identifier(&opts.db) {
        return Err(HdbError::Argument(format!(
            "Invalid database name '{}': use letters, digits, '_' or '$'",
            opts.db
        )));
    }
    if !is_safe_identifier(&opts.charset) {
        return Err(HdbError::Argument(format!(
            "Invalid character set '{}'",
            opts.charset
        )));
    }
    Ok(())
}

fn resolve_defaults_file(opts: &FrmDumpOptions) -> Result<PathBuf, HdbError> {
    let path = match opts.defaults_file {
        Some(ref df) => PathBuf::from(df),
        None => find_defaults_file().ok_or_else(|| {
            HdbError::Argument(
                "No MySQL defaults file found (~/.my.cnf, /etc/my.cnf); pass --defaults-file"
                    .to_string(),
            )
        })?,
    };

    if !path.is_file() {
        return Err(HdbError::Argument(format!(
            "MySQL defaults file does not exist: {}",
            path.display()
        )));
    }
    Ok(path)
}

/// Print a progress line unless JSON output was requested.
fn status(opts: &FrmDumpOptions, writer: &mut dyn Write, msg: &str) -> Result<(), HdbError> {
    if !opts.json {
        wprintln!(writer, "{}", msg)?;
    }
    Ok(())
}

/// Run an external command, record it in the audit log and check its status.
fn run_tool(
    opts: &FrmDumpOptions,
    cmd: &mut std::process::Command,
    writer: &mut dyn Write,
) -> Result<ToolRun, HdbError> {
    tracing::debug!("running {}", tools::command_line(cmd));
    let outcome = tools::run(cmd)?;

    if let Some(ref logger) = opts.audit_logger {
        logger.log_command(&outcome.command, outcome.exit_code())?;
    }
    if opts.verbose && !opts.json && !outcome.stderr.trim().is_empty() {
        wprint!(writer, "{}", outcome.stderr.dimmed())?;
    }

    outcome.check()
}

/// Write `<tmp>/<db>.sql` from the diagnostic output of every `.frm` file.
///
/// Returns the path of the schema dump. With no `.frm` files the dump holds
/// only the preamble.
pub fn build_schema_dump(
    opts: &FrmDumpOptions,
    frm_files: &[PathBuf],
    writer: &mut dyn Write,
) -> Result<PathBuf, HdbError> {
    let dump = schema_dump_path(Path::new(&opts.tmp_dir), &opts.db);
    prepare_dump(&dump, &opts.db, &opts.charset)?;

    for frm in frm_files {
        if !opts.json {
            wprint!(writer, "Reading {}... ", frm.display())?;
        }

        let mut cmd = tools::mysqlfrm_command(&opts.tools, frm);
        let outcome = run_tool(opts, &mut cmd, writer)?;
        let lines = filter_diagnostic_output(&outcome.stdout);
        append_statements(&dump, &lines)?;

        if !opts.json {
            wprintln!(writer, "{} ({} lines)", "OK".green(), lines.len())?;
        }
    }

    if let Some(ref logger) = opts.audit_logger {
        logger.log_file_write(&dump.display().to_string(), "schema_dump")?;
    }
    Ok(dump)
}

/// Execute the schema dump with the `mysql` client.
pub fn load_schema_dump(
    opts: &FrmDumpOptions,
    defaults_file: &Path,
    dump: &Path,
    writer: &mut dyn Write,
) -> Result<(), HdbError> {
    let mut cmd = tools::mysql_import_command(&opts.tools, defaults_file, dump)?;
    status(
        opts,
        writer,
        &format!("{} < {}", tools::command_line(&cmd), dump.display()),
    )?;

    let outcome = run_tool(opts, &mut cmd, writer)?;
    if opts.verbose && !opts.json && !outcome.stdout.is_empty() {
        wprint!(writer, "{}", outcome.stdout)?;
    }
    Ok(())
}

/// Swap the tablespace of every table for the matching `.ibd` file.
///
/// Returns the names of the tables whose tablespace was imported.
#[cfg(feature = "mysql")]
pub fn transplant_tablespaces(
    opts: &FrmDumpOptions,
    defaults_file: &Path,
    ibd_files: &[PathBuf],
    writer: &mut dyn Write,
) -> Result<Vec<String>, HdbError> {
    use crate::util::mysql::{MysqlConfig, MysqlSession};
    use crate::util::owner::{lookup_gid, lookup_uid, GROUP_FILE, PASSWD_FILE};

    if ibd_files.is_empty() {
        return Ok(Vec::new());
    }

    let uid = lookup_uid(&opts.owner, Path::new(PASSWD_FILE))?;
    let gid = lookup_gid(&opts.group, Path::new(GROUP_FILE))?;
    let destination = Path::new(&opts.mysql_datadir).join(&opts.db);
    if !destination.is_dir() {
        return Err(HdbError::Argument(format!(
            "Database directory does not exist: {}",
            destination.display()
        )));
    }

    let config = MysqlConfig::load(Some(defaults_file))?.with_database(&opts.db);
    let mut session = MysqlSession::connect(&config)?;
    let result = transplant_each(opts, &mut session, ibd_files, &destination, (uid, gid), writer);
    session.disconnect();
    result
}

#[cfg(not(feature = "mysql"))]
pub fn transplant_tablespaces(
    _opts: &FrmDumpOptions,
    _defaults_file: &Path,
    _ibd_files: &[PathBuf],
    _writer: &mut dyn Write,
) -> Result<Vec<String>, HdbError> {
    Err(HdbError::Argument(
        "MySQL support not compiled. Rebuild with: cargo build --features mysql".to_string(),
    ))
}

/// Discard, replace and import the tablespace of each table in turn.
///
/// Every `.ibd` file name is checked before the first statement runs; a
/// file whose table name is not a plain identifier aborts the whole swap.
/// Copies land in `destination` under their original file name and are
/// handed to `owner` (uid, gid) before the import.
pub fn transplant_each(
    opts: &FrmDumpOptions,
    session: &mut dyn SqlExecutor,
    ibd_files: &[PathBuf],
    destination: &Path,
    owner: (u32, u32),
    writer: &mut dyn Write,
) -> Result<Vec<String>, HdbError> {
    let tables = ibd_files
        .iter()
        .map(|ibd| checked_table_name(ibd))
        .collect::<Result<Vec<_>, _>>()?;

    let pb = if !opts.json {
        Some(crate::cli::create_progress_bar(
            ibd_files.len() as u64,
            "tablespaces",
        ))
    } else {
        None
    };

    let mut step = |msg: &str| -> Result<(), HdbError> {
        match pb {
            Some(ref pb) => pb.suspend(|| status(opts, writer, msg)),
            None => Ok(()),
        }
    };

    for (ibd, table) in ibd_files.iter().zip(&tables) {
        step(&format!("Discarding tablespace for table: {}", table))?;
        session.query_drop(&format!("ALTER TABLE `{}` DISCARD TABLESPACE", table))?;
        if let Some(ref logger) = opts.audit_logger {
            logger.log_tablespace(&opts.db, table, "discard")?;
        }

        step(&format!("Copying tablespace for table: {}", table))?;
        let file_name = ibd.file_name().ok_or_else(|| {
            HdbError::Argument(format!("Not a file path: {}", ibd.display()))
        })?;
        let target = destination.join(file_name);
        let bytes = std::fs::copy(ibd, &target).map_err(|e| {
            HdbError::Io(format!(
                "Cannot copy {} to {}: {}",
                ibd.display(),
                target.display(),
                e
            ))
        })?;
        if let Some(ref logger) = opts.audit_logger {
            logger.log_copy(
                &ibd.display().to_string(),
                &target.display().to_string(),
                bytes,
            )?;
        }

        step("Set owner and group")?;
        chown_path(&target, owner.0, owner.1)?;

        step(&format!("Importing tablespace for table: {}", table))?;
        session.query_drop(&format!("ALTER TABLE `{}` IMPORT TABLESPACE", table))?;
        if let Some(ref logger) = opts.audit_logger {
            logger.log_tablespace(&opts.db, table, "import")?;
        }

        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }
    Ok(tables)
}

fn checked_table_name(ibd: &Path) -> Result<String, HdbError> {
    let table = table_name(ibd).ok_or_else(|| {
        HdbError::Argument(format!("Cannot derive table name from {}", ibd.display()))
    })?;
    if !is_safe_identifier(&table) {
        return Err(HdbError::Argument(format!(
            "Unsupported table name '{}' ({})",
            table,
            ibd.display()
        )));
    }
    Ok(table)
}

/// Export the rebuilt database to `<tmp>/<db>_complete_dump.sql`.
pub fn export_full_dump(
    opts: &FrmDumpOptions,
    defaults_file: &Path,
    writer: &mut dyn Write,
) -> Result<PathBuf, HdbError> {
    let full_dump = full_dump_path(Path::new(&opts.tmp_dir), &opts.db);
    if full_dump.is_file() {
        std::fs::remove_file(&full_dump).map_err(|e| {
            HdbError::Io(format!("Cannot remove {}: {}", full_dump.display(), e))
        })?;
    }

    let args = tools::mysqldump_args(defaults_file, &opts.charset, &opts.db, &full_dump);
    let mut cmd = tools::mysqldump_command(&opts.tools, &args);
    status(opts, writer, &tools::command_line(&cmd))?;
    run_tool(opts, &mut cmd, writer)?;

    if let Some(ref logger) = opts.audit_logger {
        logger.log_file_write(&full_dump.display().to_string(), "full_dump")?;
    }
    Ok(full_dump)
}
