//! CLI subcommand implementations for the `hdb` binary.
//!
//! CLI argument parsing uses clap derive macros, with the top-level
//! [`app::Cli`] struct and [`app::Commands`] enum defined in [`app`] and
//! shared between `main.rs` and `build.rs` (for man page generation) via
//! `include!()`.
//!
//! Each subcommand module follows the same pattern: an `Options` struct
//! holding the parsed arguments and a
//! `pub fn execute(opts, writer) -> Result<(), HdbError>` entry point. The
//! `writer: &mut dyn Write` parameter allows output to be captured in tests
//! or redirected to a file via the global `--output` flag.
//!
//! # Subcommands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `hdb frm-dump` | [`frm_dump`] | Rebuild a database from `.frm`/`.ibd` files and dump it |
//! | `hdb wp-plugins` | [`wp_plugins`] | Report active WordPress plugins per virtual host |
//!
//! # Common patterns
//!
//! - **`--json`**: structured output via `#[derive(Serialize)]` structs and
//!   `serde_json`.
//! - **`--verbose` / `-v`**: extra detail on stdout and `info`-level
//!   diagnostics on stderr (`RUST_LOG` overrides the level).
//! - **`--audit-log`** (global): NDJSON trail of tool runs, file writes and
//!   tablespace changes.
//!
//! The `wprintln!` and `wprint!` macros wrap `writeln!`/`write!` to convert
//! `io::Error` into `HdbError`.

pub mod app;
pub mod frm_dump;
pub mod wp_plugins;

/// Write a line to the given writer, converting io::Error to HdbError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::HdbError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::HdbError::Io(e.to_string()))
    };
}

/// Write (without newline) to the given writer, converting io::Error to HdbError.
macro_rules! wprint {
    ($w:expr, $($arg:tt)*) => {
        write!($w, $($arg)*).map_err(|e| $crate::HdbError::Io(e.to_string()))
    };
}

pub(crate) use wprint;
pub(crate) use wprintln;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::HdbError;

/// Create a styled progress bar for iterating over files.
pub(crate) fn create_progress_bar(count: u64, unit: &str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{eta}})",
            unit
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    let pb = ProgressBar::new(count);
    pb.set_style(style);
    pb
}

/// Serialize `value` as pretty JSON.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, HdbError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| HdbError::Parse(format!("JSON serialization error: {}", e)))
}
