//! Active plugin discovery and plugin header parsing.
//!
//! WordPress stores the active plugin list in the `active_plugins` option as
//! a PHP-serialized array of paths relative to `wp-content/plugins`:
//!
//! ```text
//! a:2:{i:0;s:19:"akismet/akismet.php";i:1;s:9:"hello.php";}
//! ```
//!
//! Each plugin's main file starts with a comment block carrying its
//! `Plugin Name:` and `Version:` headers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::HdbError;

/// Number of leading lines searched for plugin headers.
pub const HEADER_SCAN_LINES: usize = 60;

/// Name used when a plugin file declares no `Plugin Name:` header.
pub const UNNAMED: &str = "Unnamed";
/// Version used when a plugin file declares no `Version:` header.
pub const UNDEFINED_VERSION: &str = "Undefined";

/// Header fields of a plugin's main file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginHeader {
    pub name: String,
    pub version: String,
}

impl Default for PluginHeader {
    fn default() -> Self {
        PluginHeader {
            name: UNNAMED.to_string(),
            version: UNDEFINED_VERSION.to_string(),
        }
    }
}

/// An active plugin resolved to its main file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub file: PathBuf,
    pub name: String,
    pub version: String,
}

/// Extract plugin paths from a serialized `active_plugins` value.
///
/// Every `;`-separated element mentioning `.php` contributes the text after
/// its first `:"`, minus the closing quote.
pub fn parse_active_plugins(serialized: &str) -> Vec<String> {
    serialized
        .split(';')
        .filter(|element| element.contains(".php"))
        .filter_map(|element| element.split(":\"").nth(1))
        .map(|value| {
            let mut plugin = value.to_string();
            plugin.pop();
            plugin
        })
        .filter(|plugin| !plugin.is_empty())
        .collect()
}

/// Keep the plugins whose main file exists under `plugin_dir` and is non-empty.
pub fn resolve_plugin_files(plugin_dir: &Path, plugins: &[String]) -> Vec<PathBuf> {
    plugins
        .iter()
        .map(|plugin| plugin_dir.join(plugin))
        .filter(|path| {
            std::fs::metadata(path)
                .map(|m| m.is_file() && m.len() > 0)
                .unwrap_or(false)
        })
        .collect()
}

/// Parse the `Plugin Name:` and `Version:` headers from the start of a file.
///
/// Only the first [`HEADER_SCAN_LINES`] lines are examined. Matching is
/// case-insensitive; lines mentioning `wp` are not taken as the plugin
/// version (they are usually `Requires at least:`-style WordPress version
/// constraints). A later match overrides an earlier one.
pub fn read_plugin_header<R: BufRead>(mut reader: R) -> Result<PluginHeader, HdbError> {
    let mut header = PluginHeader::default();
    let mut buf = Vec::new();

    for _ in 0..HEADER_SCAN_LINES {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| HdbError::Io(format!("Cannot read plugin file: {}", e)))?;
        if n == 0 {
            break;
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim();
        let lower = line.to_lowercase();

        if lower.contains("version:") && !lower.contains("wp") {
            if let Some(value) = line.split(':').nth(1) {
                header.version = value.trim().to_string();
            }
        }
        if lower.contains("plugin name:") {
            let parts: Vec<&str> = line.split(':').collect();
            let value = if parts.len() > 2 {
                parts[parts.len() - 1]
            } else {
                parts[1]
            };
            header.name = value.trim().to_string();
        }
    }

    Ok(header)
}

/// Read the headers of the plugin file at `path`.
pub fn read_plugin_file(path: &Path) -> Result<PluginInfo, HdbError> {
    let file = File::open(path)
        .map_err(|e| HdbError::Io(format!("Cannot open {}: {}", path.display(), e)))?;
    let header = read_plugin_header(BufReader::new(file))
        .map_err(|e| HdbError::Io(format!("{}: {}", path.display(), e)))?;

    Ok(PluginInfo {
        file: path.to_path_buf(),
        name: header.name,
        version: header.version,
    })
}
