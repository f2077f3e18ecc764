//! Per-site active plugin reports.
//!
//! [`inspect_site`] reads the `siteurl` and `active_plugins` options through
//! an [`OptionStore`] and resolves every active plugin to its header. The
//! resulting [`SiteReport`] renders either as a bordered text table or as
//! JSON.

use std::path::PathBuf;

use serde::Serialize;

use crate::util::mysql::is_safe_identifier;
use crate::wordpress::config::WpDbSettings;
use crate::wordpress::plugins::{
    parse_active_plugins, read_plugin_file, resolve_plugin_files, PluginInfo,
};
use crate::wordpress::site::WpSite;
use crate::HdbError;

/// Shown in place of the site URL when the option row is missing.
pub const SITEURL_EMPTY: &str = "Siteurl is empty";
/// Notice attached to sites without an `active_plugins` row.
pub const NO_ACTIVE_PLUGINS: &str = "There are not any active plugins";

/// Column titles of the text report.
pub const COLUMNS: [&str; 5] = ["Customer", "Siteurl", "DB", "Plugin", "Version"];

/// Source of WordPress option values.
pub trait OptionStore {
    /// Value of `option_name = name` in `table`, `None` when no row matches.
    fn option_value(&mut self, table: &str, name: &str) -> Result<Option<String>, HdbError>;
}

#[cfg(feature = "mysql")]
impl OptionStore for crate::util::mysql::MysqlSession {
    fn option_value(&mut self, table: &str, name: &str) -> Result<Option<String>, HdbError> {
        self.query_first_string(&format!(
            "SELECT option_value FROM `{}` WHERE option_name = '{}'",
            table, name
        ))
    }
}

/// Active plugins of one WordPress installation.
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub customer: String,
    pub siteurl: String,
    pub database: String,
    pub config: PathBuf,
    pub plugin_dir: PathBuf,
    pub plugins: Vec<PluginInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl SiteReport {
    /// One table row per plugin.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.plugins
            .iter()
            .map(|plugin| {
                vec![
                    self.customer.clone(),
                    self.siteurl.clone(),
                    self.database.clone(),
                    plugin.name.clone(),
                    plugin.version.clone(),
                ]
            })
            .collect()
    }

    /// The report as a bordered table; the header is printed even without rows.
    pub fn render_table(&self) -> String {
        render_table(&COLUMNS, &self.rows())
    }
}

/// Build the report of `site` from its options table.
///
/// Fails when the settings carry no database, when the table prefix is not a
/// plain identifier, when a query fails, or when an active plugin file
/// cannot be read.
pub fn inspect_site(
    site: &WpSite,
    customer: &str,
    settings: &WpDbSettings,
    store: &mut dyn OptionStore,
) -> Result<SiteReport, HdbError> {
    let database = settings.database.clone().ok_or_else(|| {
        HdbError::Parse(format!(
            "No database for customer '{}' in {}",
            customer,
            site.config.display()
        ))
    })?;

    let table = settings.options_table();
    if !is_safe_identifier(&table) {
        return Err(HdbError::Argument(format!(
            "Unsupported table prefix '{}' in {}",
            settings.table_prefix,
            site.config.display()
        )));
    }

    let siteurl = store
        .option_value(&table, "siteurl")?
        .unwrap_or_else(|| SITEURL_EMPTY.to_string());

    let (plugins, notice) = match store.option_value(&table, "active_plugins")? {
        Some(serialized) => {
            let names = parse_active_plugins(&serialized);
            let files = resolve_plugin_files(&site.plugin_dir, &names);
            let plugins = files
                .iter()
                .map(|file| read_plugin_file(file))
                .collect::<Result<Vec<_>, _>>()?;
            (plugins, None)
        }
        None => (Vec::new(), Some(NO_ACTIVE_PLUGINS.to_string())),
    };

    Ok(SiteReport {
        customer: customer.to_string(),
        siteurl,
        database,
        config: site.config.clone(),
        plugin_dir: site.plugin_dir.clone(),
        plugins,
        notice,
    })
}

/// Render a bordered, centered text table.
///
/// The closing rule is printed even when there are no rows.
///
/// ```text
/// +----------+-----+
/// | Customer |  DB |
/// +----------+-----+
/// |  alice   | a_b |
/// +----------+-----+
/// ```
pub fn render_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let rule = {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        line
    };

    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format_row(&widths, header));
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&format_row(&widths, &cells));
        out.push('\n');
    }
    out.push_str(&rule);
    out.push('\n');
    out
}

fn format_row(widths: &[usize], cells: &[&str]) -> String {
    let mut line = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        line.push(' ');
        line.push_str(&center(cells.get(i).copied().unwrap_or(""), *w));
        line.push_str(" |");
    }
    line
}

/// Pad `text` to `width` the way Python's `str.center` does: an odd margin
/// puts the extra space on the left only when `width` is odd.
fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let excess = width.saturating_sub(len);
    let left = excess / 2 + (excess & width & 1);
    let right = excess - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}
