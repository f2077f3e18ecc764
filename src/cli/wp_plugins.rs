//! CLI implementation for the `hdb wp-plugins` subcommand.
//!
//! Walks every Apache virtual host, finds the WordPress installations among
//! their document roots and prints, per site, a table of the plugins that
//! are active according to the site's options table. Sites that cannot be
//! inspected (no database in the config, unreachable database, missing
//! options table, unreadable plugin file) are skipped with a warning.

use std::io::Write;
use std::path::Path;

use colored::Colorize;

use crate::cli::wprintln;
use crate::util::mysql::MysqlConfig;
use crate::wordpress::config::read_wp_config;
use crate::wordpress::report::SiteReport;
use crate::wordpress::site::{discover_sites, WpSite};
use crate::wordpress::vhost::scan_vhosts;
use crate::HdbError;

/// Options for the `hdb wp-plugins` subcommand.
pub struct WpPluginsOptions {
    /// Directory of Apache virtual host files.
    pub vhost_dir: String,
    /// MySQL defaults file; looked up in the usual places when `None`.
    pub defaults_file: Option<String>,
    /// Path component of `wp-config.php` holding the customer login.
    pub customer_component: usize,
    /// Print the config file and plugin directory of every site.
    pub verbose: bool,
    /// Emit all reports as one JSON array.
    pub json: bool,
}

/// Report the active plugins of every WordPress site behind the vhosts.
pub fn execute(opts: &WpPluginsOptions, writer: &mut dyn Write) -> Result<(), HdbError> {
    let vhost_dir = Path::new(&opts.vhost_dir);
    if !vhost_dir.is_dir() {
        return Err(HdbError::Argument(format!(
            "Virtual host directory does not exist: {}",
            opts.vhost_dir
        )));
    }

    let roots = scan_vhosts(vhost_dir)?;
    let sites = discover_sites(&roots);
    tracing::info!(
        "{} document roots, {} WordPress installations",
        roots.len(),
        sites.len()
    );

    let mysql_config = MysqlConfig::load(opts.defaults_file.as_deref().map(Path::new))?;
    let mut reports = Vec::new();

    for site in &sites {
        if opts.verbose && !opts.json {
            wprintln!(writer, "Config file {}", site.config.display())?;
            wprintln!(writer, "Plugin dir {}", site.plugin_dir.display())?;
        }

        let report = match inspect(opts, site, &mysql_config) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("skipping {}: {}", site.root.display(), e);
                continue;
            }
        };

        if opts.json {
            reports.push(report);
        } else {
            print_report(&report, writer)?;
        }
    }

    if opts.json {
        wprintln!(writer, "{}", crate::cli::to_json(&reports)?)?;
    } else if sites.is_empty() {
        wprintln!(
            writer,
            "No WordPress installations found under {}",
            opts.vhost_dir
        )?;
    }

    Ok(())
}

fn print_report(report: &SiteReport, writer: &mut dyn Write) -> Result<(), HdbError> {
    if let Some(ref notice) = report.notice {
        wprintln!(
            writer,
            "{} {} ({}): {}",
            "Customer".bold(),
            report.customer,
            report.database,
            notice.yellow()
        )?;
        return Ok(());
    }
    write!(writer, "{}", report.render_table()).map_err(|e| HdbError::Io(e.to_string()))
}

/// Read the site's config, connect to its database and build its report.
fn inspect(
    opts: &WpPluginsOptions,
    site: &WpSite,
    mysql_config: &MysqlConfig,
) -> Result<SiteReport, HdbError> {
    let customer = site.customer(opts.customer_component).ok_or_else(|| {
        HdbError::Parse(format!(
            "No customer at path component {} of {}",
            opts.customer_component,
            site.config.display()
        ))
    })?;

    let settings = read_wp_config(&site.config, &customer)?;
    let database = settings.database.clone().ok_or_else(|| {
        HdbError::Parse(format!(
            "No DB_NAME starting with '{}' in {}",
            customer,
            site.config.display()
        ))
    })?;
    tracing::debug!(
        "{}: database {}, options table {}",
        site.root.display(),
        database,
        settings.options_table()
    );

    query_site(site, &customer, &settings, &mysql_config.with_database(&database))
}

#[cfg(feature = "mysql")]
fn query_site(
    site: &WpSite,
    customer: &str,
    settings: &crate::wordpress::config::WpDbSettings,
    config: &MysqlConfig,
) -> Result<SiteReport, HdbError> {
    use crate::util::mysql::MysqlSession;
    use crate::wordpress::report::inspect_site;

    let mut session = MysqlSession::connect(config)?;
    let result = inspect_site(site, customer, settings, &mut session);
    session.disconnect();
    result
}

#[cfg(not(feature = "mysql"))]
fn query_site(
    _site: &WpSite,
    _customer: &str,
    _settings: &crate::wordpress::config::WpDbSettings,
    _config: &MysqlConfig,
) -> Result<SiteReport, HdbError> {
    Err(HdbError::Argument(
        "MySQL support not compiled. Rebuild with: cargo build --features mysql".to_string(),
    ))
}
