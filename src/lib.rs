//! MySQL and WordPress administration toolkit for shared hosting.
//!
//! The `hosting-db-utils` crate (library name `hdb`) provides the building
//! blocks behind the `hdb` binary: reconstructing a MySQL dump from raw
//! `.frm`/`.ibd` table files, and auditing the WordPress installations
//! served by Apache virtual hosts.
//!
//! # CLI Reference
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`hdb frm-dump`](cli::app::Commands::FrmDump) | Rebuild a database from `.frm`/`.ibd` files and export it with `mysqldump` |
//! | [`hdb wp-plugins`](cli::app::Commands::WpPlugins) | Report active WordPress plugins for every Apache vhost |
//! | [`hdb completions`](cli::app::Commands::Completions) | Print shell completion scripts |
//!
//! ## Global options
//!
//! All subcommands accept `--color <auto|always|never>`, `--output <file>`
//! and `--audit-log <file>`. Each subcommand's `-v` raises the diagnostic
//! log level on stderr from `warn` to `info`; `RUST_LOG` overrides both.
//!
//! # Library API
//!
//! ```no_run
//! use hdb::wordpress::config::parse_wp_config;
//! use hdb::wordpress::plugins::parse_active_plugins;
//!
//! let text = std::fs::read_to_string("/home/a/alice/site/wp-config.php").unwrap();
//! let settings = parse_wp_config(&text, "alice");
//! println!("options table: {}", settings.options_table());
//!
//! let active = parse_active_plugins(r#"a:1:{i:0;s:19:"akismet/akismet.php";}"#);
//! assert_eq!(active, vec!["akismet/akismet.php".to_string()]);
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`frm::dump`] | Schema dump assembly from `mysqlfrm --diagnostic` output |
//! | [`frm::tools`] | Invocation of `mysqlfrm`, `mysql` and `mysqldump` |
//! | [`wordpress::vhost`] | `DocumentRoot` extraction from Apache vhost files |
//! | [`wordpress::site`] | WordPress install discovery under document roots |
//! | [`wordpress::config`] | Database name and table prefix from `wp-config.php` |
//! | [`wordpress::plugins`] | Active plugin list and plugin header parsing |
//! | [`wordpress::report`] | Report rows and table rendering |
//! | [`util`] | File enumeration, ownership, MySQL configuration, audit log |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | The `hdb` binary and its terminal/logging dependencies. |
//! | `mysql` | on | Live MySQL queries via `mysql_async` + `tokio`. |

#[cfg(feature = "cli")]
pub mod cli;
pub mod frm;
pub mod util;
pub mod wordpress;

use thiserror::Error;

/// Errors returned by `hdb` operations.
#[derive(Error, Debug)]
pub enum HdbError {
    /// An I/O error occurred (file open, read, write, copy or chown failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// A parse error occurred (malformed input text or serialization failure).
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid argument was supplied (missing directory, unsafe identifier, etc.).
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// An external tool could not be started or exited with a failure status.
    #[error("Command failed: {0}")]
    Command(String),

    /// A MySQL connection or query failed.
    #[error("MySQL error: {0}")]
    Mysql(String),
}
