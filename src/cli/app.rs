use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "hdb")]
#[command(about = "MySQL and WordPress administration toolkit for shared hosting")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Append NDJSON audit events for every state-changing action to this file
    #[arg(long = "audit-log", global = true)]
    pub audit_log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild a database from raw .frm/.ibd files and export it with mysqldump
    FrmDump {
        /// Directory holding the .frm and .ibd files
        path: String,

        /// Name of the database to create and dump
        db: String,

        /// Character set of the database and the dump
        #[arg(long, default_value = "utf8")]
        charset: String,

        /// Directory receiving the schema dump and the final dump
        #[arg(long = "tmp-dir", default_value = "/tmp")]
        tmp_dir: String,

        /// MySQL data directory the tablespaces are copied into
        #[arg(long = "mysql-datadir", default_value = "/var/lib/mysql")]
        mysql_datadir: String,

        /// Path to MySQL defaults file (.my.cnf) with client credentials
        #[arg(long = "defaults-file")]
        defaults_file: Option<String>,

        /// Owner of the copied tablespace files
        #[arg(long, default_value = "mysql")]
        owner: String,

        /// Group of the copied tablespace files
        #[arg(long, default_value = "mysql")]
        group: String,

        /// mysqlfrm executable
        #[arg(long, default_value = "mysqlfrm")]
        mysqlfrm: String,

        /// mysql client executable
        #[arg(long, default_value = "/usr/bin/mysql")]
        mysql: String,

        /// mysqldump executable
        #[arg(long, default_value = "/usr/bin/mysqldump")]
        mysqldump: String,

        /// Display external tool output and diagnostic logs
        #[arg(short, long)]
        verbose: bool,

        /// Output a JSON summary instead of progress messages
        #[arg(long)]
        json: bool,
    },

    /// Report active WordPress plugins for every Apache virtual host
    WpPlugins {
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Directory of Apache virtual host configuration files
        #[arg(long = "vhost-dir", default_value = "/etc/apache2/virtdom")]
        vhost_dir: String,

        /// Path to MySQL defaults file (.my.cnf) with client credentials
        #[arg(long = "defaults-file")]
        defaults_file: Option<String>,

        /// Slash-separated component of the config path holding the customer login
        #[arg(long = "customer-component", default_value = "3")]
        customer_component: usize,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
