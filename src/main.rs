#[cfg(not(feature = "cli"))]
compile_error!("The `hdb` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use hdb::cli;
use hdb::cli::app::{Cli, ColorMode, Commands};
use hdb::frm::tools::ToolPaths;
use hdb::util::audit::AuditLogger;
use hdb::HdbError;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "hdb=info" } else { "hdb=warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let verbose = match &cli.command {
        Commands::FrmDump { verbose, .. } | Commands::WpPlugins { verbose, .. } => *verbose,
        Commands::Completions { .. } => false,
    };
    init_logging(verbose);

    let writer_result: Result<Box<dyn Write>, HdbError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| HdbError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Create audit logger if --audit-log was specified
    let audit_logger: Option<Arc<AuditLogger>> = match &cli.audit_log {
        Some(path) => {
            let logger = match AuditLogger::open(path) {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            };
            let args: Vec<String> = std::env::args().collect();
            let _ = logger.start_session(args);
            Some(Arc::new(logger))
        }
        None => None,
    };

    let result = match cli.command {
        Commands::FrmDump {
            path,
            db,
            charset,
            tmp_dir,
            mysql_datadir,
            defaults_file,
            owner,
            group,
            mysqlfrm,
            mysql,
            mysqldump,
            verbose,
            json,
        } => cli::frm_dump::execute(
            &cli::frm_dump::FrmDumpOptions {
                path,
                db,
                charset,
                tmp_dir,
                mysql_datadir,
                defaults_file,
                owner,
                group,
                tools: ToolPaths {
                    mysqlfrm: PathBuf::from(mysqlfrm),
                    mysql: PathBuf::from(mysql),
                    mysqldump: PathBuf::from(mysqldump),
                },
                verbose,
                json,
                audit_logger: audit_logger.clone(),
            },
            &mut writer,
        ),

        Commands::WpPlugins {
            verbose,
            vhost_dir,
            defaults_file,
            customer_component,
            json,
        } => cli::wp_plugins::execute(
            &cli::wp_plugins::WpPluginsOptions {
                vhost_dir,
                defaults_file,
                customer_component,
                verbose,
                json,
            },
            &mut writer,
        ),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "hdb", &mut std::io::stdout());
            Ok(())
        }
    };

    // End audit session if logger was created
    if let Some(ref logger) = audit_logger {
        let _ = logger.end_session();
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
