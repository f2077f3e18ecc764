#![cfg(feature = "cli")]
//! Integration tests for `hdb frm-dump`.
//!
//! The external tools are replaced by small shell scripts so the dump
//! pipeline can run without a MySQL server.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use hdb::cli::frm_dump::{
    build_schema_dump, execute, export_full_dump, load_schema_dump, transplant_each,
    FrmDumpOptions,
};
use hdb::frm::tools::ToolPaths;
use hdb::util::audit::AuditLogger;
use hdb::util::mysql::SqlExecutor;
use hdb::HdbError;

const MYSQLFRM_STUB: &str = r##"#!/bin/sh
table=$(basename "$2" .frm)
echo "# Source on localhost: ... connected."
echo "# Reading .frm file for $2:"
echo "# The .frm file is a TABLE."
echo "# CREATE TABLE Statement:"
echo ""
echo "CREATE TABLE \`$table\` ("
echo "  \`id\` int(11) NOT NULL,"
echo "PRIMARY KEY \`PRIMARY\` (\`id\`)"
echo ") ENGINE=InnoDB;"
echo ""
echo "#...done."
"##;

const MYSQLDUMP_STUB: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --result-file=*) out="${arg#--result-file=}" ;;
  esac
done
echo "-- complete dump" > "$out"
"#;

const FAILING_STUB: &str = "#!/bin/sh\necho \"Access denied for user\" >&2\nexit 3\n";

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

struct Fixture {
    _dir: TempDir,
    source: PathBuf,
    tmp: PathBuf,
    bin: PathBuf,
    defaults: PathBuf,
}

impl Fixture {
    fn new(frm_tables: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("restore");
        let tmp = dir.path().join("tmp");
        let bin = dir.path().join("bin");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::create_dir_all(&tmp).unwrap();
        fs::create_dir_all(&bin).unwrap();

        for (i, table) in frm_tables.iter().enumerate() {
            // Spread the files over two levels to exercise the recursive walk
            let parent = if i % 2 == 0 {
                source.clone()
            } else {
                source.join("nested")
            };
            fs::write(parent.join(format!("{}.frm", table)), b"frm").unwrap();
        }

        let defaults = dir.path().join("my.cnf");
        fs::write(&defaults, "[client]\nuser=root\npassword=secret\n").unwrap();

        Fixture {
            _dir: dir,
            source,
            tmp,
            bin,
            defaults,
        }
    }

    fn tools(&self) -> ToolPaths {
        let stdin_copy = self.bin.join("mysql_stdin.sql");
        let mysql_stub = format!("#!/bin/sh\ncat > \"{}\"\n", stdin_copy.display());
        ToolPaths {
            mysqlfrm: write_script(&self.bin, "mysqlfrm", MYSQLFRM_STUB),
            mysql: write_script(&self.bin, "mysql", &mysql_stub),
            mysqldump: write_script(&self.bin, "mysqldump", MYSQLDUMP_STUB),
        }
    }

    fn opts(&self, tools: ToolPaths) -> FrmDumpOptions {
        FrmDumpOptions {
            path: self.source.display().to_string(),
            db: "shop".to_string(),
            charset: "utf8".to_string(),
            tmp_dir: self.tmp.display().to_string(),
            mysql_datadir: self.tmp.display().to_string(),
            defaults_file: Some(self.defaults.display().to_string()),
            owner: "mysql".to_string(),
            group: "mysql".to_string(),
            tools,
            verbose: false,
            json: false,
            audit_logger: None,
        }
    }

    fn frm_files(&self) -> Vec<PathBuf> {
        hdb::util::fs::collect_files(&self.source, "frm").unwrap()
    }
}

#[test]
fn schema_dump_collects_create_statements() {
    let fx = Fixture::new(&["orders", "customers"]);
    let opts = fx.opts(fx.tools());

    let mut out = Vec::new();
    let dump = build_schema_dump(&opts, &fx.frm_files(), &mut out).unwrap();
    assert_eq!(dump, fx.tmp.join("shop.sql"));

    let sql = fs::read_to_string(&dump).unwrap();
    assert!(sql.starts_with("DROP DATABASE IF EXISTS shop;"));
    assert!(sql.contains("CREATE TABLE `orders` ("));
    assert!(sql.contains("CREATE TABLE `customers` ("));
    assert!(!sql.contains("# Reading"));
    assert!(!sql.contains("#...done."));

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.matches("Reading ").count(), 2);
    assert!(text.contains("(4 lines)"));
}

#[test]
fn schema_dump_is_rebuilt_from_scratch() {
    let fx = Fixture::new(&["orders"]);
    let opts = fx.opts(fx.tools());
    fs::write(fx.tmp.join("shop.sql"), "stale content\n").unwrap();

    let dump = build_schema_dump(&opts, &fx.frm_files(), &mut Vec::new()).unwrap();
    let sql = fs::read_to_string(dump).unwrap();
    assert!(!sql.contains("stale content"));
    assert_eq!(sql.matches("CREATE TABLE `orders`").count(), 1);
}

#[test]
fn schema_dump_without_frm_files_holds_preamble() {
    let fx = Fixture::new(&[]);
    let opts = fx.opts(fx.tools());

    let dump = build_schema_dump(&opts, &[], &mut Vec::new()).unwrap();
    let sql = fs::read_to_string(dump).unwrap();
    assert!(sql.contains("CREATE DATABASE shop"));
    assert!(!sql.contains("CREATE TABLE"));
}

#[test]
fn schema_load_feeds_dump_on_stdin() {
    let fx = Fixture::new(&["orders"]);
    let opts = fx.opts(fx.tools());

    let dump = build_schema_dump(&opts, &fx.frm_files(), &mut Vec::new()).unwrap();
    let mut out = Vec::new();
    load_schema_dump(&opts, &fx.defaults, &dump, &mut out).unwrap();

    let received = fs::read_to_string(fx.bin.join("mysql_stdin.sql")).unwrap();
    assert_eq!(received, fs::read_to_string(&dump).unwrap());

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("--defaults-file="));
    assert!(text.contains("shop.sql"));
}

#[test]
fn failing_tool_stops_the_run() {
    let fx = Fixture::new(&["orders"]);
    let mut tools = fx.tools();
    tools.mysqlfrm = write_script(&fx.bin, "mysqlfrm-broken", FAILING_STUB);
    let opts = fx.opts(tools);

    let result = build_schema_dump(&opts, &fx.frm_files(), &mut Vec::new());
    match result {
        Err(HdbError::Command(msg)) => {
            assert!(msg.contains("exit status 3"));
            assert!(msg.contains("Access denied"));
        }
        other => panic!("expected command failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn full_dump_replaces_previous_export() {
    let fx = Fixture::new(&[]);
    let opts = fx.opts(fx.tools());
    fs::write(fx.tmp.join("shop_complete_dump.sql"), "old export\n").unwrap();

    let full = export_full_dump(&opts, &fx.defaults, &mut Vec::new()).unwrap();
    assert_eq!(full, fx.tmp.join("shop_complete_dump.sql"));
    assert_eq!(fs::read_to_string(full).unwrap(), "-- complete dump\n");
}

#[test]
fn audit_log_records_tool_runs_and_dumps() {
    let fx = Fixture::new(&["orders"]);
    let audit_path = fx.tmp.join("audit.ndjson");
    let logger = Arc::new(AuditLogger::open(&audit_path.display().to_string()).unwrap());
    let mut opts = fx.opts(fx.tools());
    opts.audit_logger = Some(logger.clone());

    let dump = build_schema_dump(&opts, &fx.frm_files(), &mut Vec::new()).unwrap();
    load_schema_dump(&opts, &fx.defaults, &dump, &mut Vec::new()).unwrap();
    export_full_dump(&opts, &fx.defaults, &mut Vec::new()).unwrap();
    logger.end_session().unwrap();

    let log = fs::read_to_string(&audit_path).unwrap();
    let events: Vec<serde_json::Value> = log
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let commands = events
        .iter()
        .filter(|e| e["event"] == "command_run")
        .count();
    assert_eq!(commands, 3);

    let writes: Vec<&str> = events
        .iter()
        .filter(|e| e["event"] == "file_write")
        .map(|e| e["operation"].as_str().unwrap())
        .collect();
    assert_eq!(writes, vec!["schema_dump", "full_dump"]);

    let end = events.last().unwrap();
    assert_eq!(end["event"], "session_end");
    assert_eq!(end["commands_run"], 3);
    assert_eq!(end["files_written"], 2);
}

#[cfg(feature = "mysql")]
#[test]
fn execute_without_tablespaces_writes_both_dumps() {
    colored::control::set_override(false);
    let fx = Fixture::new(&["orders", "customers"]);
    let opts = fx.opts(fx.tools());

    let mut out = Vec::new();
    execute(&opts, &mut out).unwrap();

    assert!(fx.tmp.join("shop.sql").is_file());
    assert!(fx.tmp.join("shop_complete_dump.sql").is_file());

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("The dump has been saved as"));
    assert!(text.contains("shop_complete_dump.sql"));
}

#[cfg(feature = "mysql")]
#[test]
fn execute_json_summary() {
    let fx = Fixture::new(&["orders"]);
    let mut opts = fx.opts(fx.tools());
    opts.json = true;

    let mut out = Vec::new();
    execute(&opts, &mut out).unwrap();

    let summary: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(summary["database"], "shop");
    assert_eq!(summary["frm_files"], 1);
    assert!(summary["tables"].as_array().unwrap().is_empty());
    assert!(summary["full_dump"]
        .as_str()
        .unwrap()
        .ends_with("shop_complete_dump.sql"));
}

#[test]
fn execute_rejects_missing_source() {
    let fx = Fixture::new(&[]);
    let mut opts = fx.opts(fx.tools());
    opts.path = fx.tmp.join("absent").display().to_string();

    let result = execute(&opts, &mut Vec::new());
    assert!(matches!(result, Err(HdbError::Argument(_))));
}

#[test]
fn execute_rejects_missing_defaults_file() {
    let fx = Fixture::new(&["orders"]);
    let mut opts = fx.opts(fx.tools());
    opts.defaults_file = Some(fx.tmp.join("absent.cnf").display().to_string());

    let result = execute(&opts, &mut Vec::new());
    assert!(matches!(result, Err(HdbError::Argument(_))));
    assert!(!fx.tmp.join("shop.sql").exists());
}

/// Records every statement together with whether the table's copy was
/// already in the data directory when the statement ran.
struct RecordingSession {
    datadir: PathBuf,
    statements: Vec<(String, bool)>,
}

impl RecordingSession {
    fn new(datadir: &Path) -> Self {
        RecordingSession {
            datadir: datadir.to_path_buf(),
            statements: Vec::new(),
        }
    }
}

impl SqlExecutor for RecordingSession {
    fn query_drop(&mut self, sql: &str) -> Result<(), HdbError> {
        let table = sql.split('`').nth(1).unwrap_or_default();
        let copied = self.datadir.join(format!("{}.ibd", table)).is_file();
        self.statements.push((sql.to_string(), copied));
        Ok(())
    }
}

fn transplant_fixture(ibd: &[(&str, &str)]) -> (Fixture, PathBuf, Vec<PathBuf>) {
    let fx = Fixture::new(&[]);
    for (name, body) in ibd {
        fs::write(fx.source.join(name), body).unwrap();
    }
    let datadir = fx.tmp.join("datadir").join("shop");
    fs::create_dir_all(&datadir).unwrap();
    let files = hdb::util::fs::collect_files(&fx.source, "ibd").unwrap();
    (fx, datadir, files)
}

fn current_owner(path: &Path) -> (u32, u32) {
    use std::os::unix::fs::MetadataExt;
    let meta = fs::metadata(path).unwrap();
    (meta.uid(), meta.gid())
}

#[test]
fn transplant_discards_copies_and_imports_in_order() {
    let (fx, datadir, files) = transplant_fixture(&[
        ("orders.ibd", "orders pages"),
        ("customers.ibd", "customer pages"),
    ]);
    let opts = fx.opts(fx.tools());
    let owner = current_owner(&datadir);
    let mut session = RecordingSession::new(&datadir);

    let mut out = Vec::new();
    let tables = transplant_each(&opts, &mut session, &files, &datadir, owner, &mut out).unwrap();
    assert_eq!(tables, vec!["customers", "orders"]);

    let expected = vec![
        ("ALTER TABLE `customers` DISCARD TABLESPACE".to_string(), false),
        ("ALTER TABLE `customers` IMPORT TABLESPACE".to_string(), true),
        ("ALTER TABLE `orders` DISCARD TABLESPACE".to_string(), false),
        ("ALTER TABLE `orders` IMPORT TABLESPACE".to_string(), true),
    ];
    assert_eq!(session.statements, expected);

    assert_eq!(fs::read(datadir.join("orders.ibd")).unwrap(), b"orders pages");
    assert_eq!(fs::read(datadir.join("customers.ibd")).unwrap(), b"customer pages");
    assert_eq!(current_owner(&datadir.join("orders.ibd")), owner);

    let text = String::from_utf8(out).unwrap();
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        vec![
            "Discarding tablespace for table: customers",
            "Copying tablespace for table: customers",
            "Set owner and group",
            "Importing tablespace for table: customers",
            "Discarding tablespace for table: orders",
            "Copying tablespace for table: orders",
            "Set owner and group",
            "Importing tablespace for table: orders",
        ]
    );
}

#[test]
fn transplant_rejects_unsafe_table_before_any_statement() {
    let (fx, datadir, files) =
        transplant_fixture(&[("orders.ibd", "orders pages"), ("t#P#p0.ibd", "partition")]);
    let opts = fx.opts(fx.tools());
    let owner = current_owner(&datadir);
    let mut session = RecordingSession::new(&datadir);

    let result = transplant_each(&opts, &mut session, &files, &datadir, owner, &mut Vec::new());
    match result {
        Err(HdbError::Argument(msg)) => assert!(msg.contains("t#P#p0")),
        other => panic!("expected argument error, got {:?}", other),
    }
    assert!(session.statements.is_empty());
    assert!(!datadir.join("orders.ibd").exists());
}

#[test]
fn transplant_records_audit_events() {
    let (fx, datadir, files) = transplant_fixture(&[("orders.ibd", "orders pages")]);
    let audit_path = fx.tmp.join("audit.ndjson");
    let logger = Arc::new(AuditLogger::open(&audit_path.display().to_string()).unwrap());
    let mut opts = fx.opts(fx.tools());
    opts.json = true;
    opts.audit_logger = Some(logger.clone());
    let owner = current_owner(&datadir);

    let mut out = Vec::new();
    let mut session = RecordingSession::new(&datadir);
    transplant_each(&opts, &mut session, &files, &datadir, owner, &mut out).unwrap();
    logger.end_session().unwrap();
    assert!(out.is_empty());

    let events: Vec<serde_json::Value> = fs::read_to_string(&audit_path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let tablespace: Vec<&str> = events
        .iter()
        .filter(|e| e["event"] == "tablespace")
        .map(|e| e["operation"].as_str().unwrap())
        .collect();
    assert_eq!(tablespace, vec!["discard", "import"]);
    assert!(events
        .iter()
        .filter(|e| e["event"] == "tablespace")
        .all(|e| e["database"] == "shop" && e["table"] == "orders"));

    let copy = events.iter().find(|e| e["event"] == "file_copy").unwrap();
    assert!(copy["destination"]
        .as_str()
        .unwrap()
        .ends_with("datadir/shop/orders.ibd"));
    assert_eq!(copy["bytes"], 12);

    let end = events.last().unwrap();
    assert_eq!(end["tablespaces_changed"], 2);
    assert_eq!(end["files_written"], 1);
}
