use std::path::{Path, PathBuf};

use crate::HdbError;

/// Usual server socket locations (Debian, Red Hat, source builds).
pub const SERVER_SOCKETS: [&str; 4] = [
    "/var/run/mysqld/mysqld.sock",
    "/run/mysqld/mysqld.sock",
    "/var/lib/mysql/mysql.sock",
    "/tmp/mysql.sock",
];

/// MySQL connection configuration parsed from a `.my.cnf` defaults file.
#[derive(Debug, Clone, PartialEq)]
pub struct MysqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: Option<String>,
    pub socket: Option<String>,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        MysqlConfig {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            database: None,
            socket: None,
        }
    }
}

impl MysqlConfig {
    /// Resolve the connection configuration.
    ///
    /// An explicit `defaults_file` must be readable. Without one, the usual
    /// locations are tried (see [`find_defaults_file`]) and built-in defaults
    /// are used when none exists.
    pub fn load(defaults_file: Option<&Path>) -> Result<Self, HdbError> {
        match defaults_file {
            Some(path) => parse_defaults_file(path).ok_or_else(|| {
                HdbError::Argument(format!(
                    "Cannot read MySQL defaults file {}",
                    path.display()
                ))
            }),
            None => Ok(find_defaults_file()
                .and_then(|path| parse_defaults_file(&path))
                .unwrap_or_default()),
        }
    }

    /// Return a copy of the config with `database` selected.
    pub fn with_database(&self, database: &str) -> Self {
        let mut config = self.clone();
        config.database = Some(database.to_string());
        config
    }

    /// Build a mysql_async connection URL from the config (password omitted).
    pub fn connection_url(&self) -> String {
        let mut url = format!("mysql://{}@{}:{}", self.user, self.host, self.port);
        if let Some(ref db) = self.database {
            url.push('/');
            url.push_str(db);
        }
        url
    }

    /// Unix socket to connect through.
    ///
    /// An explicit `socket` wins. For `localhost` the first existing path in
    /// `candidates` is used, matching the `mysql` client, which never opens a
    /// TCP connection for that host name.
    pub fn resolved_socket(&self, candidates: &[&str]) -> Option<String> {
        if let Some(ref sock) = self.socket {
            return Some(sock.clone());
        }
        if self.host != "localhost" {
            return None;
        }
        candidates
            .iter()
            .find(|path| Path::new(path).exists())
            .map(|path| path.to_string())
    }

    /// Build an opts builder from config.
    #[cfg(feature = "mysql")]
    pub fn to_opts(&self) -> mysql_async::OptsBuilder {
        let mut builder = mysql_async::OptsBuilder::default()
            .ip_or_hostname(&self.host)
            .tcp_port(self.port)
            .user(Some(&self.user));

        if let Some(ref pw) = self.password {
            builder = builder.pass(Some(pw));
        }
        if let Some(ref db) = self.database {
            builder = builder.db_name(Some(db));
        }
        if let Some(sock) = self.resolved_socket(&SERVER_SOCKETS) {
            builder = builder.socket(Some(sock));
        }

        builder
    }
}

/// Parse a MySQL defaults file (`.my.cnf` format) for `[client]` section credentials.
pub fn parse_defaults_file(path: &Path) -> Option<MysqlConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    Some(parse_defaults(&content))
}

/// Parse the `[client]` section of `.my.cnf` formatted text.
pub fn parse_defaults(content: &str) -> MysqlConfig {
    let mut config = MysqlConfig::default();
    let mut in_client = false;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_client = line.eq_ignore_ascii_case("[client]");
            continue;
        }
        if !in_client || line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim().to_lowercase();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            match key.as_str() {
                "host" => config.host = value.to_string(),
                "port" => {
                    if let Ok(p) = value.parse() {
                        config.port = p;
                    }
                }
                "user" => config.user = value.to_string(),
                "password" => config.password = Some(value.to_string()),
                "socket" => config.socket = Some(value.to_string()),
                "database" => config.database = Some(value.to_string()),
                _ => {}
            }
        }
    }

    config
}

/// Find the default .my.cnf file.
pub fn find_defaults_file() -> Option<PathBuf> {
    // Check $HOME/.my.cnf
    if let Some(home) = std::env::var_os("HOME") {
        let path = Path::new(&home).join(".my.cnf");
        if path.exists() {
            return Some(path);
        }
    }
    // Check /etc/my.cnf
    let etc = Path::new("/etc/my.cnf");
    if etc.exists() {
        return Some(etc.to_path_buf());
    }
    None
}

/// Whether `name` may be interpolated into SQL as a database, table,
/// charset or prefix name.
pub fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// First column of an optional row; a SQL `NULL` counts as no value.
#[cfg_attr(not(feature = "mysql"), allow(dead_code))]
fn first_value(row: Option<Option<String>>) -> Option<String> {
    row.flatten()
}

/// Executes statements whose result is not needed.
pub trait SqlExecutor {
    fn query_drop(&mut self, sql: &str) -> Result<(), HdbError>;
}

/// Blocking connection to a MySQL server.
///
/// Owns a current-thread tokio runtime and drives every `mysql_async` call
/// to completion with `block_on`.
#[cfg(feature = "mysql")]
pub struct MysqlSession {
    rt: tokio::runtime::Runtime,
    pool: mysql_async::Pool,
    conn: mysql_async::Conn,
}

#[cfg(feature = "mysql")]
impl MysqlSession {
    /// Open a connection using `config`.
    pub fn connect(config: &MysqlConfig) -> Result<Self, HdbError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| HdbError::Io(format!("Cannot create async runtime: {}", e)))?;

        let pool = mysql_async::Pool::new(config.to_opts());
        let conn = rt.block_on(pool.get_conn()).map_err(|e| {
            HdbError::Mysql(format!(
                "Connection to {} failed: {}",
                config.connection_url(),
                e
            ))
        })?;

        Ok(Self { rt, pool, conn })
    }

    /// Execute a statement and discard its result.
    pub fn query_drop(&mut self, sql: &str) -> Result<(), HdbError> {
        use mysql_async::prelude::*;

        let conn = &mut self.conn;
        self.rt
            .block_on(conn.query_drop(sql))
            .map_err(|e| HdbError::Mysql(format!("{}: {}", sql, e)))
    }

    /// Execute a query and return the first column of the first row.
    ///
    /// `None` when no row matches or the value is SQL `NULL`.
    pub fn query_first_string(&mut self, sql: &str) -> Result<Option<String>, HdbError> {
        use mysql_async::prelude::*;

        let conn = &mut self.conn;
        let row: Option<Option<String>> = self
            .rt
            .block_on(conn.query_first(sql))
            .map_err(|e| HdbError::Mysql(format!("{}: {}", sql, e)))?;
        Ok(first_value(row))
    }

    /// Close the connection and the pool.
    pub fn disconnect(self) {
        let MysqlSession { rt, pool, conn } = self;
        rt.block_on(async {
            conn.disconnect().await.ok();
            pool.disconnect().await.ok();
        });
    }
}

#[cfg(feature = "mysql")]
impl SqlExecutor for MysqlSession {
    fn query_drop(&mut self, sql: &str) -> Result<(), HdbError> {
        MysqlSession::query_drop(self, sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_client_section() {
        let cnf = "\
[mysqld]
user = mysql

[client]
user = admin
password = \"s3cr3t\"
host=db.internal
port = 3307
socket = /run/mysqld/mysqld.sock
# database = ignored
";
        let config = parse_defaults(cnf);
        assert_eq!(config.user, "admin");
        assert_eq!(config.password.as_deref(), Some("s3cr3t"));
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.socket.as_deref(), Some("/run/mysqld/mysqld.sock"));
        assert_eq!(config.database, None);
    }

    #[test]
    fn test_parse_ignores_other_sections() {
        let config = parse_defaults("[mysqldump]\nuser = dumper\npassword = x\n");
        assert_eq!(config, MysqlConfig::default());
    }

    #[test]
    fn test_bad_port_keeps_default() {
        let config = parse_defaults("[client]\nport = abc\n");
        assert_eq!(config.port, 3306);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".my.cnf");
        fs::write(&path, "[client]\nuser=backup\npassword='pw'\n").unwrap();

        let config = MysqlConfig::load(Some(&path)).unwrap();
        assert_eq!(config.user, "backup");
        assert_eq!(config.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = MysqlConfig::load(Some(Path::new("/nonexistent/.my.cnf")));
        assert!(matches!(result, Err(HdbError::Argument(_))));
    }

    #[test]
    fn test_with_database_and_url() {
        let config = MysqlConfig::default().with_database("alice_blog");
        assert_eq!(config.database.as_deref(), Some("alice_blog"));
        assert_eq!(config.connection_url(), "mysql://root@localhost:3306/alice_blog");
    }

    #[test]
    fn test_null_value_is_none() {
        assert_eq!(first_value(None), None);
        assert_eq!(first_value(Some(None)), None);
        assert_eq!(first_value(Some(Some(String::new()))), Some(String::new()));
        assert_eq!(
            first_value(Some(Some("https://alice.example.com".to_string()))),
            Some("https://alice.example.com".to_string())
        );
    }

    #[test]
    fn test_localhost_uses_server_socket() {
        let dir = TempDir::new().unwrap();
        let sock = dir.path().join("mysqld.sock");
        fs::write(&sock, b"").unwrap();
        let missing = dir.path().join("absent.sock");
        let candidates = [missing.to_str().unwrap(), sock.to_str().unwrap()];

        let config = MysqlConfig::default();
        assert_eq!(
            config.resolved_socket(&candidates).as_deref(),
            sock.to_str()
        );
        assert_eq!(config.resolved_socket(&[missing.to_str().unwrap()]), None);
    }

    #[test]
    fn test_socket_only_for_localhost() {
        let dir = TempDir::new().unwrap();
        let sock = dir.path().join("mysqld.sock");
        fs::write(&sock, b"").unwrap();
        let candidates = [sock.to_str().unwrap()];

        let remote = parse_defaults("[client]\nhost = db.internal\n");
        assert_eq!(remote.resolved_socket(&candidates), None);

        let explicit = parse_defaults("[client]\nhost = db.internal\nsocket = /srv/my.sock\n");
        assert_eq!(
            explicit.resolved_socket(&candidates).as_deref(),
            Some("/srv/my.sock")
        );
    }

    #[test]
    fn test_safe_identifier() {
        assert!(is_safe_identifier("alice_blog"));
        assert!(is_safe_identifier("utf8mb4"));
        assert!(is_safe_identifier("wp$1"));
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("db; DROP TABLE x"));
        assert!(!is_safe_identifier("a`b"));
        assert!(!is_safe_identifier("my-db"));
    }
}
