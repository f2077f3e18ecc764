//! External MySQL tool invocation.
//!
//! The rebuild relies on three programs: `mysqlfrm` (from MySQL Utilities)
//! to recover `CREATE TABLE` statements from `.frm` files, the `mysql`
//! client to load them, and `mysqldump` to export the rebuilt database.
//! Commands are built here and executed through [`run`], which captures
//! output and exit status without interpreting them; [`ToolRun::check`]
//! turns a failing status into [`HdbError::Command`].

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::HdbError;

/// Locations of the external programs.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub mysqlfrm: PathBuf,
    pub mysql: PathBuf,
    pub mysqldump: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        ToolPaths {
            mysqlfrm: PathBuf::from("mysqlfrm"),
            mysql: PathBuf::from("/usr/bin/mysql"),
            mysqldump: PathBuf::from("/usr/bin/mysqldump"),
        }
    }
}

/// Outcome of a finished external command.
#[derive(Debug)]
pub struct ToolRun {
    /// Display form of the command line.
    pub command: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolRun {
    /// Exit code, `None` if the process was killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Fail with [`HdbError::Command`] unless the command exited successfully.
    pub fn check(self) -> Result<Self, HdbError> {
        if self.status.success() {
            return Ok(self);
        }
        let status = match self.exit_code() {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            Err(HdbError::Command(format!("{} ({})", self.command, status)))
        } else {
            Err(HdbError::Command(format!(
                "{} ({}): {}",
                self.command, status, stderr
            )))
        }
    }
}

/// Render a command the way a shell user would type it.
pub fn command_line(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().to_string();
    for arg in cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// `mysqlfrm --diagnostic <frm>`
pub fn mysqlfrm_command(tools: &ToolPaths, frm: &Path) -> Command {
    let mut cmd = Command::new(&tools.mysqlfrm);
    cmd.arg("--diagnostic").arg(frm);
    cmd
}

/// `mysql --defaults-file=<f> < <sql>`
///
/// The SQL file is opened here and attached as the child's stdin.
pub fn mysql_import_command(
    tools: &ToolPaths,
    defaults_file: &Path,
    sql: &Path,
) -> Result<Command, HdbError> {
    let input = File::open(sql)
        .map_err(|e| HdbError::Io(format!("Cannot open {}: {}", sql.display(), e)))?;

    let mut cmd = Command::new(&tools.mysql);
    cmd.arg(format!("--defaults-file={}", defaults_file.display()))
        .stdin(Stdio::from(input));
    Ok(cmd)
}

/// Arguments of the final `mysqldump` export.
pub fn mysqldump_args(
    defaults_file: &Path,
    charset: &str,
    db: &str,
    result_file: &Path,
) -> Vec<String> {
    vec![
        format!("--defaults-file={}", defaults_file.display()),
        format!("--default-character-set={}", charset),
        "--databases".to_string(),
        db.to_string(),
        "--skip-comments".to_string(),
        format!("--result-file={}", result_file.display()),
    ]
}

/// `mysqldump <args>`
pub fn mysqldump_command(tools: &ToolPaths, args: &[String]) -> Command {
    let mut cmd = Command::new(&tools.mysqldump);
    cmd.args(args);
    cmd
}

/// Run `cmd` to completion, capturing stdout and stderr.
pub fn run(cmd: &mut Command) -> Result<ToolRun, HdbError> {
    let command = command_line(cmd);
    let output = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| HdbError::Command(format!("Cannot run {}: {}", command, e)))?;

    Ok(ToolRun {
        command,
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
