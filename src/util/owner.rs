//! File ownership helpers.
//!
//! Tablespaces copied into the MySQL data directory must belong to the
//! server's user and group. Names are resolved from `/etc/passwd` and
//! `/etc/group` formatted files.

use std::path::Path;

use crate::HdbError;

/// Default account database.
pub const PASSWD_FILE: &str = "/etc/passwd";
/// Default group database.
pub const GROUP_FILE: &str = "/etc/group";

/// Resolve a user name (or numeric uid) to a uid using a passwd-format file.
pub fn lookup_uid(name: &str, passwd: &Path) -> Result<u32, HdbError> {
    lookup_id(name, passwd, "user")
}

/// Resolve a group name (or numeric gid) to a gid using a group-format file.
pub fn lookup_gid(name: &str, group: &Path) -> Result<u32, HdbError> {
    lookup_id(name, group, "group")
}

fn lookup_id(name: &str, db: &Path, kind: &str) -> Result<u32, HdbError> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(id);
    }

    let content = std::fs::read_to_string(db)
        .map_err(|e| HdbError::Io(format!("Cannot read {}: {}", db.display(), e)))?;

    find_id(&content, name).ok_or_else(|| {
        HdbError::Argument(format!("Unknown {} '{}' in {}", kind, name, db.display()))
    })
}

/// Find the id (third field) of the entry called `name` in passwd/group text.
fn find_id(content: &str, name: &str) -> Option<u32> {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .find_map(|line| {
            let mut fields = line.split(':');
            if fields.next()? != name {
                return None;
            }
            fields.nth(1)?.trim().parse().ok()
        })
}

/// Change the owner and group of `path`.
pub fn chown_path(path: &Path, uid: u32, gid: u32) -> Result<(), HdbError> {
    std::os::unix::fs::chown(path, Some(uid), Some(gid)).map_err(|e| {
        HdbError::Io(format!(
            "Cannot chown {} to {}:{}: {}",
            path.display(),
            uid,
            gid,
            e
        ))
    })
}
