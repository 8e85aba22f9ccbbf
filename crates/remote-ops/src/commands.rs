//! Shell command templates.
//!
//! Every value placed on a command line goes through [`quote`]. Values that
//! can never be quoted safely (empty, NUL, newline) or that a command would
//! parse as an option (leading `-`) are rejected up front.

use crate::error::OpsError;

/// POSIX single-quotes `value`.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// Rejects values that must not reach a command line.
pub fn validate(value: &str) -> Result<(), OpsError> {
    let unquotable = value.contains(['\0', '\n', '\r']);
    if value.trim().is_empty() || unquotable || value.starts_with('-') {
        return Err(OpsError::InvalidPath(value.to_string()));
    }
    Ok(())
}

/// Joins a remote directory and an entry name with exactly one `/`.
pub fn join_remote(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{dir}/{name}")
}

/// Single-column directory listing.
pub fn list(dir: &str) -> Result<String, OpsError> {
    validate(dir)?;
    Ok(format!("ls -1 {}", quote(dir)))
}

/// Creates `dest_dir`, then resumes (or starts) fetching `url` into
/// `dest_dir/file_name`.
pub fn fetch(url: &str, dest_dir: &str, file_name: &str) -> Result<String, OpsError> {
    validate(url)?;
    validate(dest_dir)?;
    validate(file_name)?;
    let dest = join_remote(dest_dir, file_name);
    Ok(format!(
        "mkdir -p {} && wget -c {} -O {}",
        quote(dest_dir),
        quote(url),
        quote(&dest)
    ))
}

/// Forced removal of a file or directory tree.
pub fn remove(path: &str) -> Result<String, OpsError> {
    validate(path)?;
    if path.trim_end_matches('/').is_empty() {
        return Err(OpsError::InvalidPath(path.to_string()));
    }
    Ok(format!("rm -rf {}", quote(path)))
}

pub fn make_dir(dir: &str) -> Result<String, OpsError> {
    validate(dir)?;
    Ok(format!("mkdir -p {}", quote(dir)))
}

/// Expands `archive` into `dest_dir`, overwriting existing files.
pub fn unzip(archive: &str, dest_dir: &str) -> Result<String, OpsError> {
    validate(archive)?;
    validate(dest_dir)?;
    Ok(format!("unzip -o {} -d {}", quote(archive), quote(dest_dir)))
}

/// Existence test: exits 0 iff `path` exists.
pub fn exists(path: &str) -> Result<String, OpsError> {
    validate(path)?;
    Ok(format!("[ -e {} ]", quote(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_plain_and_embedded_quotes() {
        assert_eq!(quote("/data/zips"), "'/data/zips'");
        assert_eq!(quote("it's.zip"), "'it'\\''s.zip'");
        assert_eq!(quote("$(reboot)"), "'$(reboot)'");
    }

    #[test]
    fn join_normalizes_slashes() {
        assert_eq!(join_remote("/data/zips/", "a.zip"), "/data/zips/a.zip");
        assert_eq!(join_remote("/data/zips", "a.zip"), "/data/zips/a.zip");
        assert_eq!(join_remote("/", "a.zip"), "/a.zip");
    }

    #[test]
    fn command_templates() {
        assert_eq!(list("/z").unwrap(), "ls -1 '/z'");
        assert_eq!(
            fetch("https://archive.org/download/x/a.zip", "/z", "a.zip").unwrap(),
            "mkdir -p '/z' && wget -c 'https://archive.org/download/x/a.zip' -O '/z/a.zip'"
        );
        assert_eq!(remove("/g/mario").unwrap(), "rm -rf '/g/mario'");
        assert_eq!(make_dir("/g").unwrap(), "mkdir -p '/g'");
        assert_eq!(unzip("/z/a.zip", "/g").unwrap(), "unzip -o '/z/a.zip' -d '/g'");
        assert_eq!(exists("/g/mario").unwrap(), "[ -e '/g/mario' ]");
    }

    #[test]
    fn hostile_names_stay_inside_quotes() {
        let cmd = remove("/g/x'; rm -rf ~; echo '").unwrap();
        assert_eq!(cmd, "rm -rf '/g/x'\\''; rm -rf ~; echo '\\'''");
    }

    #[test]
    fn rejects_unquotable_values() {
        assert!(matches!(list(""), Err(OpsError::InvalidPath(_))));
        assert!(matches!(exists("/a\nb"), Err(OpsError::InvalidPath(_))));
        assert!(matches!(fetch("u", "/z", "a\0.zip"), Err(OpsError::InvalidPath(_))));
    }

    #[test]
    fn rejects_values_read_as_options() {
        assert!(matches!(remove("-rf"), Err(OpsError::InvalidPath(_))));
        assert!(matches!(list("--help"), Err(OpsError::InvalidPath(_))));
        assert!(matches!(unzip("-x.zip", "/g"), Err(OpsError::InvalidPath(_))));
        assert!(matches!(fetch("u", "-O", "a.zip"), Err(OpsError::InvalidPath(_))));
        // A dash inside a value is fine.
        assert_eq!(remove("/g/x-men").unwrap(), "rm -rf '/g/x-men'");
    }

    #[test]
    fn refuses_to_remove_root() {
        assert!(matches!(remove("/"), Err(OpsError::InvalidPath(_))));
        assert!(matches!(remove("///"), Err(OpsError::InvalidPath(_))));
    }
}
