use crate::error::{Result, UpdateError};
use regex::Regex;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "autoupdater.yaml";

pub const DEFAULT_PREFIX: &str = "update_";
pub const DEFAULT_SERVICE: &str = "web-portal";
pub const DEFAULT_SERVICE_MANAGER: &str = "systemctl";
pub const DEFAULT_INSTALL_PATH: &str = "../bin/web-portal";
pub const DEFAULT_SHELL: &str = "sh";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Resolve the install path the way the shell would from inside `dir`.
pub fn resolve_install_path(dir: &Path, install_path: &str) -> PathBuf {
    let p = Path::new(install_path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        dir.join(p)
    }
}

// ---------------------------------------------------------------------------
// Entry names
// ---------------------------------------------------------------------------

/// Raw bytes of a directory entry name. Names are not required to be UTF-8.
#[cfg(unix)]
pub fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_bytes())
}

#[cfg(not(unix))]
pub fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(unix)]
pub fn name_from_bytes(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

#[cfg(not(unix))]
pub fn name_from_bytes(bytes: Vec<u8>) -> OsString {
    String::from_utf8_lossy(&bytes).into_owned().into()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

static UNIT_RE: OnceLock<Regex> = OnceLock::new();

fn unit_re() -> &'static Regex {
    UNIT_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9:_.@-]+$").unwrap())
}

/// Accept names made of the characters systemd allows in unit names.
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 255 || !unit_re().is_match(name) {
        return Err(UpdateError::InvalidServiceName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_service_names() {
        assert!(validate_service_name("web-portal").is_ok());
        assert!(validate_service_name("web-portal.service").is_ok());
        assert!(validate_service_name("worker@2").is_ok());
    }

    #[test]
    fn invalid_service_names() {
        assert!(validate_service_name("").is_err());
        assert!(validate_service_name("web portal").is_err());
        assert!(validate_service_name("web;reboot").is_err());
        assert!(validate_service_name("web\\portal").is_err());
        assert!(validate_service_name(&"a".repeat(256)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn name_bytes_keep_non_utf8() {
        use std::os::unix::ffi::OsStrExt;
        let name = OsStr::from_bytes(b"update_v\xff");
        assert_eq!(&*name_bytes(name), b"update_v\xff");
        assert_eq!(name_from_bytes(b"update_v\xff".to_vec()).as_os_str(), name);
    }

    #[test]
    fn relative_install_path_resolves_against_dir() {
        let resolved = resolve_install_path(Path::new("/srv/updates"), "../bin/web-portal");
        assert_eq!(resolved, PathBuf::from("/srv/updates/../bin/web-portal"));
    }

    #[test]
    fn absolute_install_path_is_kept() {
        let resolved = resolve_install_path(Path::new("/srv/updates"), "/opt/web-portal");
        assert_eq!(resolved, PathBuf::from("/opt/web-portal"));
    }
}
