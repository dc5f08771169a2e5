use std::path::{Path, PathBuf};

/// Resolve the watch directory.
///
/// Priority:
/// 1. `--dir` flag / `AUTOUPDATER_DIR` env var (passed in as `explicit`)
/// 2. The process's current working directory
/// 3. `.` if the working directory cannot be read
pub fn resolve_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_dir_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_dir(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn falls_back_to_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(resolve_dir(None), cwd);
    }
}
