use crate::error::Result;
use crate::paths::name_bytes;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::ffi::{OsStr, OsString};
use std::fs::FileType;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

impl EntryKind {
    fn from_file_type(ft: FileType) -> Self {
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "other",
        }
    }
}

/// A directory entry that looks like a new build.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Entry name as listed, relative to the watch directory. Reports show it
    /// lossily when it is not UTF-8.
    #[serde(serialize_with = "serialize_lossy")]
    pub name: OsString,
    pub path: PathBuf,
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

fn serialize_lossy<S: Serializer>(
    name: &OsString,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&name.to_string_lossy())
}

/// Byte-wise prefix match; whatever follows the prefix is unconstrained.
pub fn is_candidate(name: &OsStr, prefix: &str) -> bool {
    name_bytes(name).starts_with(prefix.as_bytes())
}

/// List the entries of `dir` whose name starts with `prefix`.
///
/// Results keep the order `read_dir` yields them in; nothing is sorted and
/// directories are not filtered out. A failure to list `dir` itself is
/// returned to the caller.
pub fn scan_candidates(dir: &Path, prefix: &str) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if !is_candidate(&name, prefix) {
            continue;
        }
        // The entry may vanish between listing and stat; keep it anyway.
        let kind = entry
            .file_type()
            .map(EntryKind::from_file_type)
            .unwrap_or(EntryKind::Other);
        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);
        candidates.push(Candidate {
            name,
            path: entry.path(),
            kind,
            modified,
        });
    }
    Ok(candidates)
}
