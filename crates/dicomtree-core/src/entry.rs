//! Filesystem entry types produced by the directory walker.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::path::{extension, file_name, normalize_path};

/// A directory discovered during a walk.
///
/// Directories are reported, not recursed into; the caller decides when
/// to list their children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Base name of the directory.
    pub name: CompactString,
    /// Canonical forward-slash path.
    pub path: String,
}

impl DirEntry {
    /// Create a directory entry from a filesystem path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = normalize_path(path);
        Self {
            name: file_name(&path).into(),
            path,
        }
    }
}

/// A regular file discovered during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Base name of the file.
    pub name: CompactString,
    /// Canonical forward-slash path.
    pub path: String,
    /// Lowercased extension including the leading dot, or empty.
    #[serde(rename = "type")]
    pub extension: CompactString,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: DateTime<Utc>,
}

impl FileEntry {
    /// Create a file entry from a path and its size/modification time.
    pub fn new(path: impl AsRef<Path>, size: u64, modified: SystemTime) -> Self {
        let path = normalize_path(path);
        let name = file_name(&path);
        Self {
            extension: extension(&name).into(),
            name: name.into(),
            path,
            size,
            mtime: DateTime::<Utc>::from(modified),
        }
    }

    /// Check whether the extension is one of `extensions` (compared lowercased).
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        extensions.iter().any(|ext| self.extension == *ext)
    }
}
