use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    /// Devices, sockets and pipes.
    Other,
}

impl FileKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Regular => "file",
            Self::Directory => "dir",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }

    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

/// One observed filesystem entry with its classified metadata.
///
/// Timestamps are seconds since the Unix epoch (UTC). Directory sizes are
/// always 0; roll-ups belong to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(with = "super::path_serde")]
    path: PathBuf,
    size: u64,
    kind: FileKind,
    accessed: i64,
    modified: i64,
    depth: usize,
}

impl FileRecord {
    pub fn new(
        path: PathBuf,
        size: u64,
        kind: FileKind,
        accessed: i64,
        modified: i64,
        depth: usize,
    ) -> Self {
        let size = if kind.is_dir() { 0 } else { size };
        Self {
            path,
            size,
            kind,
            accessed,
            modified,
            depth,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn accessed(&self) -> i64 {
        self.accessed
    }

    pub fn modified(&self) -> i64 {
        self.modified
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Lowercased extension, if the entry is not a directory and has one.
    pub fn extension(&self) -> Option<String> {
        if self.is_dir() {
            return None;
        }
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.modified, 0)
    }
}
