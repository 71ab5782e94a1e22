//! Metadata classification: raw `lstat` metadata in, [`FileRecord`] out.
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::models::record::{FileKind, FileRecord};

/// Stable identity of a filesystem object, used for cycle detection.
///
/// Unix uses the (device, inode) pair. Elsewhere there is no portable
/// equivalent, so the identity is a hash of the canonical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileIdentity {
    pub device: u64,
    pub inode: u64,
}

pub fn classify(path: PathBuf, metadata: &Metadata, depth: usize) -> FileRecord {
    let kind = kind_of(metadata);
    let (accessed, modified) = timestamps(metadata);
    FileRecord::new(path, metadata.len(), kind, accessed, modified, depth)
}

pub fn kind_of(metadata: &Metadata) -> FileKind {
    let ft = metadata.file_type();
    if ft.is_symlink() {
        FileKind::Symlink
    } else if ft.is_dir() {
        FileKind::Directory
    } else if ft.is_file() {
        FileKind::Regular
    } else {
        FileKind::Other
    }
}

#[cfg(unix)]
pub fn identity(_path: &Path, metadata: &Metadata) -> FileIdentity {
    use std::os::unix::fs::MetadataExt;
    FileIdentity {
        device: metadata.dev(),
        inode: metadata.ino(),
    }
}

#[cfg(not(unix))]
pub fn identity(path: &Path, _metadata: &Metadata) -> FileIdentity {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    FileIdentity {
        device: 0,
        inode: hasher.finish(),
    }
}

#[cfg(unix)]
fn timestamps(metadata: &Metadata) -> (i64, i64) {
    use std::os::unix::fs::MetadataExt;
    (metadata.atime(), metadata.mtime())
}

#[cfg(not(unix))]
fn timestamps(metadata: &Metadata) -> (i64, i64) {
    (
        metadata.accessed().map(epoch_seconds).unwrap_or(0),
        metadata.modified().map(epoch_seconds).unwrap_or(0),
    )
}

/// Seconds since the epoch; negative before it.
pub fn epoch_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_secs())
            .map(|s| -s)
            .unwrap_or(i64::MIN),
    }
}
