use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::record::FileRecord;
use super::statistics::ScanStatistics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(with = "super::path_serde")]
    pub scan_path: PathBuf,
    /// Filtered records in traversal order. Empty when the scan ran with
    /// `keep_records` disabled.
    pub records: Vec<FileRecord>,
    pub statistics: ScanStatistics,
    pub warnings: Vec<ScanWarning>,
    /// The scan stopped early; `statistics` cover what was visited.
    pub cancelled: bool,
    pub scan_duration: Duration,
    pub timestamp: SystemTime,
}

impl ScanReport {
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &ScanWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

/// A recoverable problem: the entry was skipped and the scan went on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    #[serde(with = "super::path_serde")]
    pub path: PathBuf,
    pub kind: WarningKind,
    pub message: String,
}

impl ScanWarning {
    pub fn new(path: PathBuf, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_io(path: PathBuf, err: &std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::TimedOut {
            WarningKind::Timeout
        } else {
            WarningKind::EntryInaccessible
        };
        Self::new(path, kind, err.to_string())
    }
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.kind, self.path.display(), self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    EntryInaccessible,
    SymlinkCycleDetected,
    Timeout,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EntryInaccessible => "entry inaccessible",
            Self::SymlinkCycleDetected => "symlink cycle",
            Self::Timeout => "timed out",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn io_errors_map_to_warning_kinds() {
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "no response within 50 ms");
        let w = ScanWarning::from_io(PathBuf::from("/r/slow"), &timed_out);
        assert_eq!(w.kind, WarningKind::Timeout);
        assert_eq!(w.message, "no response within 50 ms");

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let w = ScanWarning::from_io(PathBuf::from("/r/locked"), &denied);
        assert_eq!(w.kind, WarningKind::EntryInaccessible);
        assert_eq!(w.to_string(), format!("entry inaccessible: /r/locked ({denied})"));
    }
}
