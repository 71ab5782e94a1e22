use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a scan before it produces a report.
///
/// Everything recoverable during traversal is a
/// [`ScanWarning`](crate::models::ScanWarning) instead.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot open scan root {}: {source}", path.display())]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid name pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

impl ScanError {
    pub(crate) fn root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RootInaccessible {
            path: path.into(),
            source,
        }
    }
}
