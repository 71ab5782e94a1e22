//! Directory reads with an optional deadline.
//!
//! A directory's listing and every entry's metadata are fetched in one
//! batch. With a timeout configured the batch runs on a helper thread; if
//! the helper does not answer in time the walker abandons it and moves on.
//! The abandoned thread exits once its blocked syscall returns.
use std::ffi::OsString;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::debug;

/// One child of a directory, as read from disk.
pub(crate) struct DirEntryData {
    pub path: PathBuf,
    pub name: OsString,
    /// `lstat` result.
    pub metadata: io::Result<Metadata>,
    /// `stat` result for symlinks, only when links are being followed.
    pub target: Option<io::Result<Metadata>>,
}

pub(crate) struct DirListing {
    /// `stat` of the directory itself.
    pub metadata: Metadata,
    /// Sorted by name.
    pub entries: Vec<DirEntryData>,
    /// Failures while iterating the directory stream itself.
    pub errors: Vec<(PathBuf, io::Error)>,
}

/// Read all entries of `dir_path` and their metadata in one blocking call.
/// Fails only if the directory itself cannot be stat'ed or opened.
pub(crate) fn read_dir_batch(dir_path: &Path, resolve_links: bool) -> io::Result<DirListing> {
    let metadata = std::fs::metadata(dir_path)?;
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for entry_result in std::fs::read_dir(dir_path)? {
        match entry_result {
            Ok(entry) => {
                let path = entry.path();
                let metadata = std::fs::symlink_metadata(&path);
                let target = match &metadata {
                    Ok(m) if resolve_links && m.file_type().is_symlink() => {
                        Some(std::fs::metadata(&path))
                    }
                    _ => None,
                };
                entries.push(DirEntryData {
                    name: entry.file_name(),
                    path,
                    metadata,
                    target,
                });
            }
            Err(e) => errors.push((dir_path.to_path_buf(), e)),
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(DirListing {
        metadata,
        entries,
        errors,
    })
}

pub(crate) type ReadFn = Arc<dyn Fn(&Path, bool) -> io::Result<DirListing> + Send + Sync>;

struct Worker {
    requests: Sender<PathBuf>,
    replies: Receiver<io::Result<DirListing>>,
}

pub(crate) struct DirReader {
    timeout: Option<Duration>,
    resolve_links: bool,
    read_fn: ReadFn,
    worker: Option<Worker>,
}

impl DirReader {
    pub fn new(timeout: Option<Duration>, resolve_links: bool) -> Self {
        Self::with_read_fn(timeout, resolve_links, Arc::new(read_dir_batch))
    }

    pub(crate) fn with_read_fn(timeout: Option<Duration>, resolve_links: bool, read_fn: ReadFn) -> Self {
        Self {
            timeout,
            resolve_links,
            read_fn,
            worker: None,
        }
    }

    /// Read `dir`. A missed deadline surfaces as `ErrorKind::TimedOut`.
    pub fn read(&mut self, dir: &Path) -> io::Result<DirListing> {
        let Some(timeout) = self.timeout else {
            return (self.read_fn)(dir, self.resolve_links);
        };

        let worker = match self.worker.take() {
            Some(w) => w,
            None => self.spawn_worker()?,
        };

        if worker.requests.send(dir.to_path_buf()).is_err() {
            return Err(io::Error::other("directory reader thread exited"));
        }

        match worker.replies.recv_timeout(timeout) {
            Ok(result) => {
                self.worker = Some(worker);
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                debug!("abandoning reader for {} after {:?}", dir.display(), timeout);
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no response within {} ms", timeout.as_millis()),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(io::Error::other("directory reader thread exited"))
            }
        }
    }

    fn spawn_worker(&self) -> io::Result<Worker> {
        let (req_tx, req_rx) = crossbeam_channel::bounded::<PathBuf>(1);
        let (rep_tx, rep_rx) = crossbeam_channel::bounded::<io::Result<DirListing>>(1);
        let read_fn = Arc::clone(&self.read_fn);
        let resolve_links = self.resolve_links;

        std::thread::Builder::new()
            .name("dirscope-io".into())
            .spawn(move || {
                for path in req_rx {
                    if rep_tx.send(read_fn(&path, resolve_links)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Worker {
            requests: req_tx,
            replies: rep_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_sorted_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }
        let listing = read_dir_batch(tmp.path(), false).unwrap();
        let names: Vec<_> = listing.entries.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(listing.errors.is_empty());
        assert!(listing.entries.iter().all(|e| e.target.is_none()));
        assert!(listing.metadata.is_dir());
    }

    #[test]
    fn missing_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_dir_batch(&tmp.path().join("nope"), false).is_err());
    }

    #[test]
    fn timed_reader_returns_listing() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("f"), b"x").unwrap();
        let mut reader = DirReader::new(Some(Duration::from_secs(10)), false);
        assert_eq!(reader.read(tmp.path()).unwrap().entries.len(), 1);
        // The helper thread is reused for the next read.
        assert_eq!(reader.read(tmp.path()).unwrap().entries.len(), 1);
    }

    #[test]
    fn slow_read_times_out_and_reader_recovers() {
        let slow: ReadFn = Arc::new(|path: &Path, resolve: bool| {
            if path.ends_with("stuck") {
                std::thread::sleep(Duration::from_millis(500));
            }
            read_dir_batch(path.parent().unwrap_or(path), resolve)
        });
        let tmp = tempfile::tempdir().unwrap();
        let mut reader = DirReader::with_read_fn(Some(Duration::from_millis(20)), false, slow);

        let err = reader.read(&tmp.path().join("stuck")).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        // A fresh helper serves the next request.
        assert!(reader.read(&tmp.path().join("fine")).is_ok());
    }
}
