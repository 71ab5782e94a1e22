//! Lazy depth-first traversal.
//!
//! [`Walker`] yields one [`WalkEvent`] per call: a record, a warning, or the
//! final cancellation marker. It keeps an explicit stack of open
//! directories instead of recursing, and tracks the identities of the
//! directories on the current path so a link back to an ancestor is
//! reported once and skipped.
//!
//! Order is pre-order (a directory's record comes before its children) and
//! children are visited in byte-wise name order.
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::error::ScanError;
use crate::models::record::FileRecord;
use crate::models::scan_result::{ScanWarning, WarningKind};

use super::cancel::CancellationToken;
use super::classifier::{self, FileIdentity};
use super::dir_reader::{DirEntryData, DirListing, DirReader};
use super::filter::ScanFilter;

/// Entries processed between cancellation checks inside one directory.
pub(crate) const CANCEL_CHECK_INTERVAL: usize = 1024;

pub(crate) type Ancestors = SmallVec<[FileIdentity; 16]>;

#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub follow_symlinks: bool,
    /// Deepest entry depth emitted; the root's children are at depth 1.
    pub max_depth: Option<usize>,
    pub io_timeout: Option<Duration>,
}

impl From<&Settings> for WalkOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            follow_symlinks: settings.follow_symlinks,
            max_depth: settings.max_depth,
            io_timeout: settings.io_timeout,
        }
    }
}

impl WalkOptions {
    pub(crate) fn may_descend_from(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    Record(FileRecord),
    Warning(ScanWarning),
    /// Emitted once, last, when the cancellation token fired mid-walk.
    Cancelled,
}

/// A directory that passed cycle, depth and prune checks and will be read.
#[derive(Debug, Clone)]
pub(crate) struct PendingDir {
    pub path: PathBuf,
    pub identity: FileIdentity,
    /// Depth of the directory itself.
    pub depth: usize,
}

/// Outcome of looking at one directory entry.
pub(crate) enum Visit {
    Emit(FileRecord, Option<PendingDir>),
    Skip(Option<PendingDir>),
    Warn(ScanWarning),
}

/// Classify, cycle-check and filter one entry found at `depth`.
pub(crate) fn evaluate_entry(
    entry: DirEntryData,
    depth: usize,
    ancestors: &[FileIdentity],
    filter: &ScanFilter,
    options: &WalkOptions,
) -> Visit {
    let DirEntryData {
        path,
        metadata,
        target,
        ..
    } = entry;

    let metadata = match metadata {
        Ok(m) => m,
        Err(e) => return Visit::Warn(ScanWarning::from_io(path, &e)),
    };

    let descend_meta = if metadata.is_dir() {
        Some(&metadata)
    } else if metadata.file_type().is_symlink() && options.follow_symlinks {
        match &target {
            Some(Ok(t)) if t.is_dir() => Some(t),
            Some(Ok(_)) | None => None,
            Some(Err(e)) => {
                return Visit::Warn(ScanWarning::new(
                    path,
                    WarningKind::EntryInaccessible,
                    format!("broken symlink: {e}"),
                ))
            }
        }
    } else {
        None
    };

    let identity = descend_meta.map(|m| classifier::identity(&path, m));
    if let Some(id) = identity {
        if ancestors.contains(&id) {
            return Visit::Warn(ScanWarning::new(
                path,
                WarningKind::SymlinkCycleDetected,
                "links back to a directory on the current path",
            ));
        }
    }

    let record = classifier::classify(path, &metadata, depth);
    let pending = identity
        .filter(|_| options.may_descend_from(depth) && !filter.prunes(&record))
        .map(|identity| PendingDir {
            path: record.path().to_path_buf(),
            identity,
            depth,
        });

    if filter.matches(&record) {
        Visit::Emit(record, pending)
    } else {
        Visit::Skip(pending)
    }
}

/// Read the scan root. Any failure here is fatal for the scan.
pub(crate) fn open_root(
    root: &Path,
    reader: &mut DirReader,
) -> Result<(FileIdentity, DirListing), ScanError> {
    let listing = reader.read(root).map_err(|e| ScanError::root(root, e))?;
    if !listing.metadata.is_dir() {
        return Err(ScanError::root(root, io::Error::other("not a directory")));
    }
    Ok((classifier::identity(root, &listing.metadata), listing))
}

struct Frame {
    entries: std::vec::IntoIter<DirEntryData>,
    /// Depth of the entries in this frame.
    depth: usize,
    visited: usize,
}

pub struct Walker {
    filter: Arc<ScanFilter>,
    options: WalkOptions,
    cancel: CancellationToken,
    reader: DirReader,
    stack: Vec<Frame>,
    /// `ancestors[i]` is the directory whose children are in `stack[i]`,
    /// preceded by any ancestors above the walk's starting point.
    ancestors: Ancestors,
    pending_dir: Option<PendingDir>,
    queued: VecDeque<WalkEvent>,
    finished: bool,
}

impl Walker {
    /// Start a walk at `root`. The root is read immediately; the root
    /// itself is never emitted.
    pub fn new(
        root: impl AsRef<Path>,
        filter: Arc<ScanFilter>,
        options: WalkOptions,
        cancel: CancellationToken,
    ) -> Result<Self, ScanError> {
        let reader = DirReader::new(options.io_timeout, options.follow_symlinks);
        Self::with_reader(root, filter, options, cancel, reader)
    }

    /// Like [`Walker::new`], reading directories through `reader`.
    pub(crate) fn with_reader(
        root: impl AsRef<Path>,
        filter: Arc<ScanFilter>,
        options: WalkOptions,
        cancel: CancellationToken,
        mut reader: DirReader,
    ) -> Result<Self, ScanError> {
        let root = root.as_ref();
        let (identity, listing) = open_root(root, &mut reader)?;
        debug!("walking {}", root.display());

        let mut walker = Self::empty(filter, options, cancel, reader, Ancestors::new());
        if walker.options.may_descend_from(0) {
            walker.push_listing(listing, identity, 1);
        }
        Ok(walker)
    }

    /// Walk below an already-emitted directory. `ancestors` holds the
    /// identities above `dir`, outermost first.
    pub(crate) fn subtree(
        dir: PendingDir,
        ancestors: &[FileIdentity],
        filter: Arc<ScanFilter>,
        options: WalkOptions,
        cancel: CancellationToken,
    ) -> Self {
        let reader = DirReader::new(options.io_timeout, options.follow_symlinks);
        let mut walker = Self::empty(
            filter,
            options,
            cancel,
            reader,
            Ancestors::from_slice(ancestors),
        );
        walker.pending_dir = Some(dir);
        walker
    }

    fn empty(
        filter: Arc<ScanFilter>,
        options: WalkOptions,
        cancel: CancellationToken,
        reader: DirReader,
        ancestors: Ancestors,
    ) -> Self {
        Self {
            filter,
            options,
            cancel,
            reader,
            stack: Vec::new(),
            ancestors,
            pending_dir: None,
            queued: VecDeque::new(),
            finished: false,
        }
    }

    /// Only the records, dropping warnings.
    pub fn records(self) -> impl Iterator<Item = FileRecord> {
        self.filter_map(|event| match event {
            WalkEvent::Record(r) => Some(r),
            _ => None,
        })
    }

    fn push_listing(&mut self, listing: DirListing, identity: FileIdentity, depth: usize) {
        for (path, err) in listing.errors {
            self.queue_warning(ScanWarning::from_io(path, &err));
        }
        self.stack.push(Frame {
            entries: listing.entries.into_iter(),
            depth,
            visited: 0,
        });
        self.ancestors.push(identity);
    }

    fn open(&mut self, dir: PendingDir) {
        if self.cancel.is_cancelled() {
            self.stop();
            return;
        }
        match self.reader.read(&dir.path) {
            Ok(listing) => self.push_listing(listing, dir.identity, dir.depth + 1),
            Err(e) => self.queue_warning(ScanWarning::from_io(dir.path, &e)),
        }
    }

    fn queue_warning(&mut self, warning: ScanWarning) {
        warn!("{warning}");
        self.queued.push_back(WalkEvent::Warning(warning));
    }

    fn stop(&mut self) {
        debug!("walk cancelled with {} open directories", self.stack.len());
        self.stack.clear();
        self.pending_dir = None;
        self.queued.push_back(WalkEvent::Cancelled);
        self.finished = true;
    }
}

impl Iterator for Walker {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }
            if let Some(dir) = self.pending_dir.take() {
                self.open(dir);
                continue;
            }

            let Some(frame) = self.stack.last_mut() else {
                self.finished = true;
                return None;
            };

            let check = frame.visited % CANCEL_CHECK_INTERVAL == 0;
            frame.visited += 1;
            let depth = frame.depth;
            let next_entry = frame.entries.next();

            if check && self.cancel.is_cancelled() {
                self.stop();
                continue;
            }

            let Some(entry) = next_entry else {
                self.stack.pop();
                self.ancestors.pop();
                continue;
            };

            match evaluate_entry(entry, depth, &self.ancestors, &self.filter, &self.options) {
                Visit::Emit(record, pending) => {
                    self.pending_dir = pending;
                    return Some(WalkEvent::Record(record));
                }
                Visit::Skip(pending) => self.pending_dir = pending,
                Visit::Warn(warning) => self.queue_warning(warning),
            }
        }
    }
}
