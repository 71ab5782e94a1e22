use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::settings::Settings;
use crate::error::ScanError;
use crate::models::record::FileRecord;
use crate::models::scan_result::{ScanReport, ScanWarning, WarningKind};
use crate::models::statistics::ScanStatistics;

use super::aggregator::Aggregator;
use super::cancel::CancellationToken;
use super::classifier::{self, FileIdentity};
use super::dir_reader::DirReader;
use super::events::{Event, EventSender};
use super::filter::ScanFilter;
use super::progress::ProgressTracker;
use super::walker::{self, PendingDir, Visit, WalkEvent, WalkOptions, Walker, CANCEL_CHECK_INTERVAL};

/// Runs scans with one worker per child directory of the root, bounded by
/// `max_concurrent_io`.
pub struct Scanner {
    semaphore: Arc<Semaphore>,
    event_tx: EventSender,
    progress: Arc<ProgressTracker>,
    settings: Arc<Settings>,
}

/// What one worker hands back for its subtree.
struct SubtreeOutcome {
    records: Vec<FileRecord>,
    stats: ScanStatistics,
    warnings: Vec<ScanWarning>,
    cancelled: bool,
}

/// A piece of the root's listing, kept in name order until assembly.
enum Segment {
    Record(FileRecord),
    Warning(ScanWarning),
    Subtree(PathBuf, JoinHandle<SubtreeOutcome>),
}

impl Scanner {
    pub fn new(settings: Settings, event_tx: EventSender) -> Self {
        let max_io = settings.max_concurrent_io.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_io)),
            event_tx,
            progress: Arc::new(ProgressTracker::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Scan `root`. Records, statistics and warnings come out identical to
    /// [`scan_blocking`] on the same tree.
    pub async fn scan(
        &self,
        root: impl Into<PathBuf>,
        filter: &ScanFilter,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        let root = root.into();
        let started = Instant::now();
        let reference_time = classifier::epoch_seconds(SystemTime::now());
        let options = WalkOptions::from(&*self.settings);
        let filter = Arc::new(filter.clone());

        info!("scanning {} with {} workers", root.display(), self.settings.max_concurrent_io);
        let _ = self.event_tx.send(Event::ScanStarted { path: root.clone() });

        let (root_id, listing) = {
            let _permit = self.semaphore.acquire().await.ok();
            let path = root.clone();
            let timeout = options.io_timeout;
            let follow = options.follow_symlinks;
            tokio::task::spawn_blocking(move || {
                let mut reader = DirReader::new(timeout, follow);
                walker::open_root(&path, &mut reader)
            })
            .await
            .map_err(|e| ScanError::root(&root, std::io::Error::other(e.to_string())))??
        };

        let mut segments = Vec::new();
        let mut cancelled = false;

        for (path, err) in listing.errors {
            segments.push(Segment::Warning(ScanWarning::from_io(path, &err)));
        }

        if options.may_descend_from(0) {
            for (index, entry) in listing.entries.into_iter().enumerate() {
                if index % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                match walker::evaluate_entry(entry, 1, &[root_id], &filter, &options) {
                    Visit::Emit(record, pending) => {
                        segments.push(Segment::Record(record));
                        if let Some(dir) = pending {
                            segments.push(self.spawn_subtree(dir, root_id, &filter, &options, cancel, reference_time).await);
                        }
                    }
                    Visit::Skip(Some(dir)) => {
                        segments.push(self.spawn_subtree(dir, root_id, &filter, &options, cancel, reference_time).await);
                    }
                    Visit::Skip(None) => {}
                    Visit::Warn(warning) => segments.push(Segment::Warning(warning)),
                }
            }
        }

        let mut aggregator = Aggregator::new(
            reference_time,
            self.settings.top_files,
            self.settings.keep_records,
        );
        let mut warnings = Vec::new();

        for segment in segments {
            match segment {
                Segment::Record(record) => {
                    self.progress.record(&record);
                    aggregator.consume(record);
                }
                Segment::Warning(warning) => {
                    warn!("{warning}");
                    self.publish_warning(&warning);
                    warnings.push(warning);
                }
                Segment::Subtree(path, handle) => match handle.await {
                    Ok(outcome) => {
                        aggregator.absorb(outcome.records, &outcome.stats);
                        warnings.extend(outcome.warnings);
                        cancelled |= outcome.cancelled;
                    }
                    Err(e) => {
                        let warning = ScanWarning::new(
                            path,
                            WarningKind::EntryInaccessible,
                            format!("worker failed: {e}"),
                        );
                        warn!("{warning}");
                        self.publish_warning(&warning);
                        warnings.push(warning);
                    }
                },
            }
        }

        let (records, statistics) = aggregator.finish();
        let report = ScanReport {
            scan_path: root,
            records,
            statistics,
            warnings,
            cancelled,
            scan_duration: started.elapsed(),
            timestamp: SystemTime::now(),
        };

        info!(
            "scan of {} finished: {} files, {} dirs, {} warnings{}",
            report.scan_path.display(),
            report.statistics.file_count,
            report.statistics.dir_count,
            report.warnings.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        let _ = self.event_tx.send(Event::ScanCompleted {
            total_files: report.statistics.file_count,
            total_size: report.statistics.total_bytes,
            duration_ms: report.scan_duration.as_millis() as u64,
            cancelled: report.cancelled,
        });

        Ok(report)
    }

    /// Wait for a worker slot, then walk `dir` on the blocking pool. The
    /// slot is held until the walk ends.
    async fn spawn_subtree(
        &self,
        dir: PendingDir,
        root_id: FileIdentity,
        filter: &Arc<ScanFilter>,
        options: &WalkOptions,
        cancel: &CancellationToken,
        reference_time: i64,
    ) -> Segment {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok();
        let path = dir.path.clone();
        let filter = Arc::clone(filter);
        let options = options.clone();
        let cancel = cancel.clone();
        let progress = Arc::clone(&self.progress);
        let event_tx = self.event_tx.clone();
        let top_files = self.settings.top_files;
        let keep_records = self.settings.keep_records;

        debug!("dispatching {}", path.display());
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let walker = Walker::subtree(dir, &[root_id], filter, options, cancel);
            let mut aggregator = Aggregator::new(reference_time, top_files, keep_records);
            let mut warnings = Vec::new();
            let cancelled = run_walker(walker, &mut aggregator, &mut warnings, &progress, Some(&event_tx));
            let (records, stats) = aggregator.finish();
            SubtreeOutcome {
                records,
                stats,
                warnings,
                cancelled,
            }
        });
        Segment::Subtree(path, handle)
    }

    fn publish_warning(&self, warning: &ScanWarning) {
        self.progress.increment_warnings();
        let _ = self.event_tx.send(Event::Warning(warning.clone()));
    }
}

/// Scan `root` on the calling thread, without a worker pool.
pub fn scan_blocking(
    root: impl AsRef<Path>,
    filter: &ScanFilter,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<ScanReport, ScanError> {
    let root = root.as_ref();
    let started = Instant::now();
    let reference_time = classifier::epoch_seconds(SystemTime::now());

    info!("scanning {} sequentially", root.display());
    let walker = Walker::new(
        root,
        Arc::new(filter.clone()),
        WalkOptions::from(settings),
        cancel.clone(),
    )?;

    let progress = ProgressTracker::new();
    let mut aggregator = Aggregator::new(reference_time, settings.top_files, settings.keep_records);
    let mut warnings = Vec::new();
    let cancelled = run_walker(walker, &mut aggregator, &mut warnings, &progress, None);

    let (records, statistics) = aggregator.finish();
    info!(
        "scan of {} finished: {} files, {} dirs, {} warnings",
        root.display(),
        statistics.file_count,
        statistics.dir_count,
        warnings.len()
    );
    Ok(ScanReport {
        scan_path: root.to_path_buf(),
        records,
        statistics,
        warnings,
        cancelled,
        scan_duration: started.elapsed(),
        timestamp: SystemTime::now(),
    })
}

/// Drain `walker` into `aggregator`. Returns whether the walk was cancelled.
fn run_walker(
    walker: Walker,
    aggregator: &mut Aggregator,
    warnings: &mut Vec<ScanWarning>,
    progress: &ProgressTracker,
    event_tx: Option<&EventSender>,
) -> bool {
    let mut cancelled = false;
    for event in walker {
        match event {
            WalkEvent::Record(record) => {
                progress.record(&record);
                if let Some(tx) = event_tx {
                    if progress.should_report() {
                        let snapshot = progress.snapshot();
                        let _ = tx.send(Event::Progress {
                            scanned: snapshot.files_scanned,
                            total_size: snapshot.total_size,
                            current_path: record.path().to_path_buf(),
                        });
                    }
                }
                aggregator.consume(record);
            }
            WalkEvent::Warning(warning) => {
                progress.increment_warnings();
                if let Some(tx) = event_tx {
                    let _ = tx.send(Event::Warning(warning.clone()));
                }
                warnings.push(warning);
            }
            WalkEvent::Cancelled => cancelled = true,
        }
    }
    cancelled
}
