use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::models::record::FileRecord;

/// Minimum spacing between two progress events.
const REPORT_INTERVAL_MS: u64 = 100;

/// Lock-free counters shared by every worker of a scanner. Counts are
/// cumulative over all scans run by the same scanner.
pub struct ProgressTracker {
    pub files_scanned: AtomicU64,
    pub dirs_scanned: AtomicU64,
    pub total_size: AtomicU64,
    pub warnings_count: AtomicU64,
    pub start_time: Instant,
    last_report_ms: AtomicU64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            files_scanned: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
            warnings_count: AtomicU64::new(0),
            start_time: Instant::now(),
            last_report_ms: AtomicU64::new(0),
        }
    }

    pub fn record(&self, record: &FileRecord) {
        if record.is_dir() {
            self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
        } else {
            self.files_scanned.fetch_add(1, Ordering::Relaxed);
            self.total_size.fetch_add(record.size(), Ordering::Relaxed);
        }
    }

    pub fn increment_warnings(&self) {
        self.warnings_count.fetch_add(1, Ordering::Relaxed);
    }

    /// True at most once per interval across all threads.
    pub fn should_report(&self) -> bool {
        let now_ms = self.start_time.elapsed().as_millis() as u64;
        let last = self.last_report_ms.load(Ordering::Relaxed);
        now_ms.saturating_sub(last) >= REPORT_INTERVAL_MS
            && self
                .last_report_ms
                .compare_exchange(last, now_ms, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
    }

    pub fn files_per_second(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < f64::EPSILON {
            return 0.0;
        }
        self.files_scanned.load(Ordering::Relaxed) as f64 / elapsed
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            dirs_scanned: self.dirs_scanned.load(Ordering::Relaxed),
            total_size: self.total_size.load(Ordering::Relaxed),
            warnings_count: self.warnings_count.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
            files_per_second: self.files_per_second(),
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub files_scanned: u64,
    pub dirs_scanned: u64,
    pub total_size: u64,
    pub warnings_count: u64,
    pub elapsed: Duration,
    pub files_per_second: f64,
}
