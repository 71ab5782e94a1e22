//! Aggregated scan statistics.
//!
//! [`ScanStatistics`] forms a commutative monoid: [`ScanStatistics::default`]
//! is the identity and [`ScanStatistics::merge`] is associative and
//! commutative, so partial results from independently scanned subtrees can
//! be combined in any order.
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use super::file_type::{categorise_extension, FileCategory};
use super::record::{FileKind, FileRecord};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

const DAY_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeBucket {
    /// `[0, 1 KiB)`
    UnderKib,
    /// `[1 KiB, 1 MiB)`
    UnderMib,
    /// `[1 MiB, inf)`
    MibAndUp,
}

impl SizeBucket {
    pub const ALL: [SizeBucket; 3] = [Self::UnderKib, Self::UnderMib, Self::MibAndUp];

    pub fn for_size(size: u64) -> Self {
        if size < KIB {
            Self::UnderKib
        } else if size < MIB {
            Self::UnderMib
        } else {
            Self::MibAndUp
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::UnderKib => "0-1KB",
            Self::UnderMib => "1KB-1MB",
            Self::MibAndUp => "1MB+",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeBucket {
    Today,
    ThisWeek,
    ThisMonth,
    Older,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 4] = [Self::Today, Self::ThisWeek, Self::ThisMonth, Self::Older];

    /// Bucket for a timestamp relative to `reference` (both epoch seconds).
    /// Timestamps in the future count as today.
    pub fn for_timestamp(timestamp: i64, reference: i64) -> Self {
        let age = reference.saturating_sub(timestamp);
        if age < DAY_SECS {
            Self::Today
        } else if age < 7 * DAY_SECS {
            Self::ThisWeek
        } else if age < 30 * DAY_SECS {
            Self::ThisMonth
        } else {
            Self::Older
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::ThisWeek => "this week",
            Self::ThisMonth => "this month",
            Self::Older => "older",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeHistogram {
    buckets: [u64; 3],
}

impl SizeHistogram {
    pub fn count(&self, bucket: SizeBucket) -> u64 {
        self.buckets[bucket.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SizeBucket, u64)> + '_ {
        SizeBucket::ALL.iter().map(|b| (*b, self.count(*b)))
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    fn add(&mut self, size: u64) {
        self.buckets[SizeBucket::for_size(size).slot()] += 1;
    }

    fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *mine += theirs;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessHistogram {
    buckets: [u64; 4],
}

impl AccessHistogram {
    pub fn count(&self, bucket: AgeBucket) -> u64 {
        self.buckets[bucket.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgeBucket, u64)> + '_ {
        AgeBucket::ALL.iter().map(|b| (*b, self.count(*b)))
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    fn add(&mut self, accessed: i64, reference: i64) {
        self.buckets[AgeBucket::for_timestamp(accessed, reference).slot()] += 1;
    }

    fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *mine += theirs;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub regular: u64,
    pub directory: u64,
    pub symlink: u64,
    pub other: u64,
}

impl KindCounts {
    pub fn get(&self, kind: FileKind) -> u64 {
        match kind {
            FileKind::Regular => self.regular,
            FileKind::Directory => self.directory,
            FileKind::Symlink => self.symlink,
            FileKind::Other => self.other,
        }
    }

    fn add(&mut self, kind: FileKind) {
        match kind {
            FileKind::Regular => self.regular += 1,
            FileKind::Directory => self.directory += 1,
            FileKind::Symlink => self.symlink += 1,
            FileKind::Other => self.other += 1,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.regular += other.regular;
        self.directory += other.directory;
        self.symlink += other.symlink;
        self.other += other.other;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionStats {
    pub count: u64,
    pub bytes: u64,
}

/// Size and count totals for one file category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    pub category: FileCategory,
    pub count: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestFile {
    #[serde(with = "super::path_serde")]
    pub path: PathBuf,
    pub size: u64,
}

/// Size descending, then path ascending. Total, so top-N merges are
/// order-independent.
fn largest_order(a: &LargestFile, b: &LargestFile) -> Ordering {
    b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    /// Non-directory records (regular files, symlinks, other).
    pub file_count: u64,
    pub dir_count: u64,
    pub total_bytes: u64,
    pub kinds: KindCounts,
    pub size_histogram: SizeHistogram,
    pub access_histogram: AccessHistogram,
    pub extensions: BTreeMap<CompactString, ExtensionStats>,
    pub oldest_modified: Option<i64>,
    pub newest_modified: Option<i64>,
    pub largest: Vec<LargestFile>,
    /// Capacity of `largest`. 0 disables tracking.
    pub largest_limit: usize,
}

impl ScanStatistics {
    pub fn with_largest_limit(limit: usize) -> Self {
        Self {
            largest_limit: limit,
            ..Self::default()
        }
    }

    /// Total records observed.
    pub fn entry_count(&self) -> u64 {
        self.file_count + self.dir_count
    }

    /// Fold one record into the totals. `reference` is the epoch second
    /// access ages are measured from.
    pub(crate) fn observe(&mut self, record: &FileRecord, reference: i64) {
        self.kinds.add(record.kind());
        if record.is_dir() {
            self.dir_count += 1;
            return;
        }

        let size = record.size();
        self.file_count += 1;
        self.total_bytes += size;
        self.size_histogram.add(size);
        self.access_histogram.add(record.accessed(), reference);

        if let Some(ext) = record.extension() {
            let entry = self.extensions.entry(CompactString::new(&ext)).or_default();
            entry.count += 1;
            entry.bytes += size;
        }

        let modified = record.modified();
        self.oldest_modified = Some(self.oldest_modified.map_or(modified, |m| m.min(modified)));
        self.newest_modified = Some(self.newest_modified.map_or(modified, |m| m.max(modified)));

        self.offer_largest(LargestFile {
            path: record.path().to_path_buf(),
            size,
        });
    }

    fn offer_largest(&mut self, candidate: LargestFile) {
        if self.largest_limit == 0 {
            return;
        }
        if self.largest.len() >= self.largest_limit {
            match self.largest.last() {
                Some(last) if largest_order(&candidate, last) == Ordering::Less => {}
                _ => return,
            }
        }
        let pos = self
            .largest
            .partition_point(|f| largest_order(f, &candidate) == Ordering::Less);
        self.largest.insert(pos, candidate);
        self.largest.truncate(self.largest_limit);
    }

    /// Monoid combine: fold `other` into `self`.
    pub fn merge(&mut self, other: &ScanStatistics) {
        self.file_count += other.file_count;
        self.dir_count += other.dir_count;
        self.total_bytes += other.total_bytes;
        self.kinds.merge(&other.kinds);
        self.size_histogram.merge(&other.size_histogram);
        self.access_histogram.merge(&other.access_histogram);

        for (ext, theirs) in &other.extensions {
            let mine = self.extensions.entry(ext.clone()).or_default();
            mine.count += theirs.count;
            mine.bytes += theirs.bytes;
        }

        self.oldest_modified = match (self.oldest_modified, other.oldest_modified) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.newest_modified = match (self.newest_modified, other.newest_modified) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        self.largest_limit = self.largest_limit.max(other.largest_limit);
        self.largest.extend(other.largest.iter().cloned());
        self.largest.sort_by(largest_order);
        self.largest.truncate(self.largest_limit);
    }

    /// By-value form of [`merge`](Self::merge).
    pub fn combine(mut self, other: ScanStatistics) -> ScanStatistics {
        self.merge(&other);
        self
    }

    /// Extension totals rolled up into broad categories, largest first.
    pub fn categories(&self) -> Vec<CategoryTotals> {
        let mut totals: BTreeMap<FileCategory, CategoryTotals> = BTreeMap::new();
        for (ext, stats) in &self.extensions {
            let category = categorise_extension(ext);
            let entry = totals.entry(category).or_insert(CategoryTotals {
                category,
                count: 0,
                bytes: 0,
            });
            entry.count += stats.count;
            entry.bytes += stats.bytes;
        }
        let mut out: Vec<CategoryTotals> = totals.into_values().collect();
        out.sort_by(|a, b| b.bytes.cmp(&a.bytes).then(a.category.cmp(&b.category)));
        out
    }
}

impl std::iter::Sum for ScanStatistics {
    fn sum<I: Iterator<Item = ScanStatistics>>(iter: I) -> Self {
        iter.fold(ScanStatistics::default(), ScanStatistics::combine)
    }
}
