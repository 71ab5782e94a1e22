use crate::models::record::FileRecord;
use crate::models::statistics::ScanStatistics;

/// Owns the filtered record stream and folds it into [`ScanStatistics`].
///
/// Access ages are measured from `reference_time` (epoch seconds), fixed
/// when the aggregator is created so every record in a scan is bucketed
/// against the same instant.
#[derive(Debug)]
pub struct Aggregator {
    stats: ScanStatistics,
    records: Vec<FileRecord>,
    keep_records: bool,
    reference_time: i64,
}

impl Aggregator {
    pub fn new(reference_time: i64, largest_limit: usize, keep_records: bool) -> Self {
        Self {
            stats: ScanStatistics::with_largest_limit(largest_limit),
            records: Vec::new(),
            keep_records,
            reference_time,
        }
    }

    pub fn consume(&mut self, record: FileRecord) {
        self.stats.observe(&record, self.reference_time);
        if self.keep_records {
            self.records.push(record);
        }
    }

    /// Append an independently aggregated subtree. Its records must follow
    /// everything consumed so far in traversal order.
    pub fn absorb(&mut self, records: Vec<FileRecord>, stats: &ScanStatistics) {
        self.stats.merge(stats);
        if self.keep_records {
            self.records.extend(records);
        }
    }

    /// Hand out the records and the final statistics.
    pub fn finish(self) -> (Vec<FileRecord>, ScanStatistics) {
        (self.records, self.stats)
    }
}

impl Extend<FileRecord> for Aggregator {
    fn extend<T: IntoIterator<Item = FileRecord>>(&mut self, iter: T) {
        for record in iter {
            self.consume(record);
        }
    }
}
