//! Plain text summary for the terminal.
use std::fmt::Write;

use super::human_readable_size;
use crate::models::scan_result::ScanReport;

const FULL_BLOCK: &str = "\u{2588}";

/// Render `report` with histogram bars at most `bar_width` cells wide.
pub fn render_summary(report: &ScanReport, bar_width: usize) -> Result<String, std::fmt::Error> {
    let stats = &report.statistics;
    let mut out = String::new();

    writeln!(out, "Scanned {}", report.scan_path.display())?;
    writeln!(
        out,
        "  {} files, {} directories, {} in {:.2}s{}",
        stats.file_count,
        stats.dir_count,
        human_readable_size(stats.total_bytes),
        report.scan_duration.as_secs_f64(),
        if report.cancelled { " (cancelled)" } else { "" }
    )?;

    writeln!(out)?;
    writeln!(out, "Size distribution")?;
    let size_rows: Vec<(&str, u64)> = stats.size_histogram.iter().map(|(b, n)| (b.label(), n)).collect();
    write_bars(&mut out, &size_rows, bar_width)?;

    writeln!(out)?;
    writeln!(out, "Last access")?;
    let age_rows: Vec<(&str, u64)> = stats.access_histogram.iter().map(|(b, n)| (b.label(), n)).collect();
    write_bars(&mut out, &age_rows, bar_width)?;

    let categories = stats.categories();
    if !categories.is_empty() {
        writeln!(out)?;
        writeln!(out, "File types")?;
        for cat in categories {
            writeln!(
                out,
                "  {:<12} {:>8} files  {:>10}",
                cat.category.label(),
                cat.count,
                human_readable_size(cat.bytes)
            )?;
        }
    }

    if !stats.largest.is_empty() {
        writeln!(out)?;
        writeln!(out, "Largest files")?;
        for file in &stats.largest {
            writeln!(out, "  {:>10}  {}", human_readable_size(file.size), file.path.display())?;
        }
    }

    if !report.warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "{} entries skipped", report.warnings.len())?;
    }

    Ok(out)
}

fn write_bars(out: &mut String, rows: &[(&str, u64)], bar_width: usize) -> std::fmt::Result {
    let max = rows.iter().map(|(_, n)| *n).max().unwrap_or(0);
    for (label, count) in rows {
        let filled = if max == 0 {
            0
        } else {
            ((*count as f64 / max as f64) * bar_width as f64).round() as usize
        };
        // Non-empty buckets always get at least one cell.
        let filled = if *count > 0 { filled.max(1) } else { 0 };
        writeln!(out, "  {:<10} {:>8} {}", label, count, FULL_BLOCK.repeat(filled))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::models::record::{FileKind, FileRecord};
    use crate::models::statistics::ScanStatistics;

    #[test]
    fn bars_scale_to_the_largest_bucket() {
        let mut out = String::new();
        write_bars(&mut out, &[("a", 10), ("b", 5), ("c", 0), ("d", 1)], 10).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0].matches(FULL_BLOCK).count(), 10);
        assert_eq!(lines[1].matches(FULL_BLOCK).count(), 5);
        assert_eq!(lines[2].matches(FULL_BLOCK).count(), 0);
        assert_eq!(lines[3].matches(FULL_BLOCK).count(), 1);
    }

    #[test]
    fn summary_lists_every_section() {
        let mut statistics = ScanStatistics::with_largest_limit(3);
        statistics.observe(&FileRecord::new(PathBuf::from("/r/a.rs"), 2048, FileKind::Regular, 0, 0, 1), 0);
        let report = ScanReport {
            scan_path: PathBuf::from("/r"),
            records: Vec::new(),
            statistics,
            warnings: Vec::new(),
            cancelled: true,
            scan_duration: Duration::from_millis(250),
            timestamp: SystemTime::UNIX_EPOCH,
        };

        let text = render_summary(&report, 20).unwrap();
        assert!(text.contains("1 files, 0 directories, 2.00 KB in 0.25s (cancelled)"));
        assert!(text.contains("Size distribution"));
        assert!(text.contains("Last access"));
        assert!(text.contains("Code"));
        assert!(text.contains("/r/a.rs"));
        assert!(!text.contains("entries skipped"));
    }

    #[test]
    fn empty_histogram_has_no_bars() {
        let mut out = String::new();
        write_bars(&mut out, &[("a", 0), ("b", 0)], 10).unwrap();
        assert!(!out.contains(FULL_BLOCK));
    }
}
