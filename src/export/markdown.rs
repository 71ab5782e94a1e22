use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::human_readable_size;
use crate::models::record::{FileKind, FileRecord};
use crate::models::scan_result::ScanReport;

/// Rows in the recently modified table.
const RECENT_FILES: usize = 10;

pub fn export_markdown(report: &ScanReport, output_path: &Path) -> anyhow::Result<()> {
    let md = render_markdown(report)?;
    std::fs::write(output_path, md)?;
    Ok(())
}

pub fn render_markdown(report: &ScanReport) -> Result<String, std::fmt::Error> {
    let stats = &report.statistics;
    let mut md = String::new();

    writeln!(md, "# dirscope Report")?;
    writeln!(md)?;
    writeln!(md, "- **Path:** {}", report.scan_path.display())?;
    writeln!(md, "- **Scanned at:** {}", DateTime::<Utc>::from(report.timestamp).to_rfc3339())?;
    writeln!(md, "- **Total Size:** {}", human_readable_size(stats.total_bytes))?;
    writeln!(md, "- **Files:** {}", stats.file_count)?;
    writeln!(md, "- **Directories:** {}", stats.dir_count)?;
    writeln!(md, "- **Scan Duration:** {:.2}s", report.scan_duration.as_secs_f64())?;
    if let (Some(oldest), Some(newest)) = (stats.oldest_modified, stats.newest_modified) {
        writeln!(md, "- **Modified between:** {} and {}", format_epoch(oldest), format_epoch(newest))?;
    }
    if report.cancelled {
        writeln!(md, "- **Cancelled:** results are partial")?;
    }
    writeln!(md)?;

    writeln!(md, "## Entry Kinds")?;
    writeln!(md)?;
    writeln!(md, "| Kind | Count |")?;
    writeln!(md, "|------|-------|")?;
    for kind in [FileKind::Regular, FileKind::Directory, FileKind::Symlink, FileKind::Other] {
        writeln!(md, "| {} | {} |", kind.label(), stats.kinds.get(kind))?;
    }
    writeln!(md)?;

    writeln!(md, "## Size Distribution")?;
    writeln!(md)?;
    writeln!(md, "| Bucket | Files | % |")?;
    writeln!(md, "|--------|-------|---|")?;
    let files = stats.size_histogram.total();
    for (bucket, count) in stats.size_histogram.iter() {
        writeln!(md, "| {} | {} | {:.1}% |", bucket.label(), count, percent(count, files))?;
    }
    writeln!(md)?;

    writeln!(md, "## Last Access")?;
    writeln!(md)?;
    writeln!(md, "| Age | Files | % |")?;
    writeln!(md, "|-----|-------|---|")?;
    for (bucket, count) in stats.access_histogram.iter() {
        writeln!(md, "| {} | {} | {:.1}% |", bucket.label(), count, percent(count, files))?;
    }

    let categories = stats.categories();
    if !categories.is_empty() {
        writeln!(md)?;
        writeln!(md, "## File Types")?;
        writeln!(md)?;
        writeln!(md, "| Category | Files | Size | % |")?;
        writeln!(md, "|----------|-------|------|---|")?;
        for cat in &categories {
            writeln!(
                md,
                "| {} | {} | {} | {:.1}% |",
                cat.category.label(),
                cat.count,
                human_readable_size(cat.bytes),
                percent(cat.bytes, stats.total_bytes),
            )?;
        }
    }

    if !stats.largest.is_empty() {
        writeln!(md)?;
        writeln!(md, "## Largest Files")?;
        writeln!(md)?;
        writeln!(md, "| File | Size |")?;
        writeln!(md, "|------|------|")?;
        for file in &stats.largest {
            writeln!(md, "| {} | {} |", file.path.display(), human_readable_size(file.size))?;
        }
    }

    let mut recent: Vec<&FileRecord> = report.records.iter().filter(|r| !r.is_dir()).collect();
    if !recent.is_empty() {
        recent.sort_by(|a, b| b.modified().cmp(&a.modified()).then_with(|| a.path().cmp(b.path())));
        writeln!(md)?;
        writeln!(md, "## Recently Modified")?;
        writeln!(md)?;
        writeln!(md, "| File | Modified |")?;
        writeln!(md, "|------|----------|")?;
        for record in recent.into_iter().take(RECENT_FILES) {
            let modified = record
                .modified_at()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| record.modified().to_string());
            writeln!(md, "| {} | {} |", record.path().display(), modified)?;
        }
    }

    if !report.warnings.is_empty() {
        writeln!(md)?;
        writeln!(md, "## Warnings ({} total)", report.warnings.len())?;
        writeln!(md)?;
        for warning in &report.warnings {
            writeln!(md, "- **{}**: {} ({})", warning.kind, warning.path.display(), warning.message)?;
        }
    }

    Ok(md)
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn format_epoch(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}
