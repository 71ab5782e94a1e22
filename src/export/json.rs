use std::path::Path;

use crate::models::scan_result::ScanReport;

pub fn export_json(report: &ScanReport, output_path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(output_path, json)?;
    Ok(())
}
