use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::models::scan_result::ScanWarning;

#[derive(Debug, Clone)]
pub enum Event {
    // Scan progress
    Progress { scanned: u64, total_size: u64, current_path: PathBuf },
    Warning(ScanWarning),

    // Scan state
    ScanStarted { path: PathBuf },
    ScanCompleted { total_files: u64, total_size: u64, duration_ms: u64, cancelled: bool },
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
