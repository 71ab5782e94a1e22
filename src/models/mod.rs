pub mod file_type;
pub(crate) mod path_serde;
pub mod record;
pub mod scan_result;
pub mod statistics;

pub use record::{FileKind, FileRecord};
pub use scan_result::{ScanReport, ScanWarning, WarningKind};
pub use statistics::ScanStatistics;
