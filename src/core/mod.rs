pub mod aggregator;
pub mod cancel;
pub mod classifier;
pub(crate) mod dir_reader;
pub mod events;
pub mod filter;
pub mod progress;
pub mod scanner;
pub mod walker;

pub use cancel::CancellationToken;
pub use filter::{FilterConfig, ScanFilter};
pub use scanner::{scan_blocking, Scanner};
pub use walker::{WalkEvent, WalkOptions, Walker};
