use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, NaiveDate};
use clap::Parser;
use tracing::{debug, info};

use dirscope::config::settings::Settings;
use dirscope::core::cancel::CancellationToken;
use dirscope::core::events::{create_event_channel, Event};
use dirscope::core::filter::{FilterConfig, ScanFilter};
use dirscope::core::scanner::{scan_blocking, Scanner};
use dirscope::export::json::export_json;
use dirscope::export::markdown::export_markdown;
use dirscope::export::summary::render_summary;
use dirscope::models::record::FileKind;

#[derive(Parser, Debug)]
#[command(name = "dirscope", version, about = "Recursive filesystem scanner and analyzer")]
struct Cli {
    /// Path to analyze (default: current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Deepest entry depth to report (root children are depth 1)
    #[arg(short = 'd', long)]
    max_depth: Option<usize>,

    /// Maximum concurrent subtree workers
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Walk on the calling thread instead of the worker pool
    #[arg(long)]
    sequential: bool,

    /// Follow symbolic links
    #[arg(long)]
    follow_symlinks: bool,

    /// Smallest file size to keep, in bytes
    #[arg(long)]
    min_size: Option<u64>,

    /// Largest file size to keep, in bytes
    #[arg(long)]
    max_size: Option<u64>,

    /// Kinds to keep: regular, directory, symlink, other (repeatable)
    #[arg(long = "type", value_parser = parse_kind)]
    types: Vec<FileKind>,

    /// Name glob to exclude (repeatable)
    #[arg(short = 'x', long)]
    exclude: Vec<String>,

    /// Keep entries modified at or after this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_time)]
    modified_after: Option<i64>,

    /// Keep entries modified before this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_time)]
    modified_before: Option<i64>,

    /// Do not descend into directories excluded by name or type
    #[arg(long)]
    prune: bool,

    /// Per-directory read timeout in milliseconds, 0 to wait forever
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Number of largest files to list
    #[arg(long)]
    top: Option<usize>,

    /// Keep only statistics, not the per-entry records
    #[arg(long)]
    no_records: bool,

    /// Export the full report as JSON
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Export a Markdown report
    #[arg(long)]
    export_markdown: Option<PathBuf>,
}

fn parse_kind(s: &str) -> Result<FileKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "regular" | "file" | "f" => Ok(FileKind::Regular),
        "directory" | "dir" | "d" => Ok(FileKind::Directory),
        "symlink" | "link" | "l" => Ok(FileKind::Symlink),
        "other" | "o" => Ok(FileKind::Other),
        _ => Err(format!("unknown kind `{s}`")),
    }
}

fn parse_time(s: &str) -> Result<i64, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.timestamp());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc().timestamp())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got `{s}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (logs to stderr)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::default();
    settings.max_depth = cli.max_depth;
    if let Some(conc) = cli.concurrency {
        settings.max_concurrent_io = conc.max(1);
    }
    settings.follow_symlinks = cli.follow_symlinks;
    if let Some(ms) = cli.timeout_ms {
        settings.io_timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }
    if let Some(top) = cli.top {
        settings.top_files = top;
    }
    settings.keep_records = !cli.no_records;

    let filter = ScanFilter::new(FilterConfig {
        min_size: cli.min_size,
        max_size: cli.max_size,
        include_types: cli.types,
        exclude_names: cli.exclude,
        modified_after: cli.modified_after,
        modified_before: cli.modified_before,
        prune_excluded_dirs: cli.prune,
    })?;

    let path = std::fs::canonicalize(&cli.path)
        .with_context(|| format!("cannot resolve {}", cli.path.display()))?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping scan");
                cancel.cancel();
            }
        });
    }

    let report = if cli.sequential {
        let path = path.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || scan_blocking(path, &filter, &settings, &cancel)).await??
    } else {
        let (event_tx, mut event_rx) = create_event_channel();
        let listener = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if let Event::Progress { scanned, total_size, current_path } = event {
                    debug!("{} files, {} bytes, at {}", scanned, total_size, current_path.display());
                }
            }
        });
        let scanner = Scanner::new(settings, event_tx);
        let report = scanner.scan(path, &filter, &cancel).await?;
        drop(scanner);
        let _ = listener.await;
        report
    };

    print!("{}", render_summary(&report, 40)?);

    if let Some(ref export_path) = cli.export_json {
        export_json(&report, export_path)?;
        println!("Exported to: {}", export_path.display());
    }
    if let Some(ref export_path) = cli.export_markdown {
        export_markdown(&report, export_path)?;
        println!("Exported to: {}", export_path.display());
    }

    Ok(())
}
