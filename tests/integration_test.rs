use std::path::Path;
use std::sync::Arc;

use dirscope::config::settings::Settings;
use dirscope::core::cancel::CancellationToken;
use dirscope::core::events::create_event_channel;
use dirscope::core::filter::{FilterConfig, ScanFilter};
use dirscope::core::scanner::{scan_blocking, Scanner};
use dirscope::core::walker::{WalkEvent, WalkOptions, Walker};
use dirscope::error::ScanError;
use dirscope::export::json::export_json;
use dirscope::export::markdown::export_markdown;
use dirscope::models::record::FileKind;
use dirscope::models::scan_result::{ScanReport, WarningKind};
use dirscope::models::statistics::SizeBucket;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn settings() -> Settings {
    Settings {
        max_concurrent_io: 4,
        ..Settings::default()
    }
}

async fn scan(root: &Path, filter: &ScanFilter) -> ScanReport {
    let (tx, _rx) = create_event_channel();
    Scanner::new(settings(), tx)
        .scan(root, filter, &CancellationToken::new())
        .await
        .expect("scan succeeds")
}

/// `a.txt` (100 B), `b.bin` (2 MiB), `sub/c.log` (empty).
fn small_tree(root: &Path) {
    std::fs::write(root.join("a.txt"), vec![b'a'; 100]).unwrap();
    std::fs::write(root.join("b.bin"), vec![0u8; 2 * 1024 * 1024]).unwrap();
    std::fs::create_dir(root.join("sub")).unwrap();
    std::fs::write(root.join("sub/c.log"), b"").unwrap();
}

/// `dirs` directories with `files` small files each.
fn wide_tree(root: &Path, dirs: usize, files: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("d{d:03}"));
        std::fs::create_dir(&dir).unwrap();
        for f in 0..files {
            std::fs::write(dir.join(format!("f{f:03}.dat")), b"x").unwrap();
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_small_tree_statistics() {
    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());

    let report = scan(tmp.path(), &ScanFilter::accept_all()).await;
    let stats = &report.statistics;

    assert_eq!(stats.file_count, 3);
    assert_eq!(stats.dir_count, 1);
    assert_eq!(stats.total_bytes, 2_097_252);
    assert_eq!(stats.size_histogram.count(SizeBucket::UnderKib), 2);
    assert_eq!(stats.size_histogram.count(SizeBucket::UnderMib), 0);
    assert_eq!(stats.size_histogram.count(SizeBucket::MibAndUp), 1);
    assert_eq!(stats.largest[0].path, tmp.path().join("b.bin"));
    assert!(report.warnings.is_empty());
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_counts_match_records() {
    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());
    wide_tree(tmp.path(), 5, 7);

    let report = scan(tmp.path(), &ScanFilter::accept_all()).await;
    assert_eq!(
        report.statistics.file_count + report.statistics.dir_count,
        report.records.len() as u64
    );

    let filtered = ScanFilter::new(FilterConfig {
        include_types: vec![FileKind::Regular],
        ..Default::default()
    })
    .unwrap();
    let report = scan(tmp.path(), &filtered).await;
    assert_eq!(report.statistics.dir_count, 0);
    assert_eq!(report.statistics.file_count, report.records.len() as u64);
    assert_eq!(report.statistics.file_count, 3 + 35);
}

#[tokio::test]
async fn test_access_histogram_covers_all_files() {
    let tmp = tempfile::tempdir().unwrap();
    wide_tree(tmp.path(), 3, 4);
    let report = scan(tmp.path(), &ScanFilter::accept_all()).await;
    assert_eq!(report.statistics.access_histogram.total(), 12);
    assert_eq!(report.statistics.size_histogram.total(), 12);
}

#[tokio::test]
async fn test_no_records_keeps_statistics() {
    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());
    let (tx, _rx) = create_event_channel();
    let settings = Settings {
        keep_records: false,
        ..settings()
    };
    let report = Scanner::new(settings, tx)
        .scan(tmp.path(), &ScanFilter::accept_all(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.records.is_empty());
    assert_eq!(report.statistics.file_count, 3);
}

// ---------------------------------------------------------------------------
// Parallel and sequential agree
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_parallel_equals_sequential() {
    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());
    wide_tree(tmp.path(), 12, 9);
    std::fs::create_dir_all(tmp.path().join("d003/nested/deeper")).unwrap();
    std::fs::write(tmp.path().join("d003/nested/deeper/x.rs"), b"fn main() {}").unwrap();

    let filter = ScanFilter::new(FilterConfig {
        exclude_names: vec!["f00[0-2].dat".into()],
        ..Default::default()
    })
    .unwrap();

    let parallel = scan(tmp.path(), &filter).await;
    let sequential =
        scan_blocking(tmp.path(), &filter, &settings(), &CancellationToken::new()).unwrap();

    assert_eq!(parallel.records, sequential.records);
    assert_eq!(parallel.statistics, sequential.statistics);
    assert_eq!(parallel.warnings, sequential.warnings);
}

#[test]
fn test_walker_stream_matches_report() {
    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());
    let records: Vec<_> = Walker::new(
        tmp.path(),
        Arc::new(ScanFilter::accept_all()),
        WalkOptions::default(),
        CancellationToken::new(),
    )
    .unwrap()
    .records()
    .collect();
    let report = scan_blocking(
        tmp.path(),
        &ScanFilter::accept_all(),
        &settings(),
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(records, report.records);
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_filter_is_idempotent_over_scan_output() {
    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());
    wide_tree(tmp.path(), 2, 3);

    let filter = ScanFilter::new(FilterConfig {
        min_size: Some(1),
        exclude_names: vec!["*.bin".into()],
        ..Default::default()
    })
    .unwrap();
    let report = scan(tmp.path(), &filter).await;
    let again: Vec<_> = filter.apply(report.records.clone()).collect();
    assert_eq!(again, report.records);
    assert!(report.records.iter().all(|r| r.is_dir() || r.size() >= 1));
    assert!(report.records.iter().all(|r| r.extension().as_deref() != Some("bin")));
}

#[tokio::test]
async fn test_prune_excluded_directories() {
    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());
    std::fs::create_dir_all(tmp.path().join("node_modules/pkg")).unwrap();
    std::fs::write(tmp.path().join("node_modules/pkg/index.js"), b"x").unwrap();

    let config = FilterConfig {
        exclude_names: vec!["node_modules".into()],
        ..Default::default()
    };
    let kept = scan(tmp.path(), &ScanFilter::new(config.clone()).unwrap()).await;
    assert!(kept.records.iter().any(|r| r.path().ends_with("index.js")));

    let pruned = scan(
        tmp.path(),
        &ScanFilter::new(FilterConfig {
            prune_excluded_dirs: true,
            ..config
        })
        .unwrap(),
    )
    .await;
    assert!(pruned
        .records
        .iter()
        .all(|r| !r.path().starts_with(tmp.path().join("node_modules"))));
    assert_eq!(pruned.statistics.file_count, 3);
}

#[tokio::test]
async fn test_max_depth() {
    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());
    let (tx, _rx) = create_event_channel();
    let report = Scanner::new(
        Settings {
            max_depth: Some(1),
            ..settings()
        },
        tx,
    )
    .scan(tmp.path(), &ScanFilter::accept_all(), &CancellationToken::new())
    .await
    .unwrap();
    assert_eq!(report.records.len(), 3);
    assert!(report.records.iter().all(|r| r.depth() == 1));
}

// ---------------------------------------------------------------------------
// Errors, cycles and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, _rx) = create_event_channel();
    let result = Scanner::new(settings(), tx)
        .scan(
            tmp.path().join("does-not-exist"),
            &ScanFilter::accept_all(),
            &CancellationToken::new(),
        )
        .await;
    assert!(matches!(result, Err(ScanError::RootInaccessible { .. })));

    let result = scan_blocking(
        tmp.path().join("does-not-exist"),
        &ScanFilter::accept_all(),
        &settings(),
        &CancellationToken::new(),
    );
    assert!(matches!(result, Err(ScanError::RootInaccessible { .. })));
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_cycle_terminates() {
    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());
    std::os::unix::fs::symlink(tmp.path(), tmp.path().join("sub/loop")).unwrap();

    let (tx, _rx) = create_event_channel();
    let report = Scanner::new(
        Settings {
            follow_symlinks: true,
            ..settings()
        },
        tx,
    )
    .scan(tmp.path(), &ScanFilter::accept_all(), &CancellationToken::new())
    .await
    .unwrap();

    assert!(report.warnings_of(WarningKind::SymlinkCycleDetected).count() >= 1);
    assert_eq!(report.statistics.file_count, 3);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_directory_is_a_warning() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    small_tree(tmp.path());
    let locked = tmp.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::write(locked.join("secret"), b"s").unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read it anyway.
    if std::fs::read_dir(&locked).is_ok() {
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let report = scan(tmp.path(), &ScanFilter::accept_all()).await;
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    let warnings: Vec<_> = report.warnings_of(WarningKind::EntryInaccessible).collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].path, locked);
    // The directory itself is still reported.
    assert!(report.records.iter().any(|r| r.path() == locked));
    assert_eq!(report.statistics.file_count, 3);
}

#[tokio::test]
async fn test_cancelled_scan_returns_partial_results() {
    let tmp = tempfile::tempdir().unwrap();
    wide_tree(tmp.path(), 100, 100);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (tx, _rx) = create_event_channel();
    let report = Scanner::new(settings(), tx)
        .scan(tmp.path(), &ScanFilter::accept_all(), &cancel)
        .await
        .expect("cancellation is not an error");
    assert!(report.cancelled);
    assert!(report.statistics.file_count < 10_000);
}

#[test]
fn test_cancel_mid_walk() {
    let tmp = tempfile::tempdir().unwrap();
    wide_tree(tmp.path(), 100, 100);

    let cancel = CancellationToken::new();
    let mut walker = Walker::new(
        tmp.path(),
        Arc::new(ScanFilter::accept_all()),
        WalkOptions::default(),
        cancel.clone(),
    )
    .unwrap();

    let mut files = 0;
    let mut saw_marker = false;
    for event in walker.by_ref() {
        match event {
            WalkEvent::Record(r) if !r.is_dir() => {
                files += 1;
                if files == 150 {
                    cancel.cancel();
                }
            }
            WalkEvent::Cancelled => saw_marker = true,
            _ => {}
        }
    }
    assert!(saw_marker);
    assert!(files < 10_000);
    assert!(walker.next().is_none());
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_exports() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("tree");
    std::fs::create_dir(&root).unwrap();
    small_tree(&root);
    let report = scan(&root, &ScanFilter::accept_all()).await;

    let json_path = tmp.path().join("report.json");
    export_json(&report, &json_path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["statistics"]["file_count"], 3);
    assert_eq!(value["records"].as_array().map(Vec::len), Some(4));

    let md_path = tmp.path().join("report.md");
    export_markdown(&report, &md_path).unwrap();
    let md = std::fs::read_to_string(&md_path).unwrap();
    assert!(md.contains("- **Files:** 3"));
    assert!(md.contains("b.bin"));
}

#[cfg(unix)]
#[test]
fn test_json_export_with_non_utf8_name() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("tree");
    std::fs::create_dir(&root).unwrap();
    // Some filesystems only store UTF-8 names.
    if std::fs::write(root.join(OsStr::from_bytes(b"bad\xff.txt")), b"x").is_err() {
        return;
    }
    std::fs::write(root.join("ok.txt"), b"y").unwrap();

    let report = scan_blocking(
        &root,
        &ScanFilter::accept_all(),
        &settings(),
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(report.statistics.file_count, 2);

    let json_path = tmp.path().join("report.json");
    export_json(&report, &json_path).expect("export tolerates non-UTF-8 names");

    let back: ScanReport =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(back.records.len(), 2);
    assert!(back.records[0].path().ends_with("bad\u{FFFD}.txt"));
    assert!(back.records[1].path().ends_with("ok.txt"));
}
