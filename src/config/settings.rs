use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-directory read deadline used unless overridden.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Deepest entry depth to emit; the root's children are at depth 1.
    pub max_depth: Option<usize>,
    /// Subtree workers allowed to touch the disk at once.
    pub max_concurrent_io: usize,
    pub follow_symlinks: bool,
    /// `None` waits on every directory read indefinitely.
    pub io_timeout: Option<Duration>,
    /// Keep every filtered record in the report, not just the statistics.
    pub keep_records: bool,
    /// Length of the largest-files list.
    pub top_files: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let max_concurrent_io = match detect_storage_type() {
            StorageType::SSD => 128,
            StorageType::HDD => 32,
            StorageType::Unknown => 64,
        };

        // Cap concurrency to avoid "too many open files" (EMFILE)
        let max_concurrent_io = cap_by_fd_limit(max_concurrent_io);

        Self {
            max_depth: None,
            max_concurrent_io,
            follow_symlinks: false,
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
            keep_records: true,
            top_files: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    SSD,
    HDD,
    Unknown,
}

pub fn detect_storage_type() -> StorageType {
    #[cfg(target_os = "macos")]
    {
        detect_storage_type_macos()
    }
    #[cfg(target_os = "linux")]
    {
        detect_storage_type_linux()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        StorageType::Unknown
    }
}

#[cfg(target_os = "macos")]
fn detect_storage_type_macos() -> StorageType {
    use std::process::Command;

    let output = Command::new("system_profiler")
        .arg("SPStorageDataType")
        .output();

    match output {
        Ok(out) => {
            let text = String::from_utf8_lossy(&out.stdout).to_lowercase();
            if text.contains("solid state") || text.contains("ssd") || text.contains("nvme") {
                StorageType::SSD
            } else if text.contains("rotational") || text.contains("hdd") {
                StorageType::HDD
            } else {
                StorageType::Unknown
            }
        }
        Err(_) => StorageType::Unknown,
    }
}

#[cfg(target_os = "linux")]
fn detect_storage_type_linux() -> StorageType {
    use std::fs;

    let Ok(entries) = fs::read_dir("/sys/block") else {
        return StorageType::Unknown;
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !["sd", "nvme", "vd", "xvd", "mmcblk"]
            .iter()
            .any(|prefix| name.starts_with(prefix))
        {
            continue;
        }

        let rotational = entry.path().join("queue/rotational");
        if let Ok(val) = fs::read_to_string(&rotational) {
            return match val.trim() {
                "0" => StorageType::SSD,
                "1" => StorageType::HDD,
                _ => StorageType::Unknown,
            };
        }
    }

    StorageType::Unknown
}

/// Cap concurrency based on the system's file descriptor soft limit.
/// Each worker holds an open directory plus the timeout helper's, so a
/// quarter of the descriptors stay reserved for everything else.
pub fn cap_by_fd_limit(max_io: usize) -> usize {
    #[cfg(unix)]
    {
        let mut rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        let ret = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) };
        if ret == 0 && rlim.rlim_cur != libc::RLIM_INFINITY {
            let fd_limit = rlim.rlim_cur as usize;
            let usable = fd_limit * 3 / 4 / 2;
            return max_io.min(usable).max(4);
        }
    }
    max_io
}
