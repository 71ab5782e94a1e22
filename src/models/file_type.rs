use serde::{Deserialize, Serialize};

/// Broad file type groups used for the per-category roll-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileCategory {
    Documents,
    Images,
    Video,
    Audio,
    Archives,
    Code,
    Executables,
    System,
    Other,
}

impl FileCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Documents => "Documents",
            Self::Images => "Images",
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Archives => "Archives",
            Self::Code => "Code",
            Self::Executables => "Executables",
            Self::System => "System",
            Self::Other => "Other",
        }
    }
}

/// Map an extension (without the dot, any case) to its category.
pub fn categorise_extension(ext: &str) -> FileCategory {
    // Longer than any known extension.
    if ext.len() > 8 {
        return FileCategory::Other;
    }
    let lower = ext.to_ascii_lowercase();

    match lower.as_str() {
        "doc" | "docx" | "pdf" | "txt" | "rtf" | "odt" | "ods" | "xls" | "xlsx" | "ppt"
        | "pptx" | "csv" | "md" | "rst" | "tex" | "epub" => FileCategory::Documents,
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" | "tiff" | "tif"
        | "psd" | "xcf" | "raw" | "heic" | "avif" => FileCategory::Images,
        "mp4" | "mkv" | "avi" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg" => {
            FileCategory::Video
        }
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "opus" => FileCategory::Audio,
        "zip" | "rar" | "7z" | "tar" | "gz" | "tgz" | "bz2" | "xz" | "zst" | "iso" | "dmg"
        | "deb" | "rpm" => FileCategory::Archives,
        "rs" | "py" | "js" | "ts" | "jsx" | "tsx" | "c" | "cc" | "cpp" | "h" | "hpp" | "cs"
        | "java" | "go" | "rb" | "php" | "swift" | "kt" | "scala" | "html" | "css" | "json"
        | "xml" | "yaml" | "yml" | "toml" | "sql" | "sh" | "bash" | "zsh" => FileCategory::Code,
        "exe" | "msi" | "dll" | "so" | "dylib" | "a" | "o" | "bin" | "appimage" => {
            FileCategory::Executables
        }
        "log" | "tmp" | "bak" | "swp" | "lock" | "pid" | "cache" | "dat" => FileCategory::System,
        _ => FileCategory::Other,
    }
}
