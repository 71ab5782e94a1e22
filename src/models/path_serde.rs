//! Path fields serialized as strings, lossily.
//!
//! `serde_json` refuses paths that are not valid UTF-8. Reports favour
//! always being writable, so such names are written with U+FFFD in place
//! of the invalid bytes and read back as that text.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
    String::deserialize(deserializer).map(PathBuf::from)
}
