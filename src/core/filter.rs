//! Filter predicate evaluation.
//!
//! A [`ScanFilter`] is compiled once from a [`FilterConfig`] and stays
//! immutable for the whole scan. All predicates combine with AND; a
//! predicate that is not configured always passes.
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::models::record::{FileKind, FileRecord};

/// Serializable filter options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Inclusive lower size bound, non-directories only.
    pub min_size: Option<u64>,
    /// Inclusive upper size bound, non-directories only.
    pub max_size: Option<u64>,
    /// Kinds to keep. Empty keeps every kind.
    pub include_types: Vec<FileKind>,
    /// Globs matched against the file name; a match rejects the entry.
    pub exclude_names: Vec<String>,
    /// Inclusive, epoch seconds.
    pub modified_after: Option<i64>,
    /// Exclusive, epoch seconds.
    pub modified_before: Option<i64>,
    /// Do not descend into directories rejected by name or kind.
    pub prune_excluded_dirs: bool,
}

#[derive(Debug, Clone)]
pub struct ScanFilter {
    config: FilterConfig,
    excluded: GlobSet,
}

impl ScanFilter {
    pub fn new(config: FilterConfig) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_names {
            let glob = Glob::new(pattern).map_err(|source| ScanError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let excluded = builder.build().map_err(|source| ScanError::InvalidPattern {
            pattern: config.exclude_names.join(","),
            source,
        })?;

        Ok(Self { config, excluded })
    }

    /// A filter that passes every record.
    pub fn accept_all() -> Self {
        Self {
            config: FilterConfig::default(),
            excluded: GlobSet::empty(),
        }
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        self.kind_allowed(record.kind())
            && !self.name_excluded(record.path())
            && self.size_allowed(record)
            && self.time_allowed(record.modified())
    }

    /// Whether an entry the walker could descend into (a directory, or a
    /// followed link to one) should have its descendants hidden too.
    pub fn prunes(&self, record: &FileRecord) -> bool {
        self.config.prune_excluded_dirs
            && (!self.kind_allowed(record.kind()) || self.name_excluded(record.path()))
    }

    /// Lazily filter a record stream.
    pub fn apply<'a, I>(&'a self, records: I) -> impl Iterator<Item = FileRecord> + 'a
    where
        I: IntoIterator<Item = FileRecord>,
        I::IntoIter: 'a,
    {
        records.into_iter().filter(move |r| self.matches(r))
    }

    fn kind_allowed(&self, kind: FileKind) -> bool {
        self.config.include_types.is_empty() || self.config.include_types.contains(&kind)
    }

    fn name_excluded(&self, path: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        match path.file_name() {
            Some(name) => self.excluded.is_match(Path::new(name)),
            None => false,
        }
    }

    fn size_allowed(&self, record: &FileRecord) -> bool {
        if record.is_dir() {
            return true;
        }
        let size = record.size();
        self.config.min_size.is_none_or(|min| size >= min)
            && self.config.max_size.is_none_or(|max| size <= max)
    }

    fn time_allowed(&self, modified: i64) -> bool {
        self.config.modified_after.is_none_or(|after| modified >= after)
            && self.config.modified_before.is_none_or(|before| modified < before)
    }
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}
