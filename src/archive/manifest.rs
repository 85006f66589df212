//! De-duplicated list of files to pack into an archive

use crate::error::{Warning, WarningKind};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Where the bytes of an asset come from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetSource {
    /// A file on disk
    File(PathBuf),
    /// An entry of another archive on disk
    ArchiveEntry {
        /// Archive path
        archive: PathBuf,
        /// Entry name inside the archive
        entry: String,
    },
}

impl std::fmt::Display for AssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetSource::File(path) => write!(f, "{}", path.display()),
            AssetSource::ArchiveEntry { archive, entry } => {
                write!(f, "{}!{}", archive.display(), entry)
            }
        }
    }
}

/// One `(source, archive_name)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestEntry {
    /// Where to read the bytes
    pub source: AssetSource,
    /// Name inside the written archive
    pub archive_name: String,
}

/// Insertion-ordered set of archive files
///
/// An `archive_name` appears at most once. Inserting the same pair twice is
/// a no-op; inserting a different source under a taken name keeps the first
/// and reports a warning.
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
    entries: Vec<ManifestEntry>,
    seen: HashSet<ManifestEntry>,
    by_name: HashMap<String, usize>,
}

impl AssetManifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file; returns a warning when the name is taken by another source
    pub fn insert(&mut self, source: AssetSource, archive_name: impl Into<String>) -> Option<Warning> {
        let entry = ManifestEntry {
            source,
            archive_name: archive_name.into(),
        };
        if self.seen.contains(&entry) {
            return None;
        }
        if let Some(&index) = self.by_name.get(&entry.archive_name) {
            return Some(Warning::new(
                WarningKind::MissingAsset,
                format!(
                    "Archive name '{}' already holds {}, dropping {}",
                    entry.archive_name, self.entries[index].source, entry.source
                ),
            ));
        }
        self.by_name
            .insert(entry.archive_name.clone(), self.entries.len());
        self.seen.insert(entry.clone());
        self.entries.push(entry);
        None
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    /// Entry stored under an archive name
    pub fn get(&self, archive_name: &str) -> Option<&ManifestEntry> {
        self.by_name.get(archive_name).map(|&i| &self.entries[i])
    }

    /// Whether an archive name is taken
    pub fn contains(&self, archive_name: &str) -> bool {
        self.by_name.contains_key(archive_name)
    }

    /// Number of distinct files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another manifest, collecting name conflicts
    pub fn extend(&mut self, other: AssetManifest) -> Vec<Warning> {
        other
            .entries
            .into_iter()
            .filter_map(|e| self.insert(e.source, e.archive_name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_pairs_collapse() {
        let mut manifest = AssetManifest::new();
        for _ in 0..3 {
            let warning = manifest.insert(AssetSource::File("/tmp/truss.3ds".into()), "truss.3ds");
            assert!(warning.is_none());
        }
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_conflicting_name_keeps_first() {
        let mut manifest = AssetManifest::new();
        manifest.insert(AssetSource::File("/a/truss.3ds".into()), "truss.3ds");
        let warning = manifest
            .insert(AssetSource::File("/b/truss.3ds".into()), "truss.3ds")
            .unwrap();
        assert_eq!(warning.kind, WarningKind::MissingAsset);
        assert_eq!(manifest.len(), 1);
        assert_eq!(
            manifest.get("truss.3ds").map(|e| &e.source),
            Some(&AssetSource::File("/a/truss.3ds".into()))
        );
    }

    #[test]
    fn test_insertion_order_kept() {
        let mut manifest = AssetManifest::new();
        manifest.insert(AssetSource::File("/z.3ds".into()), "z.3ds");
        manifest.insert(AssetSource::File("/a.3ds".into()), "a.3ds");
        let names: Vec<&str> = manifest.iter().map(|e| e.archive_name.as_str()).collect();
        assert_eq!(names, vec!["z.3ds", "a.3ds"]);
    }
}
