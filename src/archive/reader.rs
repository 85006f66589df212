//! Archive reading and entry extraction

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use urlencoding::decode;
use zip::ZipArchive;

/// A ZIP container (MVR scene or GDTF profile)
pub struct Archive<R: Read + Seek> {
    archive: ZipArchive<R>,
    names: Vec<String>,
}

impl<R: Read + Seek> std::fmt::Debug for Archive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive").field("names", &self.names).finish()
    }
}

impl Archive<File> {
    /// Open an archive on disk
    ///
    /// Fails with [`Error::NotFound`] when the file does not exist and with
    /// [`Error::Zip`] when its ZIP directory cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Open an archive from any seekable reader
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        let names = archive.file_names().map(str::to_string).collect();
        Ok(Self { archive, names })
    }

    /// Names of all entries in directory order
    pub fn entry_names(&self) -> &[String] {
        &self.names
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a referenced file name to an entry name
    ///
    /// Tries an exact match, then a percent-decoded match, then a
    /// case-insensitive match on the file's base name.
    pub fn find_entry(&self, name: &str) -> Option<&str> {
        let name = name.trim_start_matches('/');
        if let Some(found) = self.names.iter().find(|n| n.as_str() == name) {
            return Some(found);
        }

        let decoded = decode(name).map(|d| d.into_owned()).unwrap_or_else(|_| name.to_string());
        if let Some(found) = self.names.iter().find(|n| {
            n.as_str() == decoded || decode(n).map(|d| d == name).unwrap_or(false)
        }) {
            return Some(found);
        }

        let base = basename(&decoded).to_lowercase();
        self.names
            .iter()
            .find(|n| !n.ends_with('/') && basename(n).to_lowercase() == base)
            .map(String::as_str)
    }

    /// Whether an entry resolves for this name
    pub fn has_entry(&self, name: &str) -> bool {
        self.find_entry(name).is_some()
    }

    /// Read an entry into memory
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let resolved = self
            .find_entry(name)
            .ok_or_else(|| Error::MissingFile(name.to_string()))?
            .to_string();
        let mut file = self
            .archive
            .by_name(&resolved)
            .map_err(|_| Error::MissingFile(resolved.clone()))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Read an entry as UTF-8 text
    pub fn read_entry_string(&mut self, name: &str) -> Result<String> {
        let bytes = self.read_entry(name)?;
        String::from_utf8(bytes).map_err(|e| {
            Error::invalid_format_context(name, &format!("entry is not valid UTF-8: {}", e))
        })
    }

    /// Extract an entry below `dest_dir`, keeping its relative path
    ///
    /// Entries already present in `cache` are not written again.
    pub fn extract(
        &mut self,
        name: &str,
        dest_dir: &Path,
        cache: &mut ExtractionCache,
    ) -> Result<PathBuf> {
        let resolved = self
            .find_entry(name)
            .ok_or_else(|| Error::MissingFile(name.to_string()))?
            .to_string();

        if let Some(path) = cache.hit(&resolved) {
            return Ok(path);
        }

        let mut file = self
            .archive
            .by_name(&resolved)
            .map_err(|_| Error::MissingFile(resolved.clone()))?;
        let relative = file.enclosed_name().ok_or_else(|| {
            Error::invalid_format_context(&resolved, "entry path escapes the extraction directory")
        })?;
        let dest = dest_dir.join(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest)?;
        std::io::copy(&mut file, &mut out)?;
        tracing::debug!(entry = %resolved, path = %dest.display(), "Extracted archive entry");

        cache.insert(resolved, dest.clone());
        Ok(dest)
    }
}

fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Per-call record of extracted entries
#[derive(Debug, Default, Clone)]
pub struct ExtractionCache {
    entries: HashMap<String, (PathBuf, usize)>,
}

impl ExtractionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn hit(&mut self, entry: &str) -> Option<PathBuf> {
        self.entries.get_mut(entry).map(|(path, hits)| {
            *hits += 1;
            path.clone()
        })
    }

    fn insert(&mut self, entry: String, path: PathBuf) {
        self.entries.insert(entry, (path, 0));
    }

    /// Extracted path of an entry
    pub fn path(&self, entry: &str) -> Option<&Path> {
        self.entries.get(entry).map(|(p, _)| p.as_path())
    }

    /// How often an already extracted entry was requested again
    pub fn repeat_hits(&self, entry: &str) -> usize {
        self.entries.get(entry).map(|(_, h)| *h).unwrap_or(0)
    }

    /// Number of extracted entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was extracted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
