//! On-disk storage of cached content bodies.
//!
//! Each cached source gets one file directly under the cache directory,
//! named by a sanitized form of the source path. Reads are fail-safe:
//! anything short of readable content is an ordinary miss.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::index::INDEX_FILE;

/// Derives the on-disk content file name for a source path.
///
/// Every character that is not ASCII alphanumeric, an underscore, or a
/// period is replaced with an underscore. The mapping is deterministic but
/// not injective: distinct paths such as `/a/b.css` and `/a_b.css` sanitize
/// to the same name and silently overwrite each other's content file. This
/// is a known limitation of the persisted format, kept rather than fixed
/// because fixing it changes the on-disk layout.
pub fn cache_file_name(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Read/write layer over individual cached content files.
#[derive(Debug, Clone)]
pub struct ContentStore {
    /// Directory holding the content files.
    cache_dir: PathBuf,
}

impl ContentStore {
    /// Creates a store rooted at the given cache directory.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// Returns the content file path for a source path.
    pub fn content_path(&self, source: &Path) -> PathBuf {
        self.cache_dir.join(cache_file_name(source))
    }

    /// Reads the cached content for `source`.
    ///
    /// Returns `None` if no content file exists or it cannot be read; both
    /// are ordinary misses, not errors.
    pub fn read(&self, source: &Path) -> Option<String> {
        std::fs::read_to_string(self.content_path(source)).ok()
    }

    /// Writes the content body for `source`, replacing any previous file.
    ///
    /// The body is written to a temporary sibling and renamed into place,
    /// so a concurrent reader never observes a half-written file.
    pub fn write(&self, source: &Path, content: &str) -> Result<(), CacheError> {
        let path = self.content_path(source);
        let tmp = self.cache_dir.join(format!("{}.tmp", cache_file_name(source)));
        std::fs::write(&tmp, content).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| CacheError::Io { path, source: e })?;
        Ok(())
    }

    /// Removes the content file for `source`, if present.
    pub fn remove(&self, source: &Path) -> Result<(), CacheError> {
        let path = self.content_path(source);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io { path, source: e }),
        }
    }

    /// Removes content files not referenced by any live source.
    ///
    /// `live` holds the sanitized file names to keep; the index file is
    /// always kept. Returns the number of files removed.
    pub fn gc(&self, live: &HashSet<String>) -> Result<usize, CacheError> {
        let entries = std::fs::read_dir(&self.cache_dir).map_err(|e| CacheError::Io {
            path: self.cache_dir.clone(),
            source: e,
        })?;

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io {
                path: self.cache_dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if name == INDEX_FILE || live.contains(name) {
                continue;
            }
            std::fs::remove_file(&path).map_err(|e| CacheError::Io {
                path: path.clone(),
                source: e,
            })?;
            removed += 1;
        }
        Ok(removed)
    }
}
