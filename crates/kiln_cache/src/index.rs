//! The persisted cache index.
//!
//! `info.json` in the cache directory maps each source path to the moment
//! its output was cached and the dependency paths that can invalidate it.
//! Content bodies are never part of the index; they live in separate files
//! managed by the content store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CacheError;
use crate::mtime::Mtime;

/// Name of the index file within the cache directory.
pub(crate) const INDEX_FILE: &str = "info.json";

/// Current index format version. Increment on breaking changes to the
/// persisted layout.
const INDEX_FORMAT_VERSION: u32 = 1;

/// Cached metadata for a single source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Wall-clock time at which the content was staged via `set`. Any
    /// dependency modified strictly after this moment makes the record
    /// stale.
    pub last_modified: Mtime,

    /// Paths whose modification invalidates this record. Always includes
    /// the source path itself, so a record self-invalidates when its own
    /// file changes, not only when an import does.
    pub dependencies: Vec<PathBuf>,

    /// Staged output body. Present in memory between `set` and `save`;
    /// `save` writes it to its own file and drops it, so it is never
    /// serialized here.
    #[serde(skip)]
    pub content: Option<String>,
}

/// In-memory mapping from source path to cache record, persisted as
/// `info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheIndex {
    /// Index format version. A mismatch on load discards the index.
    pub format_version: u32,

    /// Per-source-file records, keyed by the original source path.
    pub files: HashMap<PathBuf, CacheRecord>,
}

impl CacheIndex {
    /// Creates an empty index at the current format version.
    pub fn new() -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            files: HashMap::new(),
        }
    }

    /// Loads the index from `cache_dir`.
    ///
    /// A missing index file yields an empty index (a cold cache, not an
    /// error). An index written by a different format version is discarded,
    /// also yielding an empty index. Malformed JSON is fatal and surfaces
    /// as [`CacheError::IndexParse`]: a corrupt index leaves the cache
    /// directory in an unknown state, and the caller decides whether to
    /// wipe it.
    pub fn load(cache_dir: &Path) -> Result<Self, CacheError> {
        let path = cache_dir.join(INDEX_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no cache index at {}", path.display());
                return Ok(Self::new());
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let index: Self = serde_json::from_str(&content).map_err(|e| CacheError::IndexParse {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if index.format_version != INDEX_FORMAT_VERSION {
            info!(
                "discarding cache index with format version {} (current is {})",
                index.format_version, INDEX_FORMAT_VERSION
            );
            return Ok(Self::new());
        }

        debug!(
            "loaded {} cache records from {}",
            index.files.len(),
            path.display()
        );
        Ok(index)
    }

    /// Writes the index as pretty-printed JSON to `info.json` inside
    /// `cache_dir`.
    ///
    /// The file is written to a temporary sibling and renamed into place,
    /// so a crash mid-write cannot leave a truncated index behind.
    pub fn write(&self, cache_dir: &Path) -> Result<(), CacheError> {
        let path = cache_dir.join(INDEX_FILE);
        let json =
            serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let tmp = cache_dir.join(format!("{INDEX_FILE}.tmp"));
        std::fs::write(&tmp, json).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| CacheError::Io { path, source })?;

        debug!("wrote {} cache records", self.files.len());
        Ok(())
    }
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self::new()
    }
}
