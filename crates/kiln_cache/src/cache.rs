//! High-level cache orchestrator.
//!
//! The `Cache` type ties together the index, content store, and mtime
//! resolver into a single context object for one build run. It decides on
//! each request whether a cached artifact is still usable, stages freshly
//! compiled output, and persists everything at the end of the run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::CacheError;
use crate::index::{CacheIndex, CacheRecord};
use crate::mtime::{Mtime, MtimeResolver};
use crate::store::{cache_file_name, ContentStore};

/// Dependency-aware cache for compiled build artifacts.
///
/// One `Cache` is one independent cache context: it exclusively owns its
/// index and its timestamp memo, so tests and tools can hold separate
/// instances over separate directories without shared state.
///
/// Lookups are two-tiered and the tiers are explicit: [`Cache::set`] stages
/// content in memory, while [`Cache::check`] and [`Cache::get`] read only
/// what a prior [`Cache::save`] persisted to disk. Staged-but-unsaved
/// content is not retrievable.
///
/// Everything is single-process and synchronous. Two processes sharing one
/// cache directory may race on `save`; cross-process coordination is out of
/// scope.
#[derive(Debug)]
pub struct Cache {
    /// Active cache directory.
    cache_dir: PathBuf,

    /// In-memory index of cache records.
    index: CacheIndex,

    /// Read/write layer over content files.
    store: ContentStore,

    /// Memoized mtime lookups, shared by validity checks and recency
    /// ordering alike.
    mtimes: MtimeResolver,
}

impl Cache {
    /// Opens the cache rooted at `cache_dir`, creating the directory if
    /// absent.
    ///
    /// Failing to create the directory is a fatal setup error, as is a
    /// malformed index file; see [`CacheIndex::load`]. A missing index is
    /// simply a cold cache.
    pub fn load(cache_dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let index = CacheIndex::load(cache_dir)?;
        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            store: ContentStore::new(cache_dir),
            index,
            mtimes: MtimeResolver::new(),
        })
    }

    /// Stages compiled `content` for `source` with its dependency list.
    ///
    /// The record is stamped with the current time, and `source` itself is
    /// appended to `deps` unless the caller already listed it, so every
    /// record self-invalidates when its own file changes. Purely an
    /// in-memory operation; nothing reaches disk until [`Cache::save`].
    pub fn set(&mut self, source: &Path, deps: Vec<PathBuf>, content: String) {
        let mut dependencies = deps;
        if !dependencies.iter().any(|d| d == source) {
            dependencies.push(source.to_path_buf());
        }
        self.index.files.insert(
            source.to_path_buf(),
            CacheRecord {
                last_modified: Mtime::now(),
                dependencies,
                content: Some(content),
            },
        );
    }

    /// Returns the persisted content for `source` if it is still valid.
    ///
    /// A miss (`None`) means: no record exists, or some dependency was
    /// modified strictly after the record was staged, or no content file
    /// has been persisted. A dependency that no longer exists on disk
    /// resolves to the current time and therefore always forces a miss,
    /// failing safe toward recompilation.
    pub fn check(&mut self, source: &Path) -> Option<String> {
        let record = self.index.files.get(source)?;
        for dep in &record.dependencies {
            if self.mtimes.resolve(dep) > record.last_modified {
                debug!(
                    "stale cache for {}: {} is newer",
                    source.display(),
                    dep.display()
                );
                return None;
            }
        }
        self.get(source)
    }

    /// Returns the persisted content for `source`, skipping validity checks.
    ///
    /// Reads the disk tier only: content staged by [`Cache::set`] but not
    /// yet saved is not visible here.
    pub fn get(&self, source: &Path) -> Option<String> {
        self.store.read(source)
    }

    /// Persists all staged records to the active cache directory.
    ///
    /// For every record, the dependency list is reordered newest-first (a
    /// cosmetic touch that keeps the index readable). Records holding
    /// staged content get it written to their content file and dropped from
    /// memory, so memory stays bounded no matter how many artifacts one run
    /// staged. Finally the index itself is written. Individual files are
    /// written atomically, but `save` as a whole is not: a crash can leave
    /// fresh content files alongside a stale index.
    pub fn save(&mut self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| CacheError::Io {
            path: self.cache_dir.clone(),
            source: e,
        })?;

        let mut written = 0usize;
        for (source, record) in self.index.files.iter_mut() {
            self.mtimes.order_by_recency(&mut record.dependencies);
            if let Some(content) = record.content.take() {
                self.store.write(source, &content)?;
                written += 1;
            }
        }

        self.index.write(&self.cache_dir)?;
        info!(
            "saved {written} content files, {} records indexed",
            self.index.files.len()
        );
        Ok(())
    }

    /// Retargets the active cache directory, then saves.
    pub fn save_to(&mut self, cache_dir: &Path) -> Result<(), CacheError> {
        self.cache_dir = cache_dir.to_path_buf();
        self.store = ContentStore::new(cache_dir);
        self.save()
    }

    /// Removes the record and content file for `source`.
    pub fn remove(&mut self, source: &Path) -> Result<(), CacheError> {
        self.index.files.remove(source);
        self.store.remove(source)
    }

    /// Deletes content files in the cache directory that no record
    /// references.
    ///
    /// Returns the number of files removed. Note that sanitized names
    /// collide, so a file kept for one source may also be serving another.
    pub fn gc(&self) -> Result<usize, CacheError> {
        let live: HashSet<String> = self
            .index
            .files
            .keys()
            .map(|p| cache_file_name(p))
            .collect();
        self.store.gc(&live)
    }

    /// Drops all memoized mtimes.
    ///
    /// A cache context is meant to span a single build run. A process that
    /// lives longer clears the memo between runs so later checks observe
    /// current timestamps.
    pub fn clear_mtimes(&mut self) {
        self.mtimes.clear();
    }

    /// Number of records in the index.
    pub fn len(&self) -> usize {
        self.index.files.len()
    }

    /// Returns `true` if the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.index.files.is_empty()
    }

    /// The active cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}
