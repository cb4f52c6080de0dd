//! File modification timestamps and their memoized resolution.
//!
//! Validity decisions compare the current mtime of every dependency against
//! the moment a record was staged. Stat calls are memoized per resolver so
//! a dependency shared by many sources is only stat'd once per build run.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A file modification timestamp in milliseconds since the Unix epoch.
///
/// `Mtime`s compare by plain integer ordering; a dependency invalidates a
/// record when its current `Mtime` is strictly greater than the one
/// recorded when the record was staged.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mtime(u64);

impl Mtime {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Converts a `SystemTime` to millisecond precision.
    ///
    /// Times before the epoch clamp to zero.
    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Constructs an `Mtime` from raw epoch milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as epoch milliseconds.
    pub fn as_millis(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Mtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mtime({}ms)", self.0)
    }
}

/// Resolves and memoizes file modification times.
///
/// A path that does not exist, or cannot be stat'd at all, resolves to
/// [`Mtime::now`] so that any record depending on it is treated as stale
/// and recompiled. Each path is stat'd at most once per resolver; the
/// memoized value is reused even if the file changes afterwards. The
/// staleness window is therefore bounded by the lifetime of the owning
/// [`Cache`](crate::Cache), which is meant to span a single build run. A
/// longer-lived process clears the memo between runs via [`clear`].
///
/// [`clear`]: MtimeResolver::clear
#[derive(Debug, Default)]
pub struct MtimeResolver {
    /// Memoized lookups, keyed by the path as given.
    memo: HashMap<PathBuf, Mtime>,
}

impl MtimeResolver {
    /// Creates a resolver with an empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the modification time of `path`, memoized.
    pub fn resolve(&mut self, path: &Path) -> Mtime {
        if let Some(&mtime) = self.memo.get(path) {
            return mtime;
        }
        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map(Mtime::from_system_time)
            .unwrap_or_else(|_| Mtime::now());
        self.memo.insert(path.to_path_buf(), mtime);
        mtime
    }

    /// Sorts `paths` by descending modification time, newest first.
    ///
    /// The sort is stable; ties keep their input order. Purely cosmetic:
    /// the persisted index lists the most recently touched dependencies
    /// first, which makes manual inspection easier. Validity checks never
    /// depend on dependency order.
    pub fn order_by_recency(&mut self, paths: &mut [PathBuf]) {
        paths.sort_by_key(|p| Reverse(self.resolve(p)));
    }

    /// Drops all memoized timestamps.
    pub fn clear(&mut self) {
        self.memo.clear();
    }
}
