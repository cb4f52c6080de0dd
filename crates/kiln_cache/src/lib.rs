//! Dependency-aware caching of compiled build artifacts.
//!
//! Stores the compiled output of source files (preprocessed stylesheets and
//! the like) keyed by their original path, and decides on each request
//! whether the stored output is still usable by comparing modification
//! timestamps of the source and every file it depends on. Dependency lists
//! are supplied by the caller; this crate neither computes import graphs
//! nor hashes content.
//!
//! # On-disk layout
//!
//! A cache directory holds one `info.json` index (source path to timestamp
//! plus dependency list) and one flat content file per cached source, named
//! by [`cache_file_name`].
//!
//! # Lifecycle
//!
//! [`Cache::load`] at the start of a build run, [`Cache::check`] per
//! request, [`Cache::set`] after recompiling, [`Cache::save`] at the end.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod index;
pub mod mtime;
pub mod store;

pub use cache::Cache;
pub use error::CacheError;
pub use index::{CacheIndex, CacheRecord};
pub use mtime::{Mtime, MtimeResolver};
pub use store::{cache_file_name, ContentStore};
