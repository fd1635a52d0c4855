//! Storage layer for foliodb
//!
//! This crate implements the disk adapter and the in-memory cache
//! structures:
//! - CollectionIo / CollectionFiles: file-per-collection JSON blobs with
//!   crash-safe writes (temp file, fsync, atomic rename)
//! - CacheEntry: one resident collection with its write-back state
//! - LruRegistry: bounded recency-ordered registry with the dirty set
//!
//! The registry uses FxHashMap for O(1) lookups and a key-linked recency
//! list, so promotion and eviction are O(1) under a single lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod entry;
pub mod registry;

pub use blob::{CollectionFiles, CollectionIo};
pub use entry::CacheEntry;
pub use registry::{LruRegistry, DEFAULT_CACHE_CAPACITY};
