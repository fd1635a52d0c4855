//! Shared test utilities for the store integration suite.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub use foliodb::{
    Collection, CollectionIo, Cursor, Filter, FolioConfig, FolioError, FolioResult, Store,
    StoreStats, SweepStats, Value,
};

/// Config with a long flush interval so tests drive sweeps explicitly.
pub fn manual_config() -> FolioConfig {
    FolioConfig {
        flush_interval_ms: 60_000,
        ..FolioConfig::default()
    }
}

/// Test store wrapper rooted in a temp directory.
pub struct TestStore {
    pub store: Store,
    pub dir: TempDir,
}

impl TestStore {
    /// Open a store in a fresh temp directory with manual flushing.
    pub fn new() -> Self {
        Self::new_with(manual_config())
    }

    /// Open a store in a fresh temp directory with the given settings.
    pub fn new_with(config: FolioConfig) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store =
            Store::open_with_config(dir.path(), config).expect("failed to open test store");
        TestStore { store, dir }
    }

    /// Close the store and reopen it over the same directory, simulating
    /// a process restart.
    pub fn reopen(&mut self) {
        let config = self.store.config().clone();
        self.store.close().expect("failed to close test store");
        let store = Store::open_with_config(self.dir.path(), config)
            .expect("failed to reopen test store");
        self.store = store;
    }

    /// Path of the file backing a collection with a filename-safe id.
    pub fn collection_path(&self, collection_id: &str) -> PathBuf {
        self.dir.path().join(format!("{}.json", collection_id))
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// IO stub with a fixed read delay and an observable read counter, for
/// driving the load coalescer deterministically.
pub struct DelayedIo {
    delay: Duration,
    reads: Arc<AtomicUsize>,
}

impl DelayedIo {
    /// Returns the stub and a handle to its read counter.
    pub fn new(delay: Duration) -> (Self, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        (
            DelayedIo {
                delay,
                reads: Arc::clone(&reads),
            },
            reads,
        )
    }
}

impl CollectionIo for DelayedIo {
    fn read(&self, _collection_id: &str) -> Collection {
        self.reads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Collection::new()
    }

    fn write(&self, _collection_id: &str, _payload: &[u8]) -> std::io::Result<()> {
        Ok(())
    }
}
