//! The embedded document store.
//!
//! `Store` front-ends a bounded cache of collections backed by one JSON
//! file per collection. Operations run against the cached `CacheEntry`
//! for their collection, loading it from disk on first touch. All cache
//! bookkeeping happens under a single mutex; disk reads and writes happen
//! outside it.
//!
//! Concurrent first touches of the same collection are coalesced: one
//! caller becomes the load leader and performs the disk read, every other
//! caller queues a continuation that the leader resolves, in arrival
//! order, once the entry exists. This keeps cold reads at one disk read
//! per collection no matter how many callers race.

use crate::background::TaskPool;
use crate::config::{FolioConfig, CONFIG_FILE_NAME};
use crate::flush::{spawn_flush_thread, FlushSignal, SweepStats};
use crate::query::{self, Cursor};
use folio_core::{Filter, FolioResult, Value};
use folio_storage::{CacheEntry, CollectionFiles, CollectionIo, LruRegistry};
use parking_lot::Mutex as ParkingMutex;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Queue depth for the write pool. Sweeps drain after each batch, so the
/// queue only needs to absorb one sweep's worth of writes.
const WRITE_QUEUE_DEPTH: usize = 1024;

/// Queued continuation for a caller waiting on an in-flight load.
type Waiter = Box<dyn FnOnce(&mut CacheEntry) + Send>;

/// Everything guarded by the store mutex.
struct CacheState {
    registry: LruRegistry,
    /// Collections with a disk read in flight, each with the callers
    /// queued behind the leader.
    loading: FxHashMap<String, Vec<Waiter>>,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    coalesced_waits: AtomicU64,
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
    sweeps: AtomicU64,
    evictions: AtomicU64,
    write_errors: AtomicU64,
}

/// Counter snapshot returned by [`Store::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Operations served by an already-resident entry.
    pub cache_hits: u64,
    /// Operations that found their collection absent.
    pub cache_misses: u64,
    /// Misses that attached to another caller's in-flight load.
    pub coalesced_waits: u64,
    /// Collection file reads performed.
    pub disk_reads: u64,
    /// Collection file writes completed.
    pub disk_writes: u64,
    /// Write-back sweeps run.
    pub sweeps: u64,
    /// Entries evicted by sweeps.
    pub evictions: u64,
    /// Serializations or file writes that failed.
    pub write_errors: u64,
    /// Collections currently resident.
    pub resident_collections: usize,
    /// Resident collections with unflushed changes.
    pub dirty_collections: usize,
}

/// Shared core of a `Store`, also held by the flush thread.
pub(crate) struct StoreInner {
    io: Arc<dyn CollectionIo>,
    state: ParkingMutex<CacheState>,
    pool: TaskPool,
    /// Serializes sweeps from the timer, `flush()`, and `close()`.
    sweep_lock: ParkingMutex<()>,
    counters: Arc<Counters>,
    pub(crate) signal: FlushSignal,
}

/// Outcome of the locked phase of an operation: the entry was resident
/// and the operation already ran, or the caller waits on a load in
/// flight, or the caller leads the load itself.
enum Ticket<R, F> {
    Done(R),
    Wait(mpsc::Receiver<R>),
    Lead(F),
}

impl StoreInner {
    /// Run `op` against the cache entry for `collection_id`, loading the
    /// collection first if needed.
    ///
    /// The entry is promoted to most-recently-used and its dirty flag is
    /// re-synced after `op` runs. Concurrent callers for a non-resident
    /// collection share one disk read; their operations run in arrival
    /// order against the freshly loaded entry.
    fn with_entry<R, F>(&self, collection_id: &str, op: F) -> R
    where
        F: FnOnce(&mut CacheEntry) -> R + Send + 'static,
        R: Send + 'static,
    {
        let ticket = {
            let mut state = self.state.lock();
            if state.registry.contains(collection_id) {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                let result = match state.registry.get_mut(collection_id) {
                    Some(entry) => op(entry),
                    // residency was checked under this same lock hold
                    None => unreachable!("resident entry disappeared under the cache lock"),
                };
                state.registry.sync_dirty(collection_id);
                state.registry.promote(collection_id);
                Ticket::Done(result)
            } else {
                self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
                match state.loading.get_mut(collection_id) {
                    Some(waiters) => {
                        // Load already in flight: queue behind it
                        self.counters.coalesced_waits.fetch_add(1, Ordering::Relaxed);
                        let (tx, rx) = mpsc::channel();
                        waiters.push(Box::new(move |entry: &mut CacheEntry| {
                            let _ = tx.send(op(entry));
                        }));
                        Ticket::Wait(rx)
                    }
                    None => {
                        // First toucher becomes the load leader
                        state.loading.insert(collection_id.to_string(), Vec::new());
                        Ticket::Lead(op)
                    }
                }
            }
        };

        match ticket {
            Ticket::Done(result) => result,
            Ticket::Wait(rx) => rx
                .recv()
                .expect("collection load abandoned by a panicked leader"),
            Ticket::Lead(op) => self.lead_load(collection_id, op),
        }
    }

    /// Perform the disk read for a collection this caller leads, then
    /// resolve the leader's own operation and every queued waiter.
    fn lead_load<R, F>(&self, collection_id: &str, op: F) -> R
    where
        F: FnOnce(&mut CacheEntry) -> R,
    {
        // Read outside the lock. A panicking IO impl must not leave the
        // loading queue registered forever, so unwind is caught, the
        // queue dropped (which wakes waiters into their own panic), and
        // the panic resumed.
        let read = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.io.read(collection_id)
        }));
        self.counters.disk_reads.fetch_add(1, Ordering::Relaxed);

        let collection = match read {
            Ok(collection) => collection,
            Err(panic) => {
                let mut state = self.state.lock();
                state.loading.remove(collection_id);
                std::panic::resume_unwind(panic);
            }
        };

        let mut state = self.state.lock();
        let mut entry = CacheEntry::new(collection_id, collection);

        // The leader arrived first, so its operation runs first, then
        // the queued waiters in arrival order.
        let result = op(&mut entry);
        let waiters = state.loading.remove(collection_id).unwrap_or_default();
        let waiter_count = waiters.len();
        for waiter in waiters {
            waiter(&mut entry);
        }

        // insert places the entry as newest and seeds the dirty set from
        // its flag
        state.registry.insert(entry);
        if waiter_count > 0 {
            debug!(
                target: "folio::store",
                collection = %collection_id,
                waiters = waiter_count,
                "coalesced load resolved"
            );
        }
        result
    }

    /// Run one write-back sweep.
    ///
    /// Phase 1 serializes every dirty collection under the lock and
    /// clears its flag. Phase 2 hands the payloads to the write pool and
    /// drains it; a failed write re-marks its collection dirty so the
    /// next sweep retries. Phase 3 evicts clean entries oldest-first
    /// until the registry is back under capacity.
    pub(crate) fn sweep(&self) -> SweepStats {
        let _sweep = self.sweep_lock.lock();

        // Phase 1: serialize dirty entries, clearing flags at write
        // initiation. A collection re-dirtied after this point is simply
        // dirty again for the next sweep.
        let mut batch: Vec<(String, Vec<u8>)> = Vec::new();
        let mut serialize_errors = 0usize;
        {
            let mut state = self.state.lock();
            for id in state.registry.dirty_ids() {
                let serialized = match state.registry.get(&id) {
                    Some(entry) => serde_json::to_vec_pretty(entry.collection()),
                    None => continue,
                };
                match serialized {
                    Ok(payload) => {
                        state.registry.mark_dirty(&id, false);
                        batch.push((id, payload));
                    }
                    Err(e) => {
                        // Stays dirty; the next sweep retries
                        warn!(
                            target: "folio::flush",
                            collection = %id,
                            error = %e,
                            "failed to serialize collection"
                        );
                        self.counters.write_errors.fetch_add(1, Ordering::Relaxed);
                        serialize_errors += 1;
                    }
                }
            }
        }

        // Phase 2: overlap the file writes, then wait for the batch.
        let mut submitted_ids = Vec::with_capacity(batch.len());
        let mut rejected = 0usize;
        let failed: Arc<ParkingMutex<Vec<String>>> = Arc::new(ParkingMutex::new(Vec::new()));
        for (id, payload) in batch {
            let io = Arc::clone(&self.io);
            let counters = Arc::clone(&self.counters);
            let failures = Arc::clone(&failed);
            let task_id = id.clone();
            let submit = self.pool.submit(move || match io.write(&task_id, &payload) {
                Ok(()) => {
                    counters.disk_writes.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(
                        target: "folio::io",
                        collection = %task_id,
                        error = %e,
                        "failed to write collection file"
                    );
                    counters.write_errors.fetch_add(1, Ordering::Relaxed);
                    failures.lock().push(task_id);
                }
            });
            match submit {
                Ok(()) => submitted_ids.push(id),
                Err(_) => {
                    // The pool consumed the payload; put the collection
                    // back in the dirty set so nothing is lost.
                    warn!(
                        target: "folio::io",
                        collection = %id,
                        "write pool rejected task; collection stays dirty"
                    );
                    self.counters.write_errors.fetch_add(1, Ordering::Relaxed);
                    rejected += 1;
                    let mut state = self.state.lock();
                    state.registry.mark_dirty(&id, true);
                }
            }
        }
        self.pool.drain();

        // Failed writes keep their in-memory changes and retry next sweep
        let failed_ids = std::mem::take(&mut *failed.lock());
        if !failed_ids.is_empty() {
            let mut state = self.state.lock();
            for id in &failed_ids {
                state.registry.mark_dirty(id, true);
            }
        }
        let flushed_ids: Vec<String> = submitted_ids
            .into_iter()
            .filter(|id| !failed_ids.contains(id))
            .collect();

        // Phase 3: trim back to capacity. Dirty entries (including any
        // re-dirtied since phase 1) are never evicted.
        let mut evicted_ids = Vec::new();
        {
            let mut state = self.state.lock();
            while state.registry.len() > state.registry.capacity() {
                match state.registry.evict_oldest() {
                    Some(entry) => evicted_ids.push(entry.id().to_string()),
                    None => {
                        if state.registry.dirty_count() < state.registry.len() {
                            error!(
                                target: "folio::store",
                                "cache over capacity with clean entries but none evictable; recency links corrupt"
                            );
                        }
                        break;
                    }
                }
            }
        }
        self.counters
            .evictions
            .fetch_add(evicted_ids.len() as u64, Ordering::Relaxed);
        self.counters.sweeps.fetch_add(1, Ordering::Relaxed);

        if !flushed_ids.is_empty() {
            info!(
                target: "folio::flush",
                count = flushed_ids.len(),
                collections = ?flushed_ids,
                "updated collection files"
            );
        }
        if !evicted_ids.is_empty() {
            debug!(
                target: "folio::flush",
                count = evicted_ids.len(),
                collections = ?evicted_ids,
                "evicted collections"
            );
        }

        SweepStats {
            flushed: flushed_ids.len(),
            evicted: evicted_ids.len(),
            write_errors: serialize_errors + rejected + failed_ids.len(),
        }
    }
}

/// An embedded, file-backed document store.
///
/// Collections load lazily on first touch and live in a bounded LRU
/// cache. Mutations mark their collection dirty in memory; a background
/// thread persists dirty collections every `flush_interval_ms` and evicts
/// the least recently used clean entries past `cache_capacity`.
///
/// # Example
///
/// ```no_run
/// use folio_engine::{Filter, Store};
/// use serde_json::json;
///
/// # fn main() -> folio_engine::FolioResult<()> {
/// let store = Store::open("db")?;
/// store.save("people", "ada", json!({"age": 36}))?;
///
/// let adults = store.find("people", Some(&Filter::new().gte("age", 18)))?;
/// assert_eq!(adults.len(), 1);
/// store.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Store {
    inner: Arc<StoreInner>,
    flush_handle: ParkingMutex<Option<JoinHandle<()>>>,
    data_dir: Option<PathBuf>,
    config: FolioConfig,
    closed: AtomicBool,
}

impl Store {
    /// Open a store rooted at `data_dir`.
    ///
    /// Creates the directory and a default `folio.toml` on first open;
    /// subsequent opens load the settings from that file. Stale temp
    /// files from an interrupted flush are removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the path exists but is not a directory, the
    /// directory cannot be created, or the config file is unreadable or
    /// invalid.
    pub fn open(data_dir: impl AsRef<Path>) -> FolioResult<Store> {
        let data_dir = data_dir.as_ref();
        let files = CollectionFiles::open(data_dir)?;
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        FolioConfig::write_default_if_missing(&config_path)?;
        let config = FolioConfig::from_file(&config_path)?;
        Self::build(Arc::new(files), config, Some(data_dir.to_path_buf()))
    }

    /// Open a store with explicit settings, ignoring any `folio.toml`.
    pub fn open_with_config(
        data_dir: impl AsRef<Path>,
        config: FolioConfig,
    ) -> FolioResult<Store> {
        config.validate()?;
        let data_dir = data_dir.as_ref();
        let files = CollectionFiles::open(data_dir)?;
        Self::build(Arc::new(files), config, Some(data_dir.to_path_buf()))
    }

    /// Open a store over a custom IO backend.
    ///
    /// Useful for tests that need to observe or delay disk access.
    pub fn open_with_io(
        io: impl CollectionIo + 'static,
        config: FolioConfig,
    ) -> FolioResult<Store> {
        config.validate()?;
        Self::build(Arc::new(io), config, None)
    }

    fn build(
        io: Arc<dyn CollectionIo>,
        config: FolioConfig,
        data_dir: Option<PathBuf>,
    ) -> FolioResult<Store> {
        let inner = Arc::new(StoreInner {
            io,
            state: ParkingMutex::new(CacheState {
                registry: LruRegistry::new(config.cache_capacity),
                loading: FxHashMap::default(),
            }),
            pool: TaskPool::new(config.write_workers, WRITE_QUEUE_DEPTH),
            sweep_lock: ParkingMutex::new(()),
            counters: Arc::new(Counters::default()),
            signal: FlushSignal::new(),
        });

        let handle = spawn_flush_thread(Arc::clone(&inner), config.flush_interval())?;
        info!(
            target: "folio::store",
            data_dir = ?data_dir,
            flush_interval_ms = config.flush_interval_ms,
            cache_capacity = config.cache_capacity,
            "store opened"
        );

        Ok(Store {
            inner,
            flush_handle: ParkingMutex::new(Some(handle)),
            data_dir,
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// The data directory, when the store is file-backed.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// The settings this store was opened with.
    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    /// Store `value` under `key` in a collection, returning the stored
    /// value.
    ///
    /// The collection is marked dirty; the change reaches disk on the
    /// next sweep.
    pub fn save(&self, collection_id: &str, key: &str, value: Value) -> FolioResult<Value> {
        let key = key.to_string();
        let stored = value.clone();
        self.inner.with_entry(collection_id, move |entry| {
            entry.collection_mut().insert(key, value);
            entry.set_dirty(true);
        });
        Ok(stored)
    }

    /// Remove `key` from a collection, returning the value it held.
    ///
    /// The collection is marked dirty even when the key was absent, and
    /// the insertion order of the remaining records is preserved.
    pub fn remove(&self, collection_id: &str, key: &str) -> FolioResult<Option<Value>> {
        let key = key.to_string();
        Ok(self.inner.with_entry(collection_id, move |entry| {
            let prior = entry.collection_mut().shift_remove(&key);
            entry.set_dirty(true);
            prior
        }))
    }

    /// Look up the value stored under `key`, if any.
    ///
    /// Promotes the collection's recency but never marks it dirty.
    pub fn find_by_id(&self, collection_id: &str, key: &str) -> FolioResult<Option<Value>> {
        let key = key.to_string();
        Ok(self.inner.with_entry(collection_id, move |entry| {
            entry.collection().get(&key).cloned()
        }))
    }

    /// Collect the values in a collection matching `filter`, in record
    /// insertion order. `None` matches every record.
    pub fn find(&self, collection_id: &str, filter: Option<&Filter>) -> FolioResult<Vec<Value>> {
        let filter = filter.cloned();
        Ok(self.inner.with_entry(collection_id, move |entry| {
            query::scan(entry.collection(), filter.as_ref())
        }))
    }

    /// Like [`find`](Store::find), but returns the matches as a
    /// single-pass [`Cursor`] snapshot.
    pub fn find_cursor(
        &self,
        collection_id: &str,
        filter: Option<&Filter>,
    ) -> FolioResult<Cursor> {
        Ok(Cursor::new(self.find(collection_id, filter)?))
    }

    /// Run one write-back sweep now instead of waiting for the timer.
    pub fn flush(&self) -> FolioResult<SweepStats> {
        Ok(self.inner.sweep())
    }

    /// Snapshot the store's counters.
    pub fn stats(&self) -> StoreStats {
        let (resident, dirty) = {
            let state = self.inner.state.lock();
            (state.registry.len(), state.registry.dirty_count())
        };
        let c = &self.inner.counters;
        StoreStats {
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            cache_misses: c.cache_misses.load(Ordering::Relaxed),
            coalesced_waits: c.coalesced_waits.load(Ordering::Relaxed),
            disk_reads: c.disk_reads.load(Ordering::Relaxed),
            disk_writes: c.disk_writes.load(Ordering::Relaxed),
            sweeps: c.sweeps.load(Ordering::Relaxed),
            evictions: c.evictions.load(Ordering::Relaxed),
            write_errors: c.write_errors.load(Ordering::Relaxed),
            resident_collections: resident,
            dirty_collections: dirty,
        }
    }

    /// Stop the flush timer and persist everything dirty.
    ///
    /// Idempotent; later calls return empty stats. Operations (including
    /// manual [`flush`](Store::flush)) stay usable after close — only
    /// the periodic sweeps stop.
    pub fn close(&self) -> FolioResult<SweepStats> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(SweepStats::default());
        }

        self.inner.signal.stop();
        if let Some(handle) = self.flush_handle.lock().take() {
            let _ = handle.join();
        }

        let stats = self.inner.sweep();
        info!(
            target: "folio::store",
            flushed = stats.flushed,
            evicted = stats.evicted,
            "store closed"
        );
        Ok(stats)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        // Best-effort final flush, then take the write pool down
        let _ = self.close();
        self.inner.pool.shutdown();
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("data_dir", &self.data_dir)
            .field("config", &self.config)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
