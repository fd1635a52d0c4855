//! Flush scheduling.
//!
//! A dedicated timer thread wakes every `flush_interval_ms` and runs one
//! write-back sweep over the cache. The sweep itself lives on
//! [`StoreInner`](crate::store); this module owns the thread, the stop
//! signal, and the sweep's result type.

use crate::store::StoreInner;
use folio_core::{FolioError, FolioResult};
use parking_lot::{Condvar, Mutex as ParkingMutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of one write-back sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Dirty collections persisted by this sweep.
    pub flushed: usize,
    /// Clean collections evicted to get back under capacity.
    pub evicted: usize,
    /// File writes that failed; the affected collections stay dirty in
    /// memory and are retried by the next sweep.
    pub write_errors: usize,
}

/// Stop signal shared between the store and its flush thread.
///
/// The condvar lets `stop()` interrupt a sleeping timer immediately, so
/// closing the store never waits out the remainder of an interval.
pub(crate) struct FlushSignal {
    stop: ParkingMutex<bool>,
    cv: Condvar,
}

impl FlushSignal {
    pub(crate) fn new() -> Self {
        FlushSignal {
            stop: ParkingMutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Sleep until the timeout elapses or stop is requested.
    ///
    /// Returns true when stop was requested before or during the wait.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stop = self.stop.lock();
        while !*stop {
            if self.cv.wait_until(&mut stop, deadline).timed_out() {
                break;
            }
        }
        *stop
    }

    /// Request stop and wake any waiting thread.
    pub(crate) fn stop(&self) {
        let mut stop = self.stop.lock();
        *stop = true;
        self.cv.notify_all();
    }
}

/// Spawn the named timer thread driving periodic sweeps.
pub(crate) fn spawn_flush_thread(
    inner: Arc<StoreInner>,
    interval: Duration,
) -> FolioResult<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("folio-flush".to_string())
        .spawn(move || {
            debug!(
                target: "folio::flush",
                interval_ms = interval.as_millis() as u64,
                "flush thread started"
            );
            loop {
                if inner.signal.wait_timeout(interval) {
                    break;
                }
                inner.sweep();
            }
            debug!(target: "folio::flush", "flush thread stopped");
        })
        .map_err(|e| FolioError::internal(format!("failed to spawn flush thread: {}", e)))
}
