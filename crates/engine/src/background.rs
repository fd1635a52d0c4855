//! Worker pool for write-back IO.
//!
//! The flush sweep hands each dirty collection's serialized payload to this
//! pool so file writes overlap instead of running serially. Tasks run in
//! FIFO order on a fixed set of worker threads.

use parking_lot::Mutex as ParkingMutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::error;

type Task = Box<dyn FnOnce() + Send>;

/// Error returned when the task queue is full or the pool is shut down.
#[derive(Debug)]
pub struct BackpressureError;

impl std::fmt::Display for BackpressureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "write pool queue is full")
    }
}

impl std::error::Error for BackpressureError {}

/// Pool metrics snapshot.
pub struct PoolStats {
    /// Number of tasks waiting in the queue.
    pub queue_depth: usize,
    /// Number of tasks currently being executed by workers.
    pub active_tasks: usize,
    /// Total number of tasks completed since pool creation.
    pub tasks_completed: u64,
    /// Number of worker threads.
    pub worker_count: usize,
}

struct PoolInner {
    queue: ParkingMutex<VecDeque<Task>>,
    work_ready: parking_lot::Condvar,
    drain_cond: parking_lot::Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    max_queue_depth: usize,
    tasks_completed: AtomicU64,
}

/// Fixed-size FIFO worker pool.
///
/// Tasks are executed in submission order by a fixed number of worker
/// threads. [`drain`](TaskPool::drain) blocks until the pool is idle, which
/// is how a sweep waits for its batch of writes to land.
pub struct TaskPool {
    inner: Arc<PoolInner>,
    workers: ParkingMutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
}

impl TaskPool {
    /// Create a new pool with the given number of worker threads.
    ///
    /// Workers are named `folio-io-0`, `folio-io-1`, etc.
    pub fn new(num_threads: usize, max_queue_depth: usize) -> Self {
        let inner = Arc::new(PoolInner {
            queue: ParkingMutex::new(VecDeque::new()),
            work_ready: parking_lot::Condvar::new(),
            drain_cond: parking_lot::Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            max_queue_depth,
            tasks_completed: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let inner_clone = Arc::clone(&inner);
            let handle = std::thread::Builder::new()
                .name(format!("folio-io-{}", i))
                .spawn(move || worker_loop(&inner_clone))
                .expect("failed to spawn write pool worker thread");
            workers.push(handle);
        }

        Self {
            inner,
            workers: ParkingMutex::new(workers),
            num_threads,
        }
    }

    /// Submit a task to the pool.
    ///
    /// Returns `Err(BackpressureError)` if the queue is at capacity or
    /// the pool has been shut down.
    pub fn submit(&self, work: impl FnOnce() + Send + 'static) -> Result<(), BackpressureError> {
        // Reject after shutdown — workers have been joined, task would never run
        if self.inner.shutdown.load(AtomicOrdering::Acquire) {
            return Err(BackpressureError);
        }

        // Check backpressure before acquiring the lock
        if self.inner.queue_depth.load(AtomicOrdering::Acquire) >= self.inner.max_queue_depth {
            return Err(BackpressureError);
        }

        {
            let mut queue = self.inner.queue.lock();
            queue.push_back(Box::new(work));
            self.inner.queue_depth.fetch_add(1, AtomicOrdering::Release);
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until all queued and in-flight tasks have completed.
    ///
    /// Workers remain running after drain completes — this does NOT signal
    /// shutdown.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queue_depth.load(AtomicOrdering::Acquire) > 0
            || self.inner.active_tasks.load(AtomicOrdering::Acquire) > 0
        {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Shut down the pool: signal workers to exit and join all threads.
    ///
    /// Workers finish remaining queued tasks before exiting.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, AtomicOrdering::Release);

        // Lock the queue before notifying to prevent lost-wakeup:
        // a worker between its shutdown check and condvar wait holds this lock,
        // so acquiring it guarantees the worker is either already in wait()
        // (and our notify will wake it) or hasn't checked shutdown yet
        // (and will see it's true when it does).
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Return a snapshot of pool metrics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queue_depth: self.inner.queue_depth.load(AtomicOrdering::Relaxed),
            active_tasks: self.inner.active_tasks.load(AtomicOrdering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(AtomicOrdering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

/// RAII guard that decrements `active_tasks` and notifies drain waiters on
/// drop, so bookkeeping stays correct even when a task panics.
struct ActiveTaskGuard<'a> {
    inner: &'a PoolInner,
}

impl<'a> Drop for ActiveTaskGuard<'a> {
    fn drop(&mut self) {
        let prev_active = self.inner.active_tasks.fetch_sub(1, AtomicOrdering::Release);
        self.inner
            .tasks_completed
            .fetch_add(1, AtomicOrdering::Relaxed);

        // If we just became idle and the queue is empty, notify drain
        // waiters. Lock the queue before notifying to prevent lost-wakeup:
        // drain() holds this lock while checking the condition and calling
        // wait(), so acquiring it ensures drain is either already in wait()
        // or will re-check the condition after acquiring the lock.
        if prev_active == 1 && self.inner.queue_depth.load(AtomicOrdering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    inner.queue_depth.fetch_sub(1, AtomicOrdering::Release);
                    inner.active_tasks.fetch_add(1, AtomicOrdering::Release);
                    break task;
                }
                if inner.shutdown.load(AtomicOrdering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        // Guard ensures active_tasks is decremented even if the task panics
        let _guard = ActiveTaskGuard { inner };

        // Execute outside the lock. catch_unwind keeps a panicking task from
        // killing the worker thread — the guard handles bookkeeping either way.
        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
            error!(
                "write task panicked: {:?}",
                e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
    }
}
