//! Scheduler: stream registry, admission, dispatch, and shutdown.
//!
//! One `Scheduler` instance owns all state for a logical I/O domain: the
//! id -> stream registry, the ready queue, and the worker pool. There are no
//! process-wide singletons; construct one per domain and hand it around
//! explicitly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::SchedulerClient;
use crate::error::{SchedError, SchedResult};
use crate::op::{Op, OpStatus, StreamId, MAX_PRIORITY};
use crate::ready_queue::ReadyQueue;
use crate::stream::{Stream, StreamDisposition};
use crate::worker;

/// Configuration for the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads spawned by `serve` (minimum 1).
    pub num_workers: usize,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            thread_name: "iosched-worker".to_string(),
        }
    }
}

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Ops admitted into a stream.
    pub ops_enqueued: u64,
    /// Ops rejected at admission (unknown stream, closed stream, shutdown).
    pub ops_rejected: u64,
    /// Ops completed through the client release path.
    pub ops_completed: u64,
    /// Ops canceled by shutdown while still queued.
    pub ops_canceled: u64,
    /// Streams registered via `stream_open`.
    pub streams_opened: u64,
    /// Streams erased from the registry after close and drain.
    pub streams_retired: u64,
}

#[derive(Default)]
struct Counters {
    ops_enqueued: AtomicU64,
    ops_rejected: AtomicU64,
    ops_completed: AtomicU64,
    ops_canceled: AtomicU64,
    streams_opened: AtomicU64,
    streams_retired: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            ops_enqueued: self.ops_enqueued.load(Ordering::Relaxed),
            ops_rejected: self.ops_rejected.load(Ordering::Relaxed),
            ops_completed: self.ops_completed.load(Ordering::Relaxed),
            ops_canceled: self.ops_canceled.load(Ordering::Relaxed),
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            streams_retired: self.streams_retired.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the scheduler handle and its workers.
pub(crate) struct Shared {
    registry: Mutex<HashMap<StreamId, Arc<Stream>>>,
    pub(crate) ready: ReadyQueue,
    pub(crate) client: Arc<dyn SchedulerClient>,
    shutdown: AtomicBool,
    counters: Counters,
}

impl Shared {
    /// Completes one op: count, release through the stream's client path,
    /// then settle the stream (requeue / idle / retire).
    pub(crate) fn finish(&self, stream: &Arc<Stream>, op: Op) {
        match op.status() {
            Some(OpStatus::Canceled) => {
                self.counters.ops_canceled.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.counters.ops_completed.fetch_add(1, Ordering::Relaxed);
            }
        }
        stream.release_op(op, &*self.client);
        self.settle_stream(stream);
    }

    /// Applies a stream's post-dispatch disposition.
    pub(crate) fn settle_stream(&self, stream: &Arc<Stream>) {
        match stream.settle() {
            StreamDisposition::Requeue => self.ready.signal_available(Arc::clone(stream)),
            StreamDisposition::Idle => {}
            StreamDisposition::Retire => self.retire_stream(stream),
        }
    }

    /// Erases a closed, drained stream from the registry. Compares by
    /// pointer so a reused id registered by a newer stream is untouched.
    fn retire_stream(&self, stream: &Arc<Stream>) {
        let mut registry = self.registry.lock();
        if let Some(current) = registry.get(&stream.id()) {
            if Arc::ptr_eq(current, stream) {
                registry.remove(&stream.id());
                self.counters.streams_retired.fetch_add(1, Ordering::Relaxed);
                debug!("retired stream {}", stream.id());
            }
        }
    }

    fn lookup(&self, id: StreamId) -> Option<Arc<Stream>> {
        self.registry.lock().get(&id).cloned()
    }
}

/// Per-stream priority admission and dispatch engine for asynchronous I/O.
///
/// Multiplexes concurrent request streams onto a small worker pool while
/// enforcing priority ordering across streams, FIFO ordering within a
/// stream, and a shutdown protocol under which no op outlives the scheduler
/// without a completion.
pub struct Scheduler {
    shared: Arc<Shared>,
    config: SchedulerConfig,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a scheduler bound to the given backend client.
    pub fn new(client: Arc<dyn SchedulerClient>, config: SchedulerConfig) -> Self {
        debug!(
            "creating scheduler: num_workers={}, thread_name={}",
            config.num_workers, config.thread_name
        );
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(HashMap::new()),
                ready: ReadyQueue::new(),
                client,
                shutdown: AtomicBool::new(false),
                counters: Counters::default(),
            }),
            config,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new stream under `id` with the given priority.
    pub fn stream_open(&self, id: StreamId, priority: u8) -> SchedResult<()> {
        if priority > MAX_PRIORITY {
            return Err(SchedError::InvalidPriority {
                priority,
                max: MAX_PRIORITY,
            });
        }
        let mut registry = self.shared.registry.lock();
        // Checked under the registry lock: shutdown's close and clear phases
        // also take this lock after setting the flag, so an open that slips
        // past here is always visible to them.
        if self.shared.shutdown.load(Ordering::SeqCst) {
            return Err(SchedError::Canceled);
        }
        if registry.contains_key(&id) {
            return Err(SchedError::AlreadyExists { stream_id: id });
        }
        registry.insert(id, Arc::new(Stream::new(id, priority)));
        drop(registry);
        self.shared
            .counters
            .streams_opened
            .fetch_add(1, Ordering::Relaxed);
        debug!("opened stream {} priority={}", id, priority);
        Ok(())
    }

    /// Stops admission on a stream. An already-drained stream is erased from
    /// the registry immediately; otherwise it lingers until the worker that
    /// empties it retires it.
    pub fn stream_close(&self, id: StreamId) -> SchedResult<()> {
        let stream = self
            .shared
            .lookup(id)
            .ok_or(SchedError::NotFound { stream_id: id })?;
        let drained = stream.close();
        debug!("closed stream {} drained={}", id, drained);
        if drained {
            self.shared.retire_stream(&stream);
        }
        Ok(())
    }

    /// Admits a batch of ops. Never blocks.
    ///
    /// Accepted ops are routed into their streams and dispatched by the
    /// worker pool. Ops that fail admission come back in the returned list,
    /// in input order, each with its failure status recorded:
    /// `NotFound` for an unknown stream, `InvalidArgs` for a closed stream,
    /// `Canceled` once shutdown has begun.
    pub fn enqueue(&self, ops: Vec<Op>) -> Vec<Op> {
        let mut rejected = Vec::new();
        for mut op in ops {
            if self.shared.shutdown.load(Ordering::SeqCst) {
                op.set_status(OpStatus::Canceled);
                self.shared
                    .counters
                    .ops_rejected
                    .fetch_add(1, Ordering::Relaxed);
                rejected.push(op);
                continue;
            }
            let Some(stream) = self.shared.lookup(op.stream_id()) else {
                debug!("enqueue: stream {} not found for op {}", op.stream_id(), op.id());
                op.set_status(OpStatus::NotFound);
                self.shared
                    .counters
                    .ops_rejected
                    .fetch_add(1, Ordering::Relaxed);
                rejected.push(op);
                continue;
            };
            match stream.insert(op) {
                Ok(signal) => {
                    self.shared
                        .counters
                        .ops_enqueued
                        .fetch_add(1, Ordering::Relaxed);
                    if signal {
                        self.shared.ready.signal_available(stream);
                    }
                }
                Err(op) => {
                    self.shared
                        .counters
                        .ops_rejected
                        .fetch_add(1, Ordering::Relaxed);
                    rejected.push(op);
                }
            }
        }
        rejected
    }

    /// Pops the next runnable op: highest-priority ready stream, head of its
    /// FIFO. The stream is immediately re-queued if more ops are pending.
    ///
    /// With `wait` set, blocks until an op is available or shutdown begins.
    /// Returns `None` when nothing is runnable (or after shutdown).
    pub fn dequeue(&self, wait: bool) -> Option<Op> {
        loop {
            let stream = self.shared.ready.next_stream(wait)?;
            match stream.take_next() {
                Some(op) => {
                    self.shared.settle_stream(&stream);
                    return Some(op);
                }
                None => {
                    self.shared.settle_stream(&stream);
                    if !wait {
                        return None;
                    }
                }
            }
        }
    }

    /// Spawns the worker pool. On any spawn failure the scheduler is shut
    /// down so no partially-started pool is left running.
    pub fn serve(&self) -> SchedResult<()> {
        let count = self.config.num_workers.max(1);
        {
            let mut workers = self.workers.lock();
            for index in 0..count {
                let shared = Arc::clone(&self.shared);
                let name = format!("{}-{}", self.config.thread_name, index);
                match std::thread::Builder::new()
                    .name(name)
                    .spawn(move || worker::run(shared))
                {
                    Ok(handle) => workers.push(handle),
                    Err(err) => {
                        warn!("worker spawn failed: {}", err);
                        drop(workers);
                        self.shutdown();
                        return Err(SchedError::WorkerSpawn(err));
                    }
                }
            }
        }
        info!("scheduler serving with {} workers", count);
        Ok(())
    }

    /// Shuts the scheduler down. Idempotent; blocks until all workers exit.
    ///
    /// Cancels the client's blocking acquire, closes every stream, wakes all
    /// blocked workers, joins the pool, then cancels every still-queued op
    /// through the client completion path and clears the registry. Every
    /// admitted op receives exactly one completion. Must not be called from
    /// a worker's own execution context.
    pub fn shutdown(&self) {
        let first = !self.shared.shutdown.swap(true, Ordering::SeqCst);
        if first {
            info!("scheduler shutdown initiated");
            self.shared.client.cancel_acquire();
            let streams: Vec<Arc<Stream>> =
                self.shared.registry.lock().values().cloned().collect();
            for stream in &streams {
                stream.close();
            }
            self.shared.ready.shutdown();
        }

        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }

        if first {
            let streams: Vec<Arc<Stream>> = {
                let mut registry = self.shared.registry.lock();
                let streams = registry.values().cloned().collect();
                registry.clear();
                streams
            };
            let mut canceled = 0u64;
            for stream in streams {
                for op in stream.drain_for_shutdown() {
                    canceled += 1;
                    self.shared
                        .counters
                        .ops_canceled
                        .fetch_add(1, Ordering::Relaxed);
                    self.shared.client.release(op);
                }
            }
            info!("scheduler shut down, {} queued ops canceled", canceled);
        }
    }

    /// Completion callback path for backends that finish an op
    /// asynchronously. The op must carry its recorded status.
    pub fn async_complete(&self, op: Op) {
        match self.shared.lookup(op.stream_id()) {
            Some(stream) => self.shared.finish(&stream, op),
            None => {
                // Stream already cleared by shutdown; still deliver the
                // completion so no op goes unresolved.
                match op.status() {
                    Some(OpStatus::Canceled) => {
                        self.shared
                            .counters
                            .ops_canceled
                            .fetch_add(1, Ordering::Relaxed);
                    }
                    _ => {
                        self.shared
                            .counters
                            .ops_completed
                            .fetch_add(1, Ordering::Relaxed);
                    }
                }
                self.shared.client.release(op);
            }
        }
    }

    /// Returns a snapshot of the scheduler counters.
    pub fn stats(&self) -> SchedulerStats {
        self.shared.counters.snapshot()
    }

    /// Number of streams currently registered.
    pub fn stream_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    /// True once shutdown has been initiated.
    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
