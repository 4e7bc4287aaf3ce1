//! Priority-ordered set of streams with dispatchable ops.
//!
//! One FIFO lane per priority level. Workers block here when idle; shutdown
//! broadcasts so no worker is left waiting forever. Equal-priority streams
//! are served FIFO-of-ready-streams: because dispatch re-inserts a stream at
//! the tail of its lane, this degenerates to round-robin and no stream can
//! starve another of the same priority.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::op::MAX_PRIORITY;
use crate::stream::Stream;

const NUM_LANES: usize = MAX_PRIORITY as usize + 1;

struct ReadyInner {
    lanes: [VecDeque<Arc<Stream>>; NUM_LANES],
    ready_count: usize,
    shutdown: bool,
}

/// Tracks which streams currently have at least one pending op, ordered by
/// priority, and wakes blocked workers when one becomes ready.
pub(crate) struct ReadyQueue {
    inner: Mutex<ReadyInner>,
    available: Condvar,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(ReadyInner {
                lanes: std::array::from_fn(|_| VecDeque::new()),
                ready_count: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Inserts a stream at the tail of its priority lane and wakes one
    /// waiter. Safe to call from any submitting thread. After shutdown the
    /// reference is dropped; the shutdown drain cancels any queued ops.
    pub(crate) fn signal_available(&self, stream: Arc<Stream>) {
        let mut inner = self.inner.lock();
        if inner.shutdown {
            return;
        }
        let lane = stream.priority() as usize;
        inner.lanes[lane].push_back(stream);
        inner.ready_count += 1;
        drop(inner);
        self.available.notify_one();
    }

    /// Removes and returns the highest-priority ready stream.
    ///
    /// With `wait` set, blocks until a stream becomes ready or shutdown is
    /// signaled; otherwise returns `None` immediately when nothing is ready.
    /// Always returns `None` once shutdown has begun.
    pub(crate) fn next_stream(&self, wait: bool) -> Option<Arc<Stream>> {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return None;
            }
            if inner.ready_count > 0 {
                for lane in (0..NUM_LANES).rev() {
                    if let Some(stream) = inner.lanes[lane].pop_front() {
                        inner.ready_count -= 1;
                        return Some(stream);
                    }
                }
            }
            if !wait {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Marks the queue shut down and broadcasts to every blocked waiter.
    /// Queued stream references are dropped here; their pending ops are
    /// canceled by the scheduler's shutdown drain.
    pub(crate) fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        let dropped = inner.ready_count;
        for lane in inner.lanes.iter_mut() {
            lane.clear();
        }
        inner.ready_count = 0;
        drop(inner);
        debug!("ready queue shut down, {} queued streams dropped", dropped);
        self.available.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn is_shut_down(&self) -> bool {
        self.inner.lock().shutdown
    }

    /// Number of streams currently queued.
    #[cfg(test)]
    pub(crate) fn ready_count(&self) -> usize {
        self.inner.lock().ready_count
    }
}
