//! Per-target FIFO of pending ops.
//!
//! A stream holds the pending ops of one logical I/O target in submission
//! order. It is shared (`Arc`) between the scheduler registry, the ready
//! queue, and at most one worker at a time; the `scheduled` flag enforces
//! that at-most-one-holder invariant.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::debug;

use crate::client::SchedulerClient;
use crate::op::{Op, OpStatus, StreamId};

/// What to do with a stream after an op has been popped or completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamDisposition {
    /// More ops are pending: re-insert into the ready queue.
    Requeue,
    /// Empty but still open: wait for the next admission.
    Idle,
    /// Closed and fully drained: erase from the registry.
    Retire,
}

struct StreamInner {
    closed: bool,
    /// True while the stream sits in the ready queue or is owned by a
    /// worker. Guarantees a stream is dispatched by one worker at a time
    /// and never enters the ready queue twice.
    scheduled: bool,
    queue: VecDeque<Op>,
}

/// An ordered, priority-tagged queue of pending ops for one I/O target.
pub struct Stream {
    id: StreamId,
    priority: u8,
    inner: Mutex<StreamInner>,
}

impl Stream {
    pub(crate) fn new(id: StreamId, priority: u8) -> Self {
        Self {
            id,
            priority,
            inner: Mutex::new(StreamInner {
                closed: false,
                scheduled: false,
                queue: VecDeque::new(),
            }),
        }
    }

    /// Returns the stream id.
    #[inline]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Returns the stream priority (fixed at open time).
    #[inline]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Returns the number of pending ops.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Returns true once the stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Admits an op at the tail of the FIFO.
    ///
    /// On success returns whether the stream must be signaled into the ready
    /// queue (it was neither queued nor owned by a worker). A closed stream
    /// rejects the op, handing it back with `OpStatus::InvalidArgs` recorded.
    pub(crate) fn insert(&self, mut op: Op) -> Result<bool, Op> {
        let mut inner = self.inner.lock();
        if inner.closed {
            drop(inner);
            debug!("rejecting op {} on closed stream {}", op.id(), self.id);
            op.set_status(OpStatus::InvalidArgs);
            return Err(op);
        }
        op.set_priority(self.priority);
        inner.queue.push_back(op);
        if inner.scheduled {
            Ok(false)
        } else {
            inner.scheduled = true;
            Ok(true)
        }
    }

    /// Pops the head op, strict FIFO.
    pub(crate) fn take_next(&self) -> Option<Op> {
        self.inner.lock().queue.pop_front()
    }

    /// Stops admission. Idempotent.
    ///
    /// Returns true when the stream is already drained and idle, meaning it
    /// is safe to erase from the registry immediately. A stream still owned
    /// by a worker (or with ops pending) lingers and is retired by whichever
    /// worker empties it.
    pub(crate) fn close(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.queue.is_empty() && !inner.scheduled
    }

    /// Hands a completed op's result back through the client callback path.
    pub(crate) fn release_op(&self, op: Op, client: &dyn SchedulerClient) {
        debug!(
            "releasing op {} on stream {}: status={:?}",
            op.id(),
            self.id,
            op.status()
        );
        client.release(op);
    }

    /// Post-dispatch bookkeeping: decides whether the stream goes back into
    /// the ready queue, falls idle, or is ready for registry removal.
    pub(crate) fn settle(&self) -> StreamDisposition {
        let mut inner = self.inner.lock();
        if !inner.queue.is_empty() {
            StreamDisposition::Requeue
        } else {
            inner.scheduled = false;
            if inner.closed {
                StreamDisposition::Retire
            } else {
                StreamDisposition::Idle
            }
        }
    }

    /// Closes the stream and pops every remaining op with
    /// `OpStatus::Canceled` recorded. Shutdown path only.
    pub(crate) fn drain_for_shutdown(&self) -> Vec<Op> {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner
            .queue
            .drain(..)
            .map(|mut op| {
                op.set_status(OpStatus::Canceled);
                op
            })
            .collect()
    }
}
