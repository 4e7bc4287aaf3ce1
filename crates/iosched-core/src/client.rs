//! Backend boundary: the client that actually executes scheduled ops.
//!
//! The scheduler orders and dispatches; the [`SchedulerClient`] performs the
//! physical I/O. A [`MockClient`] is provided for tests and examples.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::op::{Op, OpStatus, StreamId};

/// Outcome of handing an op to the backend.
pub enum IssueOutcome {
    /// The backend executed the op synchronously. The op is handed back
    /// together with the backend's result.
    Complete(Op, OpStatus),
    /// The backend took ownership of the op and will finish it later via
    /// [`crate::Scheduler::async_complete`].
    Pending,
}

/// The I/O backend consumed by the scheduler's workers.
///
/// Implementations must be thread-safe: `issue` is called from worker
/// threads, `release` from whichever thread completes the op, and
/// `cancel_acquire` from the thread driving shutdown.
pub trait SchedulerClient: Send + Sync {
    /// Performs the I/O for one op.
    ///
    /// May block. Returning [`IssueOutcome::Pending`] transfers ownership of
    /// the op to the backend, which must eventually complete it (with a
    /// status recorded) through `Scheduler::async_complete`.
    fn issue(&self, op: Op) -> IssueOutcome;

    /// Delivers a completed op, with its status recorded, back to the
    /// submitter. Every admitted op is released exactly once.
    fn release(&self, op: Op);

    /// Forces any blocked `issue` call to return promptly and flushes
    /// outstanding async ops. Invoked when shutdown begins; may be invoked
    /// more than once.
    fn cancel_acquire(&self);
}

#[derive(Default)]
struct MockClientState {
    issued: Vec<(StreamId, u64)>,
    released: Vec<(u64, OpStatus)>,
    fail_ids: HashSet<u64>,
}

/// In-memory backend used by tests.
///
/// Executes every op synchronously with `OpStatus::Ok` unless the op id has
/// been registered via [`MockClient::fail_op`], and records the order in
/// which ops were issued and released.
#[derive(Default)]
pub struct MockClient {
    state: Mutex<MockClientState>,
    cancels: AtomicUsize,
}

impl MockClient {
    /// Creates a new mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an op id so that its execution reports `OpStatus::Failed`.
    pub fn fail_op(&self, id: u64) {
        self.state.lock().fail_ids.insert(id);
    }

    /// Returns op ids in the order they were issued to the backend.
    pub fn issued_order(&self) -> Vec<u64> {
        self.state.lock().issued.iter().map(|(_, id)| *id).collect()
    }

    /// Returns op ids issued for one stream, in issue order.
    pub fn issued_for_stream(&self, stream_id: StreamId) -> Vec<u64> {
        self.state
            .lock()
            .issued
            .iter()
            .filter(|(sid, _)| *sid == stream_id)
            .map(|(_, id)| *id)
            .collect()
    }

    /// Returns `(op id, status)` pairs in release order.
    pub fn released(&self) -> Vec<(u64, OpStatus)> {
        self.state.lock().released.clone()
    }

    /// Returns the number of ops released so far.
    pub fn release_count(&self) -> usize {
        self.state.lock().released.len()
    }

    /// Returns how many times `cancel_acquire` has been invoked.
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl SchedulerClient for MockClient {
    fn issue(&self, op: Op) -> IssueOutcome {
        let mut state = self.state.lock();
        state.issued.push((op.stream_id(), op.id()));
        let status = if state.fail_ids.contains(&op.id()) {
            OpStatus::Failed
        } else {
            OpStatus::Ok
        };
        IssueOutcome::Complete(op, status)
    }

    fn release(&self, op: Op) {
        let status = op.status().unwrap_or(OpStatus::Failed);
        self.state.lock().released.push((op.id(), status));
    }

    fn cancel_acquire(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}
