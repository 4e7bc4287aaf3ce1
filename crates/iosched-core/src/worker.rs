//! Worker dispatch loop.
//!
//! Each worker is a dedicated OS thread that blocks on the ready queue,
//! pops the head op of the highest-priority ready stream, hands it to the
//! backend client, and releases the completed op back to the submitter.
//!
//! A stream is re-signaled into the ready queue only after its in-flight op
//! has completed, so a stream is never drained by two workers at once and
//! per-stream FIFO holds for completions under any pool size. Failed
//! dispatches are surfaced as the op's status and never retried here.

use std::sync::Arc;

use tracing::debug;

use crate::client::IssueOutcome;
use crate::scheduler::Shared;

/// Runs one worker until shutdown is observed.
pub(crate) fn run(shared: Arc<Shared>) {
    debug!("worker started");
    loop {
        let Some(stream) = shared.ready.next_stream(true) else {
            break;
        };
        let Some(op) = stream.take_next() else {
            // Raced with a drain; return the stream to bookkeeping.
            shared.settle_stream(&stream);
            continue;
        };
        debug!("dispatching op {} from stream {}", op.id(), stream.id());
        match shared.client.issue(op) {
            IssueOutcome::Complete(mut op, status) => {
                op.set_status(status);
                shared.finish(&stream, op);
            }
            IssueOutcome::Pending => {
                // The backend owns the op now; its async_complete call
                // releases it and settles the stream.
            }
        }
    }
    debug!("worker exiting");
}
