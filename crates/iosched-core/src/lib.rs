#![warn(missing_docs)]

//! Priority I/O scheduler: per-stream FIFO admission and priority dispatch.
//!
//! Callers open priority-tagged streams, enqueue ops into them, and a small
//! pool of worker threads dispatches the highest-priority ready stream's
//! head op to a backend [`SchedulerClient`]. Within a stream, ops complete
//! in strict submission order; across streams, higher priority always wins
//! and equal priorities are served round-robin. Shutdown closes every
//! stream, wakes all blocked workers, and delivers exactly one completion
//! for every admitted op.

pub mod client;
pub mod error;
pub mod op;
pub(crate) mod ready_queue;
pub mod scheduler;
pub(crate) mod stream;
pub(crate) mod worker;

pub use client::{IssueOutcome, MockClient, SchedulerClient};
pub use error::{SchedError, SchedResult};
pub use op::{Op, OpStatus, StreamId, DEFAULT_PRIORITY, MAX_PRIORITY};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerStats};
