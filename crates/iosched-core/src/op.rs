//! Op and stream identity types.
//!
//! An [`Op`] is one schedulable unit of I/O work. It is uniquely owned and
//! moves between the caller, its stream's queue, a worker, and the backend;
//! it is never aliased. The physical read/write semantics live entirely in
//! the backend — the scheduler only orders and dispatches.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum stream priority (inclusive). Higher values are served first.
pub const MAX_PRIORITY: u8 = 31;

/// Default stream priority for callers with no particular preference.
pub const DEFAULT_PRIORITY: u8 = 8;

/// Identifier of a stream, assigned by the caller at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion status recorded on every op exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpStatus {
    /// The backend executed the op successfully.
    Ok,
    /// The target stream was never opened.
    NotFound,
    /// The target stream had already been closed.
    InvalidArgs,
    /// Shutdown occurred while the op was still pending.
    Canceled,
    /// The backend reported an execution failure.
    Failed,
}

impl fmt::Display for OpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpStatus::Ok => write!(f, "Ok"),
            OpStatus::NotFound => write!(f, "NotFound"),
            OpStatus::InvalidArgs => write!(f, "InvalidArgs"),
            OpStatus::Canceled => write!(f, "Canceled"),
            OpStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// One schedulable unit of I/O work tied to a stream.
#[derive(Debug)]
pub struct Op {
    id: u64,
    stream_id: StreamId,
    priority: u8,
    status: Option<OpStatus>,
}

impl Op {
    /// Creates a new op targeting the given stream.
    ///
    /// The `id` is an opaque caller-assigned tag carried through completion.
    /// Priority is stamped from the owning stream at admission time.
    pub fn new(id: u64, stream_id: StreamId) -> Self {
        Self {
            id,
            stream_id,
            priority: 0,
            status: None,
        }
    }

    /// Returns the caller-assigned tag.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the id of the stream this op belongs to.
    #[inline]
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Returns the priority inherited from the owning stream.
    ///
    /// Zero until the op has been admitted into a stream.
    #[inline]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Stamps the owning stream's priority onto the op at admission.
    #[inline]
    pub(crate) fn set_priority(&mut self, priority: u8) {
        self.priority = priority;
    }

    /// Records the completion status. The first write wins; later writes
    /// are ignored so a result set by the backend survives shutdown paths.
    pub fn set_status(&mut self, status: OpStatus) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Returns the completion status, if one has been recorded.
    #[inline]
    pub fn status(&self) -> Option<OpStatus> {
        self.status
    }

    /// Returns true once a completion status has been recorded.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.status.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_op_has_no_status() {
        let op = Op::new(1, StreamId(5));
        assert_eq!(op.id(), 1);
        assert_eq!(op.stream_id(), StreamId(5));
        assert_eq!(op.priority(), 0);
        assert!(op.status().is_none());
        assert!(!op.is_complete());
    }

    #[test]
    fn test_status_first_write_wins() {
        let mut op = Op::new(1, StreamId(0));
        op.set_status(OpStatus::Failed);
        op.set_status(OpStatus::Ok);
        assert_eq!(op.status(), Some(OpStatus::Failed));
    }

    #[test]
    fn test_priority_stamp() {
        let mut op = Op::new(1, StreamId(0));
        op.set_priority(17);
        assert_eq!(op.priority(), 17);
    }

    #[test]
    fn test_stream_id_display() {
        assert_eq!(format!("{}", StreamId(42)), "42");
    }

    #[test]
    fn test_op_status_display() {
        assert_eq!(format!("{}", OpStatus::Ok), "Ok");
        assert_eq!(format!("{}", OpStatus::NotFound), "NotFound");
        assert_eq!(format!("{}", OpStatus::InvalidArgs), "InvalidArgs");
        assert_eq!(format!("{}", OpStatus::Canceled), "Canceled");
        assert_eq!(format!("{}", OpStatus::Failed), "Failed");
    }

    #[test]
    fn test_priority_constants() {
        assert!(DEFAULT_PRIORITY <= MAX_PRIORITY);
        assert_eq!(MAX_PRIORITY, 31);
    }
}
