//! Error types for the scheduler.

use thiserror::Error;

use crate::op::StreamId;

/// Result type alias for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Error variants for scheduler operations.
///
/// These cover the administrative call surface (`stream_open`,
/// `stream_close`, `serve`). Per-op outcomes are reported through
/// [`crate::op::OpStatus`] instead, never through this enum.
#[derive(Debug, Error)]
pub enum SchedError {
    /// A stream with this id is already registered.
    #[error("stream {stream_id} already exists")]
    AlreadyExists {
        /// The id that collided.
        stream_id: StreamId,
    },

    /// No stream with this id is registered.
    #[error("stream {stream_id} not found")]
    NotFound {
        /// The id that was looked up.
        stream_id: StreamId,
    },

    /// The requested priority is outside the supported range.
    #[error("invalid priority {priority}, maximum is {max}")]
    InvalidPriority {
        /// The priority that was requested.
        priority: u8,
        /// The maximum accepted priority.
        max: u8,
    },

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// The scheduler is shutting down and accepts no new work.
    #[error("scheduler is shutting down")]
    Canceled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sched_result_alias() {
        let ok: SchedResult<u32> = Ok(7);
        assert!(ok.is_ok());

        let err: SchedResult<u32> = Err(SchedError::Canceled);
        assert!(err.is_err());
    }

    #[test]
    fn test_already_exists_display() {
        let err = SchedError::AlreadyExists {
            stream_id: StreamId(3),
        };
        assert_eq!(format!("{}", err), "stream 3 already exists");
    }

    #[test]
    fn test_not_found_display() {
        let err = SchedError::NotFound {
            stream_id: StreamId(99),
        };
        assert!(format!("{}", err).contains("99"));
    }

    #[test]
    fn test_invalid_priority_display() {
        let err = SchedError::InvalidPriority {
            priority: 200,
            max: 31,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("200"));
        assert!(msg.contains("31"));
    }

    #[test]
    fn test_worker_spawn_from_io_error() {
        let io = std::io::Error::other("out of threads");
        let err: SchedError = io.into();
        assert!(matches!(err, SchedError::WorkerSpawn(_)));
    }
}
