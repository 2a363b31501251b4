use std::fmt;

use thiserror::Error;

/// Errors that can occur while building or driving a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The configuration was rejected at construction time.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A lifecycle operation was called in the wrong state.
    #[error("cannot {op} pool in state {state}")]
    InvalidState { op: &'static str, state: State },

    /// A bucket worker or flush task panicked, usually inside the callback.
    #[error("worker for bucket {bucket_id} panicked")]
    WorkerPanicked { bucket_id: usize },

    /// The timer task itself failed to join.
    #[error("timer task failed")]
    TimerFailed(#[source] tokio::task::JoinError),

    /// Multiple tasks failed during shutdown.
    ///
    /// Contains all errors for debugging.
    #[error("{} task(s) failed", .0.len())]
    MultipleErrors(Vec<PoolError>),
}

impl PoolError {
    /// Folds a list of failures into a single result.
    pub(crate) fn from_errors(mut errors: Vec<PoolError>) -> Result<(), PoolError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(PoolError::MultipleErrors(errors)),
        }
    }
}

/// Returned by [`Pool::submit`](super::Pool::submit) when the pool no longer
/// accepts items. The rejected item is handed back to the caller.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct SubmitError<T>(pub T);

impl<T> SubmitError<T> {
    /// Takes the rejected item back.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitError").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool is stopped")
    }
}

impl<T> std::error::Error for SubmitError<T> {}

/// Lifecycle of a pool. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum State {
    Created = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl State {
    pub(crate) fn from_u8(value: u8) -> State {
        match value {
            0 => State::Created,
            1 => State::Running,
            2 => State::Stopping,
            _ => State::Stopped,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Created => "created",
            State::Running => "running",
            State::Stopping => "stopping",
            State::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = PoolError::InvalidConfig("bucket_count must be at least 1".to_string());
        assert_eq!(err.to_string(), "invalid config: bucket_count must be at least 1");

        let err = PoolError::InvalidState {
            op: "start",
            state: State::Running,
        };
        assert_eq!(err.to_string(), "cannot start pool in state running");

        let err = PoolError::WorkerPanicked { bucket_id: 3 };
        assert_eq!(err.to_string(), "worker for bucket 3 panicked");
    }

    #[test]
    fn test_multiple_errors_display() {
        let errors = vec![
            PoolError::WorkerPanicked { bucket_id: 1 },
            PoolError::WorkerPanicked { bucket_id: 2 },
        ];
        let multi_err = PoolError::MultipleErrors(errors);

        let display = multi_err.to_string();
        assert!(display.contains("2 task"));
        assert!(display.contains("failed"));
        // MultipleErrors doesn't have a single source
        assert!(multi_err.source().is_none());
    }

    #[test]
    fn test_from_errors_folds() {
        assert!(PoolError::from_errors(Vec::new()).is_ok());

        let single = PoolError::from_errors(vec![PoolError::WorkerPanicked { bucket_id: 1 }]);
        assert!(matches!(single, Err(PoolError::WorkerPanicked { bucket_id: 1 })));

        let many = PoolError::from_errors(vec![
            PoolError::WorkerPanicked { bucket_id: 1 },
            PoolError::WorkerPanicked { bucket_id: 2 },
        ]);
        assert!(matches!(many, Err(PoolError::MultipleErrors(ref v)) if v.len() == 2));
    }

    #[test]
    fn test_submit_error_returns_item() {
        let err = SubmitError(String::from("payload"));
        assert_eq!(err.to_string(), "pool is stopped");
        assert_eq!(err.into_inner(), "payload");
    }

    #[test]
    fn test_state_order_is_monotonic() {
        assert!(State::Created < State::Running);
        assert!(State::Running < State::Stopping);
        assert!(State::Stopping < State::Stopped);
        for state in [State::Created, State::Running, State::Stopping, State::Stopped] {
            assert_eq!(State::from_u8(state as u8), state);
        }
    }
}
