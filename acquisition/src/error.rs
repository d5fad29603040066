use std::time::Duration;
use thiserror::Error;

/// Errors starting an acquisition worker.
///
/// Stopping never fails; see [`crate::StopOutcome`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("The acquisition worker did not start within {}s", timeout.as_secs())]
    StartTimeout { timeout: Duration },

    #[error("The acquisition worker ended before it was ready")]
    StartAborted,
}

pub type WorkerResult<T> = Result<T, WorkerError>;
