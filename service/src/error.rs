use acquisition::WorkerError;
use config::WatchError;
use errors::FingerprintError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Cannot watch the acquisition configuration: {0}")]
    Watch(#[from] WatchError),

    #[error("Cannot fingerprint the acquisition configuration: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Acquisition failed to start: {0}")]
    Start(#[from] WorkerError),
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
