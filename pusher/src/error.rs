use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push endpoint is not configured")]
    NotConfigured,

    #[error("Token request failed: {0}")]
    Token(String),

    #[error("Error pushing data: HTTP code {status} - {reason}")]
    Delivery { status: u16, reason: String },

    #[error("Error pushing data: {0}")]
    Http(#[from] reqwest::Error),
}

pub type PushResult<T> = Result<T, PushError>;
